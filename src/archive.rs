//! In-memory archive: named byte entries plus an archive comment.
//!
//! ```
//! use qcv::{Archive, Buffer};
//!
//! let mut ar = Archive::new();
//! ar.set_comment("numbers");
//! ar.add_data("fib", "0\n1\n1\n2", None);
//! ar.add_data("raw", Buffer::from_vec(vec![5, 6, 7]), Some("three bytes"));
//!
//! let bytes = ar.to_buffer()?;
//! let back = Archive::from_buffer(&bytes)?;
//! assert_eq!(back.comment(), Some("numbers"));
//! assert_eq!(back.get_data("fib").unwrap().to_vec(), b"0\n1\n1\n2");
//! assert_eq!(back.get_comment_of("raw"), Some("three bytes"));
//! # Ok::<(), qcv::ArchiveError>(())
//! ```
//!
//! Entries added with [`Archive::add_data`] and entries produced by decoding
//! are views: they alias the caller's buffer, and writes to that buffer show
//! through.  [`Archive::add_data_by_copy`] stores an independent copy.

use std::collections::btree_map::{self, BTreeMap};
use std::io::{Read, Write};

use crate::buffer::Buffer;
use crate::decode::{self, LoadOptions};
use crate::encode;
use crate::error::Result;

// ── Payload ───────────────────────────────────────────────────────────────────

/// What can be handed to [`Archive::add_data`].
#[derive(Debug, Clone)]
pub enum Payload {
    /// No data: only updates the comment of an existing entry.
    Absent,
    Bytes(Buffer),
    /// Encoded with the archive text codec before storing.
    Text(String),
}

impl From<Buffer> for Payload {
    fn from(buf: Buffer) -> Self { Payload::Bytes(buf) }
}

impl From<&Buffer> for Payload {
    fn from(buf: &Buffer) -> Self { Payload::Bytes(buf.clone()) }
}

impl From<Option<Buffer>> for Payload {
    fn from(buf: Option<Buffer>) -> Self { buf.map_or(Payload::Absent, Payload::Bytes) }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self { Payload::Text(text.to_owned()) }
}

impl From<String> for Payload {
    fn from(text: String) -> Self { Payload::Text(text) }
}

// ── Entry ─────────────────────────────────────────────────────────────────────

/// Entry bytes, tagged with whether they alias someone else's storage.
///
/// Equality compares the bytes only, not the tag.
#[derive(Debug, Clone)]
pub enum EntryData {
    /// A view onto the caller's (or the decoded source's) buffer.
    Borrowed(Buffer),
    /// An allocation nobody else references.
    Owned(Buffer),
}

impl EntryData {
    pub fn buffer(&self) -> &Buffer {
        match self {
            EntryData::Borrowed(b) | EntryData::Owned(b) => b,
        }
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self, EntryData::Borrowed(_))
    }

    pub fn len(&self) -> usize { self.buffer().len() }

    pub fn is_empty(&self) -> bool { self.buffer().is_empty() }
}

impl PartialEq for EntryData {
    fn eq(&self, other: &Self) -> bool {
        self.buffer() == other.buffer()
    }
}

impl Eq for EntryData {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    data:    EntryData,
    comment: Option<String>,
}

impl Entry {
    pub fn new(data: EntryData, comment: Option<String>) -> Self {
        Self { data, comment }
    }

    pub fn data(&self) -> &EntryData { &self.data }

    pub fn comment(&self) -> Option<&str> { self.comment.as_deref() }
}

// ── Archive ───────────────────────────────────────────────────────────────────

/// Named byte payloads plus an archive-level comment.
///
/// Entries enumerate in name order.  Encoding relies on that order being the
/// same for the index and the data section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    comment: Option<String>,
    entries: BTreeMap<String, Entry>,
}

impl Archive {
    // ── Constructors ─────────────────────────────────────────────────────────

    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every segment in `buf`.  Entry data alias `buf`.
    pub fn from_buffer(buf: &Buffer) -> Result<Self> {
        Self::from_buffer_with(buf, &LoadOptions::default())
    }

    pub fn from_buffer_with(buf: &Buffer, opts: &LoadOptions) -> Result<Self> {
        decode::load(buf, opts)
    }

    /// Read `reader` to the end and decode it.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_buffer(&Buffer::from_vec(bytes))
    }

    // ── Encoding ─────────────────────────────────────────────────────────────

    /// Encode the current contents as one self-contained segment.
    pub fn to_buffer(&self) -> Result<Buffer> {
        encode::encode(self)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let buf = self.to_buffer()?;
        writer.write_all(&buf.borrow())?;
        Ok(())
    }

    // ── Archive comment ──────────────────────────────────────────────────────

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Set the archive comment.  An empty string is kept as an empty comment;
    /// use [`Archive::clear_comment`] to remove it.
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    pub fn clear_comment(&mut self) {
        self.comment = None;
    }

    // ── Entries ──────────────────────────────────────────────────────────────

    /// Insert or replace `name`.  Buffers are stored by reference.
    ///
    /// An empty `name` is ignored.  With [`Payload::Absent`] an existing
    /// entry only gets its comment replaced, and only when `comment` is
    /// given.
    pub fn add_data(&mut self, name: &str, data: impl Into<Payload>, comment: Option<&str>) {
        let data = match data.into() {
            Payload::Absent     => None,
            Payload::Bytes(buf) => Some(EntryData::Borrowed(buf)),
            Payload::Text(text) => Some(EntryData::Owned(Buffer::from_text(&text))),
        };
        self.put(name, data, comment);
    }

    /// Like [`Archive::add_data`], but the bytes are copied first so later
    /// writes to the source are not seen.
    pub fn add_data_by_copy(&mut self, name: &str, data: impl Into<Payload>, comment: Option<&str>) {
        let data = match data.into() {
            Payload::Absent     => None,
            Payload::Bytes(buf) => Some(EntryData::Owned(buf.to_owned_copy())),
            Payload::Text(text) => Some(EntryData::Owned(Buffer::from_text(&text))),
        };
        self.put(name, data, comment);
    }

    pub(crate) fn put(&mut self, name: &str, data: Option<EntryData>, comment: Option<&str>) {
        if name.is_empty() {
            log::debug!("ignoring entry with empty name");
            return;
        }
        match data {
            Some(data) => {
                self.entries.insert(name.to_owned(), Entry::new(data, comment.map(str::to_owned)));
            }
            None => {
                if let (Some(entry), Some(c)) = (self.entries.get_mut(name), comment) {
                    entry.comment = Some(c.to_owned());
                }
            }
        }
    }

    pub(crate) fn set_comment_opt(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    pub fn get_data(&self, name: &str) -> Option<&Buffer> {
        self.entries.get(name).map(|e| e.data.buffer())
    }

    pub fn get_comment_of(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(Entry::comment)
    }

    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn remove_data(&mut self, name: &str) {
        self.entries.remove(name);
    }

    /// Entry names in enumeration order.
    pub fn list_entries(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn entries(&self) -> Entries<'_> {
        Entries { inner: self.entries.iter() }
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// Iterator over `(name, entry)` in enumeration order.
pub struct Entries<'a> {
    inner: btree_map::Iter<'a, String, Entry>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a str, &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Entries<'_> {}
