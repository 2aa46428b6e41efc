//! Per-segment table of contents.
//!
//! Serialized as compact JSON after the data section:
//!
//! ```json
//! {"comment":"...","entries":{"name":{"offset":0,"length":3,"comment":"..."}}}
//! ```
//!
//! Absent comments are omitted; `null` is read back as absent.  Non-ASCII
//! characters are written as `\uXXXX` escapes so the text is pure ASCII and
//! its byte length equals its character count.

use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;

use crate::archive::Archive;
use crate::error::{ArchiveError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    /// Byte offset into the segment's data section.
    pub offset:  u64,
    pub length:  u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Index {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub entries: BTreeMap<String, IndexRecord>,
}

impl Index {
    /// Lay out `archive`'s entries back to back in its enumeration order.
    pub fn build(archive: &Archive) -> Self {
        let mut offset = 0u64;
        let entries = archive
            .entries()
            .map(|(name, entry)| {
                let length = entry.data().len() as u64;
                let rec = IndexRecord {
                    offset,
                    length,
                    comment: entry.comment().map(str::to_owned),
                };
                offset += length;
                (name.to_owned(), rec)
            })
            .collect();
        Self { comment: archive.comment().map(str::to_owned), entries }
    }

    /// Total bytes of the data section this index describes when packed.
    pub fn data_size(&self) -> u64 {
        self.entries.values().map(|r| r.length).sum()
    }

    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        let mut out = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut out, AsciiFormatter);
        self.serialize(&mut ser)?;
        Ok(out)
    }

    /// Parse index text.  Bytes are read as latin-1, so an index holding raw
    /// high bytes (a narrow-codec writer) still parses.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        if bytes.is_ascii() {
            return serde_json::from_slice(bytes);
        }
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        serde_json::from_str(&text)
    }

    /// Every record must fit inside a data section of `data_size` bytes.
    pub fn validate(&self, data_size: u64) -> Result<()> {
        for (name, rec) in &self.entries {
            let fits = rec.offset.checked_add(rec.length).is_some_and(|end| end <= data_size);
            if !fits {
                return Err(ArchiveError::EntryOutOfBounds {
                    name:   name.clone(),
                    offset: rec.offset,
                    length: rec.length,
                    data_size,
                });
            }
        }
        Ok(())
    }
}

/// Compact JSON with every non-ASCII character escaped as UTF-16 `\uXXXX`.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
