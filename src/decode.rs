//! Buffer → [`Archive`], across any number of concatenated segments.
//!
//! Segments are walked with a cursor.  Every header field is relative to the
//! segment's own start, so segments can be appended to each other byte for
//! byte.  The first segment must carry a valid signature (otherwise the
//! signature diagnosis is returned); for later positions a signature or
//! version mismatch just ends the walk, which is how trailing bytes are
//! tolerated.
//!
//! Entry data are zero-copy slices of the input buffer.

use crate::archive::{Archive, EntryData};
use crate::buffer::Buffer;
use crate::error::{ArchiveError, Result};
use crate::header::{check_header, SegmentHeader, HEADER_SIZE, VERSION};
use crate::index::Index;

// ── LoadOptions ───────────────────────────────────────────────────────────────

/// Configuration for [`load`] / [`Archive::from_buffer_with`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Fail with [`ArchiveError::TrailingBytes`] instead of ignoring bytes
    /// after the last segment.
    pub reject_trailing_bytes: bool,
    /// Stop after this many segments; anything after counts as trailing.
    pub max_segments:          Option<usize>,
}

// ── SegmentInfo ───────────────────────────────────────────────────────────────

/// Where one segment sits in a buffer, as reported by [`scan_segments`].
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentInfo {
    /// Absolute byte offset of the segment start.
    pub offset:       usize,
    pub version:      f64,
    /// Relative to `offset`.
    pub index_offset: usize,
    pub length:       usize,
    pub entry_count:  usize,
    pub comment:      Option<String>,
}

impl SegmentInfo {
    pub fn data_size(&self) -> usize {
        self.index_offset - HEADER_SIZE
    }
}

struct Segment {
    info:  SegmentInfo,
    /// The segment's data section.
    data:  Buffer,
    index: Index,
}

// ── Segment walker ────────────────────────────────────────────────────────────

struct SegmentReader<'a> {
    buffer: &'a Buffer,
    cursor: usize,
}

impl<'a> SegmentReader<'a> {
    fn new(buffer: &'a Buffer) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Parse the segment at the cursor and advance past it.  `Ok(None)` when
    /// the buffer is exhausted or no segment starts here.
    fn next_segment(&mut self) -> Result<Option<Segment>> {
        let start = self.cursor;
        if start >= self.buffer.len() {
            return Ok(None);
        }
        let rest = self.buffer.slice(start..);
        if !check_header(&rest, start == 0)? {
            return Ok(None);
        }

        let hdr = SegmentHeader::read(&rest)?;
        if hdr.version != VERSION {
            if start == 0 {
                return Err(ArchiveError::UnsupportedVersion(hdr.version));
            }
            log::debug!("segment at {start} has version {}, stopping", hdr.version);
            return Ok(None);
        }
        let index_offset = to_offset(hdr.index_offset, start, "index offset is not a whole number")?;
        let length = to_offset(hdr.segment_length, start, "segment length is not a whole number")?;
        if index_offset < HEADER_SIZE {
            return Err(layout(start, "index offset points inside the header"));
        }
        if length < index_offset {
            return Err(layout(start, "segment ends before its index"));
        }
        if length > rest.len() {
            return Err(layout(start, "segment extends past the end of the buffer"));
        }

        let index = Index::from_bytes(&rest.borrow()[index_offset..length])?;
        let data = rest.slice(HEADER_SIZE..index_offset);
        index.validate(data.len() as u64)?;

        let info = SegmentInfo {
            offset: start,
            version: hdr.version,
            index_offset,
            length,
            entry_count: index.entries.len(),
            comment: index.comment.clone(),
        };
        log::debug!(
            "segment at {}: {} entries, {} bytes",
            start, info.entry_count, length,
        );
        self.cursor = start + length;
        Ok(Some(Segment { info, data, index }))
    }
}

fn to_offset(value: f64, segment: usize, reason: &'static str) -> Result<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= usize::MAX as f64 {
        Ok(value as usize)
    } else {
        Err(layout(segment, reason))
    }
}

fn layout(offset: usize, reason: &'static str) -> ArchiveError {
    ArchiveError::Layout { offset, reason }
}

// ── Public entry points ───────────────────────────────────────────────────────

/// Build an [`Archive`] from every segment in `buffer`.  Later segments
/// replace same-named entries and the archive comment of earlier ones.
pub fn load(buffer: &Buffer, opts: &LoadOptions) -> Result<Archive> {
    let mut archive = Archive::new();
    let mut reader = SegmentReader::new(buffer);
    let mut segments = 0usize;

    while opts.max_segments.map_or(true, |max| segments < max) {
        let Some(seg) = reader.next_segment()? else { break };
        archive.set_comment_opt(seg.index.comment);
        for (name, rec) in seg.index.entries {
            let start = rec.offset as usize;
            let view = seg.data.slice(start..start + rec.length as usize);
            log::trace!("entry {name:?}: {} bytes at {}", rec.length, seg.info.offset + HEADER_SIZE + start);
            archive.put(&name, Some(EntryData::Borrowed(view)), rec.comment.as_deref());
        }
        segments += 1;
    }

    let consumed = reader.cursor;
    if consumed < buffer.len() {
        let len = buffer.len() - consumed;
        if opts.reject_trailing_bytes {
            return Err(ArchiveError::TrailingBytes { offset: consumed, len });
        }
        log::debug!("ignoring {len} trailing byte(s) at offset {consumed}");
    }
    Ok(archive)
}

/// Describe every segment in `buffer` without building an archive.
pub fn scan_segments(buffer: &Buffer) -> Result<Vec<SegmentInfo>> {
    let mut reader = SegmentReader::new(buffer);
    let mut out = Vec::new();
    while let Some(seg) = reader.next_segment()? {
        out.push(seg.info);
    }
    Ok(out)
}
