//! Fixed 64-byte segment header.
//!
//! | Offset | Size | Field          | Encoding                          |
//! |--------|------|----------------|-----------------------------------|
//! | 0      | 8    | signature      | [`SIGNATURE`]                     |
//! | 8      | 8    | version        | f64 BE, currently [`VERSION`]     |
//! | 16     | 8    | index_offset   | f64 BE, relative to segment start |
//! | 24     | 8    | segment_length | f64 BE, relative to segment start |
//! | 32     | 32   | reserved       | zero                              |
//!
//! The signature doubles as a corruption detector: byte 0 has the high bit
//! set (lost by text transcoders), byte 5 is NUL (C-string truncation), and
//! bytes 4 and 6–7 are CR/LF (line-ending rewriting).

use thiserror::Error;

use crate::buffer::Buffer;

pub const SIGNATURE: [u8; 8] = [0x89, 0x51, 0x23, 0x56, 0x0D, 0x00, 0x0A, 0x0D];
pub const HEADER_SLOTS:     usize = 8;
pub const HEADER_SLOT_SIZE: usize = 8;
pub const HEADER_SIZE:      usize = HEADER_SLOTS * HEADER_SLOT_SIZE;
pub const VERSION:          f64   = 1.0;

const VERSION_OFFSET:        usize = HEADER_SLOT_SIZE;
const INDEX_OFFSET_OFFSET:   usize = 2 * HEADER_SLOT_SIZE;
const SEGMENT_LENGTH_OFFSET: usize = 3 * HEADER_SLOT_SIZE;

/// Why a candidate segment failed signature validation.  Variants are listed
/// in the order they are checked; the first match wins.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Buffer is not a QCV archive (shorter than the 64-byte header)")]
    TooShort,
    #[error("Buffer is not a QCV archive")]
    NotAnArchive,
    #[error("QCV archive is corrupted. This is probably because it was read as UTF-8 text")]
    TextTranscoded,
    #[error("QCV archive is corrupted. This may be because it was converted to DOS line endings")]
    DosLineEndings,
    #[error("QCV archive is corrupted. It may have been read as a C string")]
    CStringTruncated,
    #[error("QCV archive is corrupted. This may be because it was converted to Unix line endings")]
    UnixLineEndings,
}

/// Diagnose the first [`HEADER_SIZE`] bytes of `buf`.  `None` means the
/// signature is intact.
pub fn diagnose(buf: &Buffer) -> Option<HeaderError> {
    if buf.len() < HEADER_SIZE {
        return Some(HeaderError::TooShort);
    }
    let b = buf.borrow();
    if b[1..4] != SIGNATURE[1..4] {
        Some(HeaderError::NotAnArchive)
    } else if b[0] != SIGNATURE[0] {
        Some(HeaderError::TextTranscoded)
    } else if b[4] != SIGNATURE[4] {
        Some(HeaderError::DosLineEndings)
    } else if b[5] != SIGNATURE[5] {
        Some(HeaderError::CStringTruncated)
    } else if b[6..8] != SIGNATURE[6..8] {
        Some(HeaderError::UnixLineEndings)
    } else {
        None
    }
}

/// `Ok(true)` for a valid signature.  An invalid one is an error when
/// `strict`, otherwise `Ok(false)` ("no further segment here").
pub fn check_header(buf: &Buffer, strict: bool) -> Result<bool, HeaderError> {
    match diagnose(buf) {
        None                => Ok(true),
        Some(e) if strict   => Err(e),
        Some(_)             => Ok(false),
    }
}

/// Numeric header fields, exactly as stored.  Interpreting them (integrality,
/// bounds) is the decoder's job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHeader {
    pub version:        f64,
    pub index_offset:   f64,
    pub segment_length: f64,
}

impl SegmentHeader {
    pub fn new(index_offset: usize, segment_length: usize) -> Self {
        Self {
            version:        VERSION,
            index_offset:   index_offset as f64,
            segment_length: segment_length as f64,
        }
    }

    /// Write signature and fields into the first [`HEADER_SIZE`] bytes of
    /// `buf`.  The reserved slots are left as they are (zero on a fresh
    /// allocation).
    pub fn write(&self, buf: &Buffer) {
        buf.write_bytes(0, &SIGNATURE);
        buf.write_f64_be(VERSION_OFFSET, self.version);
        buf.write_f64_be(INDEX_OFFSET_OFFSET, self.index_offset);
        buf.write_f64_be(SEGMENT_LENGTH_OFFSET, self.segment_length);
    }

    /// Read the fields of a segment starting at offset 0 of `buf`.  The
    /// signature must already have been checked.
    pub fn read(buf: &Buffer) -> Result<Self, HeaderError> {
        if buf.len() < HEADER_SIZE {
            return Err(HeaderError::TooShort);
        }
        Ok(Self {
            version:        buf.read_f64_be(VERSION_OFFSET),
            index_offset:   buf.read_f64_be(INDEX_OFFSET_OFFSET),
            segment_length: buf.read_f64_be(SEGMENT_LENGTH_OFFSET),
        })
    }
}
