use std::io;
use thiserror::Error;

use crate::header::HeaderError;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error(transparent)]
    Header(#[from] HeaderError),
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(f64),
    #[error("Invalid segment layout at offset {offset}: {reason}")]
    Layout { offset: usize, reason: &'static str },
    #[error("Entry {name:?} ({offset}+{length}) lies outside the {data_size}-byte data section")]
    EntryOutOfBounds { name: String, offset: u64, length: u64, data_size: u64 },
    #[error("Malformed index: {0}")]
    Index(#[from] serde_json::Error),
    #[error("{len} trailing byte(s) after the last segment at offset {offset}")]
    TrailingBytes { offset: usize, len: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
