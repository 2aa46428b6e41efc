pub mod buffer;
pub mod header;
pub mod index;
pub mod archive;
pub mod encode;
pub mod decode;
pub mod error;

pub use buffer::Buffer;
pub use header::{HeaderError, SegmentHeader, HEADER_SIZE, SIGNATURE};
pub use index::{Index, IndexRecord};
pub use archive::{Archive, Entry, EntryData, Payload};
pub use decode::{LoadOptions, SegmentInfo, scan_segments};
pub use error::{ArchiveError, Result};
