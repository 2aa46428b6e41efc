//! Archive → one self-contained segment.
//!
//! Layout: `[header | data section | index text]`.  The data section holds
//! every entry's bytes back to back, in the order [`Index::build`] assigned
//! offsets; the index text follows immediately.

use crate::archive::Archive;
use crate::buffer::Buffer;
use crate::error::Result;
use crate::header::{SegmentHeader, HEADER_SIZE};
use crate::index::Index;

/// Encode `archive` into a fresh zero-filled buffer.
///
/// A pure function of the archive's current contents: the index is rebuilt
/// on every call.
pub fn encode(archive: &Archive) -> Result<Buffer> {
    let index = Index::build(archive);
    let index_text = index.to_bytes()?;

    let data_size = index.data_size() as usize;
    let index_offset = HEADER_SIZE + data_size;
    let total_size = index_offset + index_text.len();

    let out = Buffer::alloc(total_size);
    SegmentHeader::new(index_offset, total_size).write(&out);

    // Same enumeration order as Index::build, so offsets line up.
    for ((name, entry), (rec_name, rec)) in archive.entries().zip(&index.entries) {
        debug_assert_eq!(name, rec_name.as_str());
        entry.data().buffer().copy_to(&out, HEADER_SIZE + rec.offset as usize);
    }

    out.write_bytes(index_offset, &index_text);
    log::trace!(
        "encoded segment: {} entries, {} data bytes, {} index bytes",
        index.entries.len(),
        data_size,
        index_text.len(),
    );
    Ok(out)
}
