//! Shared byte storage with zero-copy views.
//!
//! A [`Buffer`] is a `[start, end)` window onto reference-counted backing
//! storage.  Slicing never copies: every slice of a buffer aliases the same
//! bytes, and a write through any view is visible through all the others.
//! Use [`Buffer::copy_from_slice`] or [`Buffer::to_owned_copy`] when an
//! independent allocation is needed.
//!
//! Storage is `Rc<RefCell<_>>`, so buffers are single-threaded (`!Send`).
//! Holding a [`Buffer::borrow`] guard while writing through another view of
//! the same storage panics, exactly like any other `RefCell`.
//!
//! # Endianness
//! Header numbers are IEEE-754 doubles in big-endian byte order.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::rc::Rc;

use byteorder::{BigEndian, ByteOrder};

#[derive(Clone)]
pub struct Buffer {
    storage: Rc<RefCell<Vec<u8>>>,
    start:   usize,
    end:     usize,
}

impl Buffer {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Allocate `len` zero-filled bytes.
    pub fn alloc(len: usize) -> Self {
        Self::from_vec(vec![0u8; len])
    }

    /// Take ownership of `bytes` without copying.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let end = bytes.len();
        Self { storage: Rc::new(RefCell::new(bytes)), start: 0, end }
    }

    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self::from_vec(bytes.to_vec())
    }

    /// Encode `text` with the archive text codec (UTF-8, so ASCII is 1:1).
    pub fn from_text(text: &str) -> Self {
        Self::from_vec(text.as_bytes().to_vec())
    }

    /// Concatenate `parts` into one new buffer.  Inputs are left untouched.
    pub fn concat<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Buffer>,
    {
        let mut out = Vec::new();
        for part in parts {
            out.extend_from_slice(&part.borrow());
        }
        Self::from_vec(out)
    }

    // ── Views ────────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize { self.end - self.start }

    pub fn is_empty(&self) -> bool { self.start == self.end }

    /// Zero-copy view of `range` (relative to this buffer), or `None` when
    /// the range falls outside it.
    pub fn try_slice<R: RangeBounds<usize>>(&self, range: R) -> Option<Buffer> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.checked_add(1)?,
            Bound::Unbounded    => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.checked_add(1)?,
            Bound::Excluded(&e) => e,
            Bound::Unbounded    => self.len(),
        };
        if start > end || end > self.len() {
            return None;
        }
        Some(Buffer {
            storage: Rc::clone(&self.storage),
            start:   self.start + start,
            end:     self.start + end,
        })
    }

    /// Zero-copy view of `range`.
    ///
    /// # Panics
    /// If the range is out of bounds, like slice indexing.
    pub fn slice<R: RangeBounds<usize> + fmt::Debug>(&self, range: R) -> Buffer {
        let len = self.len();
        match self.try_slice((range.start_bound().cloned(), range.end_bound().cloned())) {
            Some(view) => view,
            None => panic!("range {range:?} out of bounds for buffer of length {len}"),
        }
    }

    /// Whether `self` and `other` alias the same backing storage.
    pub fn shares_storage(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.storage, &other.storage)
    }

    /// Duplicate the viewed bytes into a fresh, independent buffer.
    pub fn to_owned_copy(&self) -> Buffer {
        Self::from_vec(self.to_vec())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.borrow().to_vec()
    }

    pub fn borrow(&self) -> Ref<'_, [u8]> {
        Ref::map(self.storage.borrow(), |v| &v[self.start..self.end])
    }

    pub fn borrow_mut(&self) -> RefMut<'_, [u8]> {
        RefMut::map(self.storage.borrow_mut(), |v| &mut v[self.start..self.end])
    }

    // ── Byte-level access ────────────────────────────────────────────────────

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.borrow()[offset]
    }

    pub fn write_u8(&self, offset: usize, value: u8) {
        self.borrow_mut()[offset] = value;
    }

    pub fn read_f64_be(&self, offset: usize) -> f64 {
        BigEndian::read_f64(&self.borrow()[offset..offset + 8])
    }

    pub fn write_f64_be(&self, offset: usize, value: f64) {
        BigEndian::write_f64(&mut self.borrow_mut()[offset..offset + 8], value);
    }

    pub fn write_bytes(&self, offset: usize, bytes: &[u8]) {
        self.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Copy all of `self` into `target` starting at `target_start`.
    /// Works when both views share storage.
    pub fn copy_to(&self, target: &Buffer, target_start: usize) {
        let len = self.len();
        if self.shares_storage(target) {
            let dst = target.start + target_start;
            assert!(target_start + len <= target.len(), "copy overruns target view");
            self.storage.borrow_mut().copy_within(self.start..self.end, dst);
        } else {
            target.borrow_mut()[target_start..target_start + len].copy_from_slice(&self.borrow());
        }
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len())
            .field("start", &self.start)
            .finish()
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        *self.borrow() == *other.borrow()
    }
}

impl Eq for Buffer {}

impl PartialEq<[u8]> for Buffer {
    fn eq(&self, other: &[u8]) -> bool {
        *self.borrow() == *other
    }
}

impl PartialEq<&[u8]> for Buffer {
    fn eq(&self, other: &&[u8]) -> bool {
        *self.borrow() == **other
    }
}

impl<const N: usize> PartialEq<[u8; N]> for Buffer {
    fn eq(&self, other: &[u8; N]) -> bool {
        *self.borrow() == other[..]
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self { Self::from_vec(bytes) }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self { Self::copy_from_slice(bytes) }
}
