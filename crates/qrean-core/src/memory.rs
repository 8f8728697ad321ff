//! Bounds-checked access to the engine's linear memory.
//!
//! The engine addresses everything by a 32-bit offset into one byte buffer.
//! On the host side every offset is an [`Offset<T>`] tagged with the record
//! layout it points at, and every read or write goes through [`MemoryView`] /
//! [`MemoryViewMut`], which check `offset + len <= memory size` first.
//!
//! Views borrow the memory for the duration of a single access. The buffer
//! may grow (and move) between engine calls, so a view must never be kept
//! across a call into the engine.

use crate::CodecError;
use std::fmt;
use std::marker::PhantomData;

/// Layout marker: a null-terminated byte string.
pub enum TextRecord {}
/// Layout marker: `{ width: u32, height: u32, pixels: u32 }`.
pub enum ImageRecord {}
/// Layout marker: packed RGBA pixel bytes.
pub enum PixelBuffer {}
/// Layout marker: the encode option frame.
pub enum OptionRecord {}
/// Layout marker: eight packed little-endian `f32`s.
pub enum PointsRecord {}
/// Layout marker: an untyped scratch buffer.
pub enum ScratchBuffer {}

/// Offset into linear memory denoting a `T` record.
pub struct Offset<T> {
    raw: u32,
    _layout: PhantomData<fn() -> T>,
}

impl<T> Offset<T> {
    pub const fn new(raw: u32) -> Self {
        Self {
            raw,
            _layout: PhantomData,
        }
    }

    /// The engine-facing integer form.
    pub const fn raw(self) -> u32 {
        self.raw
    }

    /// Engine allocators signal failure with offset 0.
    pub const fn is_null(self) -> bool {
        self.raw == 0
    }

    /// Offset `bytes` past this one, reinterpreted as a `U` record.
    pub fn offset_by<U>(self, bytes: u32) -> Option<Offset<U>> {
        self.raw.checked_add(bytes).map(Offset::new)
    }
}

impl<T> Clone for Offset<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Offset<T> {}

impl<T> PartialEq for Offset<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Offset<T> {}

impl<T> fmt::Debug for Offset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset({:#x})", self.raw)
    }
}

fn range_of<T>(at: Offset<T>, len: usize, size: usize) -> Result<std::ops::Range<usize>, CodecError> {
    let start = at.raw as usize;
    start
        .checked_add(len)
        .filter(|end| *end <= size)
        .map(|end| start..end)
        .ok_or(CodecError::OutOfBounds {
            offset: at.raw,
            len,
            size,
        })
}

/// Read-only view of linear memory.
#[derive(Clone, Copy)]
pub struct MemoryView<'a> {
    bytes: &'a [u8],
}

impl<'a> MemoryView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn slice<T>(&self, at: Offset<T>, len: usize) -> Result<&'a [u8], CodecError> {
        let range = range_of(at, len, self.bytes.len())?;
        Ok(&self.bytes[range])
    }

    /// Little-endian `u32` located `field` bytes into the record at `at`.
    pub fn read_u32<T>(&self, at: Offset<T>, field: u32) -> Result<u32, CodecError> {
        let word = self.field(at, field)?;
        Ok(u32::from_le_bytes(word))
    }

    /// Little-endian `f32` located `field` bytes into the record at `at`.
    pub fn read_f32<T>(&self, at: Offset<T>, field: u32) -> Result<f32, CodecError> {
        let word = self.field(at, field)?;
        Ok(f32::from_le_bytes(word))
    }

    fn field<T>(&self, at: Offset<T>, field: u32) -> Result<[u8; 4], CodecError> {
        let at: Offset<T> = at.offset_by(field).ok_or(CodecError::OutOfBounds {
            offset: at.raw,
            len: field as usize + 4,
            size: self.bytes.len(),
        })?;
        let src = self.slice(at, 4)?;
        Ok([src[0], src[1], src[2], src[3]])
    }
}

/// Mutable view of linear memory.
pub struct MemoryViewMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> MemoryViewMut<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_view(&self) -> MemoryView<'_> {
        MemoryView::new(self.bytes)
    }

    pub fn slice_mut<T>(&mut self, at: Offset<T>, len: usize) -> Result<&mut [u8], CodecError> {
        let range = range_of(at, len, self.bytes.len())?;
        Ok(&mut self.bytes[range])
    }

    pub fn write_bytes<T>(&mut self, at: Offset<T>, data: &[u8]) -> Result<(), CodecError> {
        self.slice_mut(at, data.len())?.copy_from_slice(data);
        Ok(())
    }

    pub fn write_u32<T>(&mut self, at: Offset<T>, field: u32, value: u32) -> Result<(), CodecError> {
        let at: Offset<T> = at.offset_by(field).ok_or(CodecError::OutOfBounds {
            offset: at.raw,
            len: field as usize + 4,
            size: self.bytes.len(),
        })?;
        self.write_bytes(at, &value.to_le_bytes())
    }

    /// Zero every byte from `from` to the end of memory.
    pub fn zero_tail<T>(&mut self, from: Offset<T>) -> Result<(), CodecError> {
        let len = self.bytes.len().saturating_sub(from.raw as usize);
        self.slice_mut(from, len)?.fill(0);
        Ok(())
    }
}
