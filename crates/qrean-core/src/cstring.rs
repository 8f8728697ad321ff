//! Null-terminated strings in linear memory.

use crate::memory::{MemoryView, MemoryViewMut, Offset, TextRecord};
use crate::CodecError;

/// Append the terminator, rejecting payloads that already contain one.
pub fn to_cstring(text: &[u8]) -> Result<Vec<u8>, CodecError> {
    if let Some(pos) = text.iter().position(|b| *b == 0) {
        return Err(CodecError::InvalidOption {
            kind: "text",
            value: format!("embedded NUL at byte {pos}"),
        });
    }
    let mut out = Vec::with_capacity(text.len() + 1);
    out.extend_from_slice(text);
    out.push(0);
    Ok(out)
}

/// Write `cstring` at `at`. `cstring` must come from [`to_cstring`]
/// or otherwise already end with exactly one NUL.
pub fn write_cstring(
    mem: &mut MemoryViewMut<'_>,
    at: Offset<TextRecord>,
    cstring: &[u8],
) -> Result<(), CodecError> {
    mem.write_bytes(at, cstring)
}

/// Copy out the bytes before the first NUL at `at`.
///
/// The scan stops at the end of memory or after `limit` bytes, whichever
/// comes first; not finding a terminator is a `MalformedString`.
pub fn read_cstring(
    mem: &MemoryView<'_>,
    at: Offset<TextRecord>,
    limit: usize,
) -> Result<Vec<u8>, CodecError> {
    let start = at.raw() as usize;
    if start >= mem.len() {
        return Err(CodecError::OutOfBounds {
            offset: at.raw(),
            len: 1,
            size: mem.len(),
        });
    }
    let window = limit.saturating_add(1).min(mem.len() - start);
    let bytes = mem.slice(at, window)?;
    match bytes.iter().position(|b| *b == 0) {
        Some(end) => Ok(bytes[..end].to_vec()),
        None => Err(CodecError::MalformedString {
            offset: at.raw(),
            limit,
        }),
    }
}
