/// Errors raised while marshaling data across the engine boundary.
///
/// `InvalidOption` is detected host-side before the engine is touched. The
/// remaining variants describe engine-authored memory that does not match
/// the expected layout and are never silently truncated.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid {kind} option: {value}")]
    InvalidOption { kind: &'static str, value: String },

    #[error("image {width}x{height} does not fit in the engine address space")]
    BufferTooLarge { width: u32, height: u32 },

    #[error("access out of bounds (offset={offset}, len={len}, memory size={size})")]
    OutOfBounds { offset: u32, len: usize, size: usize },

    #[error("string at offset {offset} is not terminated within {limit} bytes")]
    MalformedString { offset: u32, limit: usize },

    #[error("malformed geometry: {reason}")]
    MalformedGeometry { reason: String },

    #[error("engine reported unknown {kind} id {id}")]
    UnknownEngineId { kind: &'static str, id: u32 },
}

impl CodecError {
    pub(crate) fn invalid(kind: &'static str, value: impl ToString) -> Self {
        Self::InvalidOption {
            kind,
            value: value.to_string(),
        }
    }
}
