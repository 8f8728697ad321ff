use qrean_core::CodecError;

/// Errors produced by a [`Session`](crate::Session) or [`QreanRuntime`](crate::QreanRuntime).
///
/// An encode request the engine cannot satisfy is not an error; it comes
/// back as `Ok(None)`.
#[derive(thiserror::Error, Debug)]
pub enum QreanError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("engine arena cannot satisfy a {requested}-byte request")]
    OutOfMemory { requested: u64 },

    #[error("engine initialization failed: {0}")]
    EngineInitFailed(String),

    #[error("engine entry `{entry}` failed: {cause}")]
    EngineCall { entry: &'static str, cause: String },

    #[error("session is closed")]
    SessionClosed,

    #[error("session is busy or was poisoned by a panicking call")]
    SessionBusy,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl QreanError {
    pub(crate) fn init_failed(cause: impl std::fmt::Display) -> Self {
        Self::EngineInitFailed(cause.to_string())
    }

    pub(crate) fn engine_call(entry: &'static str, cause: impl std::fmt::Display) -> Self {
        Self::EngineCall {
            entry,
            cause: cause.to_string(),
        }
    }
}

pub type Result<T, E = QreanError> = std::result::Result<T, E>;
