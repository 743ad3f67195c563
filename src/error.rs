//! Error types shared by every rendering and export path.

use thiserror::Error;

use crate::diagnose::Reason;
use crate::style::EcLevel;

/// Result type for qistyle operations.
pub type QrResult<T> = Result<T, QrError>;

/// Errors that can occur while encoding, rendering or exporting a symbol.
///
/// An unreadable symbol is not an error: verification always produces a
/// [`Verdict`](crate::diagnose::Verdict).
#[derive(Debug, Error)]
pub enum QrError {
    /// Nothing to encode.
    #[error("payload is empty")]
    EmptyPayload,

    /// The payload does not fit in any symbol version at this level.
    #[error("payload too long for error correction level {level}")]
    PayloadTooLong {
        /// Level that was requested (after any logo upgrade).
        level: EcLevel,
    },

    /// The encoder rejected the payload for another reason.
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// A style field is out of range or malformed.
    #[error("invalid style: {0}")]
    InvalidStyle(String),

    /// No drawing surface could be allocated for the requested size.
    #[error("drawing surface unavailable: {0}")]
    Canvas(String),

    /// Logo bytes could not be decoded.
    #[error("failed to decode logo: {0}")]
    Logo(String),

    /// Encoding the artifact into output bytes failed.
    #[error("export failed: {0}")]
    Export(String),

    /// Export refused because the symbol did not verify.
    #[error("export blocked: symbol is unreadable ({0})")]
    ExportBlocked(Reason),

    /// A style document could not be parsed.
    #[error("invalid style document: {0}")]
    Config(#[from] serde_json::Error),
}

impl QrError {
    /// Maps an encoder failure for `level` into the crate taxonomy.
    pub(crate) fn from_encoder(err: qrcode::types::QrError, level: EcLevel) -> Self {
        match err {
            qrcode::types::QrError::DataTooLong => Self::PayloadTooLong { level },
            other => Self::Encode(other.to_string()),
        }
    }
}
