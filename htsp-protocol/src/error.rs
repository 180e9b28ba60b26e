//! Error types for the HTSP wire format.

use thiserror::Error;

/// Errors raised while encoding or decoding a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame payload exceeds the sanity limit.
    #[error("Frame too large: {0} bytes (max: {1})")]
    FrameTooLarge(u32, u32),

    /// A field header or body extends past the end of the frame.
    #[error("Truncated field: expected {expected} bytes, got {actual}")]
    TruncatedField { expected: usize, actual: usize },

    /// A field name or string value is not valid UTF-8.
    #[error("Invalid UTF-8 in {0} field")]
    InvalidString(&'static str),

    /// An integer field is wider than 64 bits.
    #[error("Integer field too wide: {0} bytes")]
    IntegerTooWide(usize),
}
