use std::io;

use thiserror::Error;

use crate::record::RecordTag;

/// Errors raised while encoding or decoding wire records.
///
/// Offsets are byte positions from the start of the stream at which the
/// offending read began.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unexpected end of stream at offset {offset}")]
    UnexpectedEof { offset: u64 },

    #[error("unknown record tag {tag} at offset {offset}")]
    UnknownRecordTag { tag: u8, offset: u64 },

    #[error("unsupported record {tag:?} at offset {offset}")]
    UnsupportedRecord { tag: RecordTag, offset: u64 },

    #[error("unknown primitive type code {code} at offset {offset}")]
    UnknownPrimitiveCode { code: u8, offset: u64 },

    #[error("unknown binary type {code} at offset {offset}")]
    UnknownBinaryType { code: u8, offset: u64 },

    #[error("unknown array shape {code} at offset {offset}")]
    UnknownArrayShape { code: u8, offset: u64 },

    #[error("invalid {what} {value} at offset {offset}")]
    InvalidLength {
        what: &'static str,
        value: i64,
        offset: u64,
    },

    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidString { offset: u64 },

    #[error("invalid UTF-8 character at offset {offset}")]
    InvalidChar { offset: u64 },

    #[error("invalid decimal {text:?} at offset {offset}")]
    InvalidDecimal { text: String, offset: u64 },

    #[error("unsupported stream version {major}.{minor}")]
    UnsupportedVersion { major: i32, minor: i32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FormatError {
    /// Stream position of the failure, when known.
    pub fn offset(&self) -> Option<u64> {
        match self {
            FormatError::UnexpectedEof { offset }
            | FormatError::UnknownRecordTag { offset, .. }
            | FormatError::UnsupportedRecord { offset, .. }
            | FormatError::UnknownPrimitiveCode { offset, .. }
            | FormatError::UnknownBinaryType { offset, .. }
            | FormatError::UnknownArrayShape { offset, .. }
            | FormatError::InvalidLength { offset, .. }
            | FormatError::InvalidString { offset }
            | FormatError::InvalidChar { offset }
            | FormatError::InvalidDecimal { offset, .. } => Some(*offset),
            FormatError::UnsupportedVersion { .. } | FormatError::Io(_) => None,
        }
    }

    /// Whether this is a failure of the underlying byte stream rather than
    /// malformed content.
    pub fn is_io(&self) -> bool {
        matches!(self, FormatError::Io(_))
    }
}
