//! Error types for the ruxtab library

use std::io;

use nom::error::{ContextError, ErrorKind, ParseError};

use crate::parser::song_parser::GpVersion;

/// Library error type for ruxtab operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TabError {
    /// I/O error when loading a tab file
    #[error("I/O error: {0}")]
    IoError(String),

    /// The file header announces a version this decoder does not handle
    #[error("unsupported version: {version:?}")]
    UnsupportedVersion { version: String },

    /// A read would go past the end of the buffer
    #[error("out of range read at byte {offset} while decoding {record} (version {})", version_label(.version))]
    OutOfRange {
        offset: usize,
        record: &'static str,
        version: Option<GpVersion>,
    },

    /// A field holds a value the decoder cannot make sense of
    #[error("invalid value at byte {offset} while decoding {record} (version {}): {reason}", version_label(.version))]
    InvalidValue {
        offset: usize,
        record: &'static str,
        version: Option<GpVersion>,
        reason: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

fn version_label(version: &Option<GpVersion>) -> String {
    version.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

impl From<io::Error> for TabError {
    fn from(error: io::Error) -> Self {
        Self::IoError(error.to_string())
    }
}

/// What went wrong inside a nom parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpParseErrorKind {
    /// Raised by a nom combinator, in practice always a short buffer.
    Nom(ErrorKind),
    UnsupportedVersion(String),
    InvalidValue(String),
}

/// Error type threaded through every nom parser of the crate.
///
/// Only the number of bytes left is kept so the error carries no lifetime;
/// the absolute offset is recovered once the total buffer length is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpParseError {
    pub remaining: usize,
    pub kind: GpParseErrorKind,
    /// Innermost record kind registered with `nom::error::context`
    pub record: Option<&'static str>,
}

impl GpParseError {
    /// Fatal error for a field holding an unusable value.
    pub fn invalid(input: &[u8], reason: impl Into<String>) -> nom::Err<Self> {
        nom::Err::Failure(GpParseError {
            remaining: input.len(),
            kind: GpParseErrorKind::InvalidValue(reason.into()),
            record: None,
        })
    }

    /// Fatal error for an unknown version header.
    pub fn unsupported_version(input: &[u8], version: String) -> nom::Err<Self> {
        nom::Err::Failure(GpParseError {
            remaining: input.len(),
            kind: GpParseErrorKind::UnsupportedVersion(version),
            record: Some("version"),
        })
    }

    /// Materialize the library error once the buffer length and version are known.
    pub fn into_tab_error(self, buffer_len: usize, version: Option<GpVersion>) -> TabError {
        let offset = buffer_len.saturating_sub(self.remaining);
        let record = self.record.unwrap_or("file");
        match self.kind {
            GpParseErrorKind::Nom(_) => TabError::OutOfRange {
                offset,
                record,
                version,
            },
            GpParseErrorKind::UnsupportedVersion(version) => {
                TabError::UnsupportedVersion { version }
            }
            GpParseErrorKind::InvalidValue(reason) => TabError::InvalidValue {
                offset,
                record,
                version,
                reason,
            },
        }
    }
}

impl ParseError<&[u8]> for GpParseError {
    fn from_error_kind(input: &[u8], kind: ErrorKind) -> Self {
        GpParseError {
            remaining: input.len(),
            kind: GpParseErrorKind::Nom(kind),
            record: None,
        }
    }

    fn append(_input: &[u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl ContextError<&[u8]> for GpParseError {
    fn add_context(_input: &[u8], ctx: &'static str, mut other: Self) -> Self {
        // keep the innermost record, contexts are added while unwinding
        if other.record.is_none() {
            other.record = Some(ctx);
        }
        other
    }
}

/// Turn a nom error from a full decode into the library error.
pub fn from_nom_error(
    err: nom::Err<GpParseError>,
    buffer_len: usize,
    version: Option<GpVersion>,
) -> TabError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.into_tab_error(buffer_len, version),
        nom::Err::Incomplete(_) => TabError::OutOfRange {
            offset: buffer_len,
            record: "file",
            version,
        },
    }
}
