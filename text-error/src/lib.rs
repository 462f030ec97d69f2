use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TextError>;

/// Errors shared by the source-text crates.
///
/// Stream failures are fatal for the document they occur in: the
/// underlying character stream is forward-only and cannot be re-read,
/// so there is no retry path and no partial result.
#[derive(Error, Debug)]
pub enum TextError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Decode error ({encoding}, byte {offset}): {reason}")]
    Decode {
        encoding: String,
        offset: u64,
        reason: String,
    },
    #[error("Index {index} out of bounds for length {len}")]
    OutOfBounds { index: usize, len: usize },
    #[error("Parsing error")]
    Parse,
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TextError {
    /// Build a decode error for a malformed or truncated byte
    /// sequence at the given absolute byte offset of the stream.
    pub fn decode(
        encoding: impl Into<String>,
        offset: u64,
        reason: impl Into<String>,
    ) -> Self {
        TextError::Decode {
            encoding: encoding.into(),
            offset,
            reason: reason.into(),
        }
    }
}
