//! Archive error taxonomy
//!
//! Decode and encode failures are fatal and surfaced here; a referenced
//! track payload that is missing from the container is deliberately NOT an
//! error (the stem is registered silent and a warning is logged).

use thiserror::Error;

/// Errors produced by the song pack codec
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The metadata document is missing or unparsable
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// The metadata document parsed but lacks required song fields
    #[error("invalid bundle: {0}")]
    InvalidBundle(String),

    /// The container itself is damaged (bad magic, truncated entry, ...)
    #[error("container corrupted: {0}")]
    Corrupted(String),

    /// Any underlying read/write/rename failure, with the original cause
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
