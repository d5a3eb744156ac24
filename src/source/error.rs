//! Source error types

use super::descriptor::StreamId;

/// Failure to open a source
///
/// The connector makes a single attempt per call; the capture loop decides
/// whether and when to retry.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Source cannot be opened at all in this environment (unsupported kind,
    /// missing binary or feature, unknown alias)
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// Source exists but the attempt failed (refused, timed out, no frames)
    #[error("Connect failed: {0}")]
    Failed(String),
}

impl ConnectError {
    /// Whether retrying soon is unlikely to help
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ConnectError::Unavailable(_))
    }
}

/// Failure while reading from an open source
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// No frame arrived within the source's read timeout
    #[error("Timed out waiting for frame")]
    Timeout,

    /// Source ended or was released
    #[error("Source closed")]
    Closed,

    /// Frame bytes could not be decoded
    #[error("Frame decode failed: {0}")]
    Decode(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid stream descriptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    /// Stream id is empty
    #[error("Stream id must not be empty")]
    EmptyId,

    /// Connection string is empty
    #[error("Stream {0}: connection string is required")]
    MissingConnection(StreamId),

    /// Device connection string is not an index
    #[error("Stream {id}: invalid device index {value:?}")]
    InvalidDevice { id: StreamId, value: String },

    /// Network connection string is not a URL
    #[error("Stream {id}: {value:?} is not a URL")]
    InvalidUrl { id: StreamId, value: String },
}
