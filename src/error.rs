//! Crate-level error type
//!
//! Each subsystem has its own error enum; this type wraps them for callers
//! that want a single `Result`.

use crate::analysis::AnalysisError;
use crate::frame::EncodeError;
use crate::registry::RegistryError;
use crate::source::{ConnectError, DescriptorError, ReadError};

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Registry operation failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Stream descriptor is invalid
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Source could not be opened
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Source read failed
    #[error(transparent)]
    Read(#[from] ReadError),

    /// Frame could not be encoded
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Analysis call failed
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
