//! Registry error types

use crate::source::{DescriptorError, StreamId};

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    /// No stream with this id
    #[error("Stream not found: {0}")]
    NotFound(StreamId),

    /// A stream with this id is already registered
    #[error("Stream already exists: {0}")]
    AlreadyExists(StreamId),

    /// Descriptor is missing required fields or malformed
    #[error("Invalid stream configuration: {0}")]
    InvalidConfiguration(#[from] DescriptorError),

    /// The capture thread could not be spawned
    #[error("Failed to start capture thread: {0}")]
    Spawn(String),
}
