//! Video sources
//!
//! A [`SourceConnector`] turns a [`StreamDescriptor`] into an open
//! [`SourceHandle`] with a single attempt. It never retries: retry policy
//! belongs to the capture loop, which makes it testable with scripted
//! connectors.
//!
//! Handles are created and used on the owning capture thread only, so they do
//! not need to be `Send` (some camera backends are not).

pub mod config;
pub mod connector;
#[cfg(feature = "device")]
pub mod device;
pub mod descriptor;
pub mod error;
pub mod ffmpeg;
pub mod synthetic;

use std::sync::Arc;

use image::RgbImage;

pub use config::{AliasTarget, ConnectorConfig};
pub use connector::MediaConnector;
pub use descriptor::{SourceKind, StreamDescriptor, StreamId};
pub use error::{ConnectError, DescriptorError, ReadError};
pub use ffmpeg::FfmpegSource;
pub use synthetic::SyntheticSource;

/// Out-of-band release for a handle whose owner is blocked in `read_frame`
///
/// Calling it must make a pending or future `read_frame` return promptly.
pub type ForceClose = Arc<dyn Fn() + Send + Sync>;

/// An open video source
pub trait SourceHandle {
    /// Block until the next frame arrives or the source's own timeout elapses
    fn read_frame(&mut self) -> Result<RgbImage, ReadError>;

    /// Whether the underlying resource is still open
    fn is_open(&self) -> bool;

    /// Release the underlying resource. Safe to call more than once.
    fn close(&mut self);

    /// Release hook usable from another thread, if the source supports it
    fn force_close(&self) -> Option<ForceClose> {
        None
    }
}

/// Opens source handles for descriptors
pub trait SourceConnector: Send + Sync {
    /// Make a single attempt to open the source
    fn connect(&self, descriptor: &StreamDescriptor) -> Result<Box<dyn SourceHandle>, ConnectError>;

    /// Release a handle. Idempotent.
    fn disconnect(&self, handle: &mut dyn SourceHandle) {
        handle.close();
    }
}
