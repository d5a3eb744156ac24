//! Encoded frames and the freshest-frame buffer
//!
//! # Zero-Copy Design
//!
//! Encoded frames are published as `Arc<EncodedFrame>` whose payload is a
//! `bytes::Bytes`. The capture thread, the frame slot, analysis tasks and any
//! number of viewers share one allocation per frame.

pub mod overlay;
pub mod slot;
pub mod transform;

use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use overlay::Caption;
pub use slot::FrameSlot;
pub use transform::FrameProcessor;

/// A compressed (JPEG) frame ready for delivery
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Per-stream sequence number, increasing across restarts
    pub sequence: u64,
    /// Wall-clock capture time
    pub captured_at: DateTime<Utc>,
    /// Encoded width in pixels
    pub width: u32,
    /// Encoded height in pixels
    pub height: u32,
    /// JPEG bytes
    pub data: Bytes,
}

impl EncodedFrame {
    /// Capture time as fractional seconds since the Unix epoch
    pub fn timestamp_secs(&self) -> f64 {
        self.captured_at.timestamp_millis() as f64 / 1000.0
    }
}

/// Frame encoding failure
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// JPEG encoder rejected the image
    #[error("JPEG encode failed: {0}")]
    Jpeg(#[from] image::ImageError),
}
