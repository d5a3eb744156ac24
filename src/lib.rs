//! Resilient live camera stream manager
//!
//! `camstream` owns connections to video sources (local capture devices,
//! network cameras, or aliased fallbacks), keeps only the freshest encoded
//! frame of each stream, reconnects on failure with a bounded attempt budget,
//! and lets any number of viewers poll the latest frame at their own pace.
//!
//! # Architecture
//!
//! ```text
//!                           Arc<StreamRegistry>
//!                     ┌───────────────────────────┐
//!                     │ streams: HashMap<Id,      │
//!                     │   Arc<CaptureLoop>>       │
//!                     └─────────────┬─────────────┘
//!                                   │
//!         ┌─────────────────────────┼─────────────────────────┐
//!         ▼                         ▼                         ▼
//!   [capture thread]          [capture thread]          [capture thread]
//!   connect → read            connect → read            connect → read
//!   resize → caption          resize → caption          resize → caption
//!   encode → FrameSlot        encode → FrameSlot        encode → FrameSlot
//!         │  every Nth frame
//!         └──► tokio task: AnalysisHook::analyze() ──► reward / highlights
//!
//!   [viewer] ViewerFeed ──► FrameSlot::latest_since() ──► ViewerMessage
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camstream::{MediaConnector, StreamDescriptor, StreamRegistry};
//!
//! # async fn example() -> Result<(), camstream::RegistryError> {
//! let registry = StreamRegistry::new(Arc::new(MediaConnector::default()));
//! let descriptor = StreamDescriptor::network("lobby", "rtsp://192.168.1.117:8554/stream");
//! registry.create(descriptor).await?;
//! registry.start(&"lobby".into()).await?;
//!
//! if let Some(frame) = registry.latest_frame(&"lobby".into()).await? {
//!     println!("{} bytes at {}", frame.data.len(), frame.timestamp_secs());
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod capture;
mod duration;
pub mod error;
pub mod frame;
pub mod registry;
pub mod relay;
pub mod source;
pub mod stats;

pub use analysis::{AnalysisError, AnalysisHook, Annotation, Highlight, HttpAnalysisHook, RewardPolicy};
pub use capture::{CaptureConfig, CaptureLoop, CaptureState, StreamStatus};
pub use error::{Error, Result};
pub use frame::{EncodedFrame, FrameProcessor, FrameSlot};
pub use registry::{RegistryConfig, RegistryError, StreamRegistry};
pub use relay::{ViewerFeed, ViewerMessage};
pub use source::{
    ConnectError, ConnectorConfig, MediaConnector, ReadError, SourceConnector, SourceHandle,
    SourceKind, StreamDescriptor, StreamId,
};
pub use stats::{FpsCounter, RegistrySummary};
