//! Stream registry
//!
//! Maps stream ids to their [`CaptureLoop`](crate::capture::CaptureLoop) and
//! exposes the control surface a transport layer needs: create, start, stop,
//! get, list, remove, plus frame and viewer access.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<StreamRegistry>
//!                     ┌─────────────────────────┐
//!                     │ streams: RwLock<HashMap<│
//!                     │   StreamId,             │
//!                     │   Arc<CaptureLoop>>>    │
//!                     └───────────┬─────────────┘
//!                                 │ lookup, then lock released
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!    start()/stop()          status()               ViewerFeed
//!    (per-loop mutex)        (atomics only)         latest_since()
//! ```
//!
//! Streams share nothing but the connector and the analysis hook, so an
//! error or a stuck source in one never affects another.

pub mod config;
pub mod error;
pub mod store;

pub use config::RegistryConfig;
pub use error::RegistryError;
pub use store::StreamRegistry;
