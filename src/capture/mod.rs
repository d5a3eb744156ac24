//! Per-stream capture
//!
//! A [`CaptureLoop`] runs one dedicated thread per started stream. The thread
//! is the only owner of the source handle; everything else reads shared,
//! lock-free state through [`CaptureLoop::status`] and the frame slot.

mod capture_loop;
pub mod config;
mod insights;
mod shared;
pub mod state;
mod worker;

pub use capture_loop::CaptureLoop;
pub use config::CaptureConfig;
pub use state::{CaptureState, StreamStatus};
