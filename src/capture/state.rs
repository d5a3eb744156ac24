//! Capture state machine states and status snapshots

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use crate::source::{SourceKind, StreamId};

/// Lifecycle state of a capture loop
///
/// ```text
/// Idle ─► Connecting ─► Streaming ─┐
///            ▲   │          │      │ read failure
///            │   ▼          ▼      │
///            └ Reconnecting ◄──────┘
///                  │ budget exhausted
///                  ▼
///                Failed
///
/// any state ─► Stopped   (explicit stop)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CaptureState {
    /// Created, never started
    Idle = 0,
    /// Opening the source
    Connecting = 1,
    /// Publishing frames
    Streaming = 2,
    /// Waiting to retry after a failure
    Reconnecting = 3,
    /// Reconnect budget exhausted; needs an explicit start
    Failed = 4,
    /// Stopped by request
    Stopped = 5,
}

impl CaptureState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CaptureState::Connecting,
            2 => CaptureState::Streaming,
            3 => CaptureState::Reconnecting,
            4 => CaptureState::Failed,
            5 => CaptureState::Stopped,
            _ => CaptureState::Idle,
        }
    }

    /// Stable name used in status output
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Connecting => "connecting",
            CaptureState::Streaming => "streaming",
            CaptureState::Reconnecting => "reconnecting",
            CaptureState::Failed => "failed",
            CaptureState::Stopped => "stopped",
        }
    }

    /// Whether a capture thread is expected to be running in this state
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            CaptureState::Connecting | CaptureState::Streaming | CaptureState::Reconnecting
        )
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free cell holding a [`CaptureState`]
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn new(state: CaptureState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> CaptureState {
        CaptureState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: CaptureState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Point-in-time view of one stream
///
/// Plain data: safe to serialize and hand across the transport boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamStatus {
    /// Stream id
    pub id: StreamId,
    /// Human-readable name
    pub name: String,
    /// Source kind
    pub kind: SourceKind,
    /// Connection string
    pub connection: String,
    /// Lifecycle state
    pub state: CaptureState,
    /// A capture context is running
    pub running: bool,
    /// The source handle is open
    pub connected: bool,
    /// Frames per second over the last window
    pub fps: u32,
    /// Unconsumed frames buffered (0 or 1)
    pub queue_depth: usize,
    /// Consecutive failed connection attempts
    pub attempt_count: u32,
    /// Reconnect budget
    pub max_attempts: u32,
    /// Frames published since creation
    pub frames_published: u64,
    /// Annotations in the latest analysis result
    pub annotation_count: usize,
    /// Highlights recorded
    pub highlight_count: usize,
    /// Accumulated reward score
    pub reward_score: u64,
    /// Most recent connect or read failure
    pub last_error: Option<String>,
}
