//! Viewer message format

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

use crate::analysis::{Annotation, Highlight};
use crate::capture::{CaptureLoop, CaptureState};
use crate::frame::EncodedFrame;
use crate::source::StreamId;

/// One frame plus stream state, as relayed to a viewer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerMessage {
    pub stream_id: StreamId,
    pub sequence: u64,
    /// JPEG bytes, base64 encoded
    pub frame_base64: String,
    /// Capture time as fractional Unix seconds
    pub timestamp_seconds: f64,
    pub fps: u32,
    pub status: CaptureState,
    pub annotations: Vec<Annotation>,
    pub recent_highlights: Vec<Highlight>,
    pub reward_score: u64,
}

impl ViewerMessage {
    /// Build a message for `frame` from the current state of `stream`
    pub fn from_frame(stream: &CaptureLoop, frame: &EncodedFrame, recent_highlights: usize) -> Self {
        let status = stream.status();
        Self {
            stream_id: status.id,
            sequence: frame.sequence,
            frame_base64: STANDARD.encode(&frame.data),
            timestamp_seconds: frame.timestamp_secs(),
            fps: status.fps,
            status: status.state,
            annotations: stream.annotations(),
            recent_highlights: stream.recent_highlights(recent_highlights),
            reward_score: status.reward_score,
        }
    }

    /// Serialize to the JSON sent over the wire
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
