//! Statistics and metrics for managed streams

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::capture::{CaptureState, StreamStatus};

/// Rolling frames-per-second counter
///
/// Counts frames in a fixed window (1 s by default) and reports the count
/// when the window closes.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: Duration,
    window_start: Instant,
    frames: u32,
    last_rate: u32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::with_window(Duration::from_secs(1))
    }
}

impl FpsCounter {
    /// Create a counter with a 1 s window
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a counter with a custom window
    pub fn with_window(window: Duration) -> Self {
        Self::starting_at(window, Instant::now())
    }

    fn starting_at(window: Duration, now: Instant) -> Self {
        Self {
            window: window.max(Duration::from_millis(1)),
            window_start: now,
            frames: 0,
            last_rate: 0,
        }
    }

    /// Record one frame. Returns the new rate if the window closed.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;
        self.poll(now)
    }

    /// Close the window if it has elapsed, without recording a frame
    pub fn poll(&mut self, now: Instant) -> Option<u32> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        // Normalise to frames per second when the window overran
        let rate = (f64::from(self.frames) / elapsed.as_secs_f64()).round() as u32;
        self.last_rate = rate;
        self.frames = 0;
        self.window_start = now;
        Some(rate)
    }

    /// Most recently computed rate
    pub fn rate(&self) -> u32 {
        self.last_rate
    }

    /// Forget counted frames and the last rate
    pub fn reset(&mut self, now: Instant) {
        *self = Self::starting_at(self.window, now);
    }
}

/// Registry-wide totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistrySummary {
    /// Number of registered streams
    pub total_streams: usize,
    /// Streams with a running capture context
    pub active_streams: usize,
    /// Streams that exhausted their reconnect budget
    pub failed_streams: usize,
    /// Frames published across all streams
    pub total_frames: u64,
    /// Stored annotations across all streams
    pub total_annotations: usize,
    /// Highlights across all streams
    pub total_highlights: usize,
    /// Sum of reward scores
    pub total_reward: u64,
}

impl RegistrySummary {
    /// Aggregate a set of stream statuses
    pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a StreamStatus>) -> Self {
        statuses
            .into_iter()
            .fold(Self::default(), |mut summary, status| {
                summary.total_streams += 1;
                if status.running {
                    summary.active_streams += 1;
                }
                if status.state == CaptureState::Failed {
                    summary.failed_streams += 1;
                }
                summary.total_frames += status.frames_published;
                summary.total_annotations += status.annotation_count;
                summary.total_highlights += status.highlight_count;
                summary.total_reward += status.reward_score;
                summary
            })
    }
}
