//! Capture loop configuration

use std::time::Duration;

use serde::Deserialize;

use crate::analysis::RewardPolicy;
use crate::frame::transform::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_WIDTH};

/// Per-stream capture options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Frames wider than this are downscaled (0 = never)
    pub max_width: u32,

    /// JPEG quality (1-100)
    pub jpeg_quality: u8,

    /// Burn the timestamp/status caption into frames
    pub overlay: bool,

    /// Analyze every Nth published frame (0 = never)
    pub analysis_interval: u64,

    /// Maximum concurrent analysis calls per stream
    pub max_inflight_analyses: usize,

    /// Analysis calls exceeding this are abandoned
    #[serde(deserialize_with = "crate::duration::seconds")]
    pub analysis_timeout: Duration,

    /// Upper bound on capture cycles per second
    pub target_fps: u32,

    /// Delay before retrying after a failed or dropped connection
    #[serde(deserialize_with = "crate::duration::seconds")]
    pub reconnect_delay: Duration,

    /// Delay before retrying a source that is categorically unavailable
    #[serde(deserialize_with = "crate::duration::seconds")]
    pub unavailable_delay: Duration,

    /// Consecutive failed connection attempts before the stream is marked failed
    pub max_attempts: u32,

    /// How long stop waits for the capture thread before force-releasing
    #[serde(deserialize_with = "crate::duration::seconds")]
    pub stop_timeout: Duration,

    /// Reward and highlight rules
    pub reward: RewardPolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            overlay: true,
            analysis_interval: 5,
            max_inflight_analyses: 2,
            analysis_timeout: Duration::from_secs(10),
            target_fps: 30,
            reconnect_delay: Duration::from_secs(2),
            unavailable_delay: Duration::from_secs(5),
            max_attempts: 5,
            stop_timeout: Duration::from_secs(5),
            reward: RewardPolicy::default(),
        }
    }
}

impl CaptureConfig {
    /// Set maximum frame width
    pub fn max_width(mut self, width: u32) -> Self {
        self.max_width = width;
        self
    }

    /// Set JPEG quality
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Disable the caption overlay
    pub fn disable_overlay(mut self) -> Self {
        self.overlay = false;
        self
    }

    /// Set the analysis sampling interval
    pub fn analysis_interval(mut self, every: u64) -> Self {
        self.analysis_interval = every;
        self
    }

    /// Set the in-flight analysis cap
    pub fn max_inflight_analyses(mut self, max: usize) -> Self {
        self.max_inflight_analyses = max.max(1);
        self
    }

    /// Set analysis timeout
    pub fn analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    /// Set the capture rate cap
    pub fn target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps.max(1);
        self
    }

    /// Set reconnect delay
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set delay used for unavailable sources
    pub fn unavailable_delay(mut self, delay: Duration) -> Self {
        self.unavailable_delay = delay;
        self
    }

    /// Set the reconnect budget
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set stop timeout
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set reward policy
    pub fn reward(mut self, policy: RewardPolicy) -> Self {
        self.reward = policy;
        self
    }

    /// Minimum duration of one capture cycle
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }
}
