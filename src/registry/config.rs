//! Registry configuration

use std::time::Duration;

use serde::Deserialize;

use crate::capture::CaptureConfig;
use crate::source::{ConnectorConfig, StreamDescriptor};

/// Registry configuration options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Capture options applied to every stream
    pub capture: CaptureConfig,

    /// Options for the default [`MediaConnector`](crate::source::MediaConnector)
    pub connector: ConnectorConfig,

    /// Streams registered by [`StreamRegistry::load_initial_streams`](super::StreamRegistry::load_initial_streams)
    pub initial_streams: Vec<StreamDescriptor>,

    /// Start initial streams as soon as they are registered
    pub autostart: bool,

    /// How often a viewer feed polls for a new frame
    #[serde(deserialize_with = "crate::duration::seconds")]
    pub viewer_interval: Duration,

    /// Highlights included in each viewer message
    pub recent_highlights: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            connector: ConnectorConfig::default(),
            initial_streams: Vec::new(),
            autostart: false,
            viewer_interval: Duration::from_millis(33),
            recent_highlights: 5,
        }
    }
}

impl RegistryConfig {
    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set capture options
    pub fn capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }

    /// Set connector options
    pub fn connector(mut self, connector: ConnectorConfig) -> Self {
        self.connector = connector;
        self
    }

    /// Add a stream to register at load time
    pub fn initial_stream(mut self, descriptor: StreamDescriptor) -> Self {
        self.initial_streams.push(descriptor);
        self
    }

    /// Start initial streams when loaded
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    /// Set viewer polling interval
    pub fn viewer_interval(mut self, interval: Duration) -> Self {
        self.viewer_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set number of highlights relayed to viewers
    pub fn recent_highlights(mut self, count: usize) -> Self {
        self.recent_highlights = count;
        self
    }
}
