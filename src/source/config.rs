//! Connector configuration

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// What a fallback alias resolves to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "target")]
pub enum AliasTarget {
    /// Local capture device by index
    Device(u32),
    /// Network URL
    Network(String),
    /// Generated test pattern
    Synthetic,
}

/// Source connector options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// ffmpeg binary used for network sources
    pub ffmpeg_path: PathBuf,

    /// Maximum time to wait for the first frame when opening a source
    #[serde(deserialize_with = "crate::duration::seconds")]
    pub connect_timeout: Duration,

    /// Maximum time a single frame read may block
    #[serde(deserialize_with = "crate::duration::seconds")]
    pub read_timeout: Duration,

    /// Frame rate requested from the source
    pub target_fps: u32,

    /// Resolution requested from capture devices and the test pattern
    pub resolution: (u32, u32),

    /// Fallback alias table
    pub aliases: HashMap<String, AliasTarget>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        let mut aliases = HashMap::new();
        aliases.insert("webcam".to_string(), AliasTarget::Device(0));
        aliases.insert("continuity".to_string(), AliasTarget::Device(0));
        aliases.insert("test-pattern".to_string(), AliasTarget::Synthetic);

        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(5),
            target_fps: 30,
            resolution: (1280, 720),
            aliases,
        }
    }
}

impl ConnectorConfig {
    /// Set the ffmpeg binary path
    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set requested frame rate
    pub fn target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps.max(1);
        self
    }

    /// Set requested resolution
    pub fn resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = (width.max(1), height.max(1));
        self
    }

    /// Add or replace an alias
    pub fn alias(mut self, name: impl Into<String>, target: AliasTarget) -> Self {
        self.aliases.insert(name.into(), target);
        self
    }

    /// Look up an alias (case-insensitive)
    pub fn resolve_alias(&self, name: &str) -> Option<&AliasTarget> {
        let name = name.trim();
        self.aliases.get(name).or_else(|| {
            self.aliases
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
                .map(|(_, target)| target)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectorConfig::default();

        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.target_fps, 30);
        assert_eq!(config.resolve_alias("webcam"), Some(&AliasTarget::Device(0)));
        assert_eq!(
            config.resolve_alias("test-pattern"),
            Some(&AliasTarget::Synthetic)
        );
    }

    #[test]
    fn test_alias_lookup_case_insensitive() {
        let config = ConnectorConfig::default();
        assert_eq!(
            config.resolve_alias("Continuity"),
            Some(&AliasTarget::Device(0))
        );
        assert_eq!(config.resolve_alias("unknown"), None);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ConnectorConfig::default()
            .ffmpeg_path("/usr/local/bin/ffmpeg")
            .connect_timeout(Duration::from_secs(3))
            .read_timeout(Duration::from_millis(500))
            .target_fps(0)
            .resolution(640, 480)
            .alias("door", AliasTarget::Network("rtsp://door/stream".into()));

        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.read_timeout, Duration::from_millis(500));
        assert_eq!(config.target_fps, 1);
        assert_eq!(config.resolution, (640, 480));
        assert_eq!(
            config.resolve_alias("door"),
            Some(&AliasTarget::Network("rtsp://door/stream".into()))
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{
            "target_fps": 15,
            "aliases": { "garage": { "kind": "device", "target": 2 } }
        }"#;
        let config: ConnectorConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.target_fps, 15);
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert_eq!(config.resolve_alias("garage"), Some(&AliasTarget::Device(2)));
        // Replaced map drops the defaults
        assert_eq!(config.resolve_alias("webcam"), None);
    }
}
