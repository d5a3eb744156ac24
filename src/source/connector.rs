//! Default connector dispatching on [`SourceKind`]

use tracing::{debug, info};

use super::config::{AliasTarget, ConnectorConfig};
use super::descriptor::{SourceKind, StreamDescriptor};
use super::error::ConnectError;
use super::ffmpeg::FfmpegSource;
use super::synthetic::SyntheticSource;
use super::{SourceConnector, SourceHandle};

/// Connector for devices, network URLs and aliases
///
/// Adding a source kind means adding a match arm in [`MediaConnector::connect`].
#[derive(Debug, Clone, Default)]
pub struct MediaConnector {
    config: ConnectorConfig,
}

impl MediaConnector {
    /// Create a connector with custom configuration
    pub fn new(config: ConnectorConfig) -> Self {
        Self { config }
    }

    /// Get the connector configuration
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    fn open_device(&self, index: u32) -> Result<Box<dyn SourceHandle>, ConnectError> {
        #[cfg(feature = "device")]
        {
            let source = super::device::DeviceSource::open(index, &self.config)?;
            Ok(Box::new(source))
        }
        #[cfg(not(feature = "device"))]
        {
            Err(ConnectError::Unavailable(format!(
                "device {} requested but capture device support is not compiled in",
                index
            )))
        }
    }

    fn open_network(&self, url: &str) -> Result<Box<dyn SourceHandle>, ConnectError> {
        Ok(Box::new(FfmpegSource::open(url, &self.config)?))
    }

    fn open_synthetic(&self) -> Box<dyn SourceHandle> {
        let (width, height) = self.config.resolution;
        Box::new(SyntheticSource::new(width, height, self.config.target_fps))
    }
}

impl SourceConnector for MediaConnector {
    fn connect(&self, descriptor: &StreamDescriptor) -> Result<Box<dyn SourceHandle>, ConnectError> {
        debug!(
            stream = %descriptor.id,
            kind = %descriptor.kind,
            connection = %descriptor.connection,
            "Connecting source"
        );

        let handle = match descriptor.kind {
            SourceKind::Device => {
                let index = descriptor.device_index().ok_or_else(|| {
                    ConnectError::Unavailable(format!(
                        "invalid device index {:?}",
                        descriptor.connection
                    ))
                })?;
                self.open_device(index)?
            }
            SourceKind::NetworkUrl => self.open_network(descriptor.connection.trim())?,
            SourceKind::FallbackAlias => {
                let alias = descriptor.connection.trim();
                let target = self.config.resolve_alias(alias).ok_or_else(|| {
                    ConnectError::Unavailable(format!("unknown source alias {:?}", alias))
                })?;

                info!(stream = %descriptor.id, alias = alias, target = ?target, "Resolved alias");

                match target {
                    AliasTarget::Device(index) => self.open_device(*index)?,
                    AliasTarget::Network(url) => self.open_network(url)?,
                    AliasTarget::Synthetic => self.open_synthetic(),
                }
            }
        };

        info!(stream = %descriptor.id, kind = %descriptor.kind, "Source connected");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_alias() {
        let connector = MediaConnector::new(ConnectorConfig::default().resolution(32, 24));
        let desc = StreamDescriptor::fallback("t", "test-pattern");

        let mut handle = connector.connect(&desc).unwrap();
        assert!(handle.is_open());
        let frame = handle.read_frame().unwrap();
        assert_eq!(frame.dimensions(), (32, 24));

        connector.disconnect(handle.as_mut());
        connector.disconnect(handle.as_mut());
        assert!(!handle.is_open());
    }

    #[test]
    fn test_unknown_alias_is_unavailable() {
        let connector = MediaConnector::default();
        let desc = StreamDescriptor::fallback("t", "satellite");

        let result = connector.connect(&desc);
        assert!(matches!(result, Err(ConnectError::Unavailable(_))));
    }

    #[cfg(not(feature = "device"))]
    #[test]
    fn test_device_without_feature_is_unavailable() {
        let connector = MediaConnector::default();
        let desc = StreamDescriptor::device("d", 0);

        let result = connector.connect(&desc);
        assert!(result.err().is_some_and(|e| e.is_unavailable()));
    }
}
