//! Stream identity and connection recipe
//!
//! A [`StreamDescriptor`] is immutable once created: changing where a stream
//! comes from means removing it and creating a new one.

use serde::{Deserialize, Serialize};

use super::error::DescriptorError;

/// Unique identifier for a managed stream
///
/// Numeric camera ids from configuration files are accepted and stored in
/// their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawStreamId")]
pub struct StreamId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStreamId {
    Number(u64),
    Text(String),
}

impl From<RawStreamId> for StreamId {
    fn from(raw: RawStreamId) -> Self {
        match raw {
            RawStreamId::Number(id) => Self::from(id),
            RawStreamId::Text(id) => Self(id),
        }
    }
}

impl StreamId {
    /// Create a new stream id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u32> for StreamId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for StreamId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Kind of video source behind a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Local capture device, addressed by index (`"0"`, `"/dev/video2"`)
    Device,
    /// Network camera or stream URL (`rtsp://`, `http://`, ...)
    NetworkUrl,
    /// Named alias resolved by the connector (`"webcam"`, `"test-pattern"`)
    FallbackAlias,
}

impl SourceKind {
    /// Stable name used in status output
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Device => "device",
            SourceKind::NetworkUrl => "network-url",
            SourceKind::FallbackAlias => "fallback-alias",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and connection recipe for one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Unique stream id
    pub id: StreamId,
    /// Source kind
    pub kind: SourceKind,
    /// Device index, URL or alias name depending on `kind`
    pub connection: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
}

impl StreamDescriptor {
    /// Create a new descriptor with a generated name
    pub fn new(id: impl Into<StreamId>, kind: SourceKind, connection: impl Into<String>) -> Self {
        let id = id.into();
        let name = format!("Camera {}", id);
        Self {
            id,
            kind,
            connection: connection.into(),
            name,
        }
    }

    /// Descriptor for a local capture device
    pub fn device(id: impl Into<StreamId>, index: u32) -> Self {
        Self::new(id, SourceKind::Device, index.to_string())
    }

    /// Descriptor for a network stream
    pub fn network(id: impl Into<StreamId>, url: impl Into<String>) -> Self {
        Self::new(id, SourceKind::NetworkUrl, url)
    }

    /// Descriptor for an aliased source
    pub fn fallback(id: impl Into<StreamId>, alias: impl Into<String>) -> Self {
        Self::new(id, SourceKind::FallbackAlias, alias)
    }

    /// Set the human-readable name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Device index for `Device` sources
    ///
    /// Accepts a bare index or a `/dev/videoN` path.
    pub fn device_index(&self) -> Option<u32> {
        let raw = self.connection.trim();
        let digits = raw.strip_prefix("/dev/video").unwrap_or(raw);
        digits.parse().ok()
    }

    /// Check that all required fields are present and well-formed
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.id.as_str().trim().is_empty() {
            return Err(DescriptorError::EmptyId);
        }

        let connection = self.connection.trim();
        if connection.is_empty() {
            return Err(DescriptorError::MissingConnection(self.id.clone()));
        }

        match self.kind {
            SourceKind::Device if self.device_index().is_none() => {
                Err(DescriptorError::InvalidDevice {
                    id: self.id.clone(),
                    value: connection.to_string(),
                })
            }
            SourceKind::NetworkUrl if !has_scheme(connection) => Err(DescriptorError::InvalidUrl {
                id: self.id.clone(),
                value: connection.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn has_scheme(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && !rest.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        None => false,
    }
}
