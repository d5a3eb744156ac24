//! Stream registry implementation
//!
//! The central registry that owns every stream's capture loop and answers
//! control and status requests by stream id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinSet;

use super::config::RegistryConfig;
use super::error::RegistryError;
use crate::analysis::AnalysisHook;
use crate::capture::{CaptureLoop, StreamStatus};
use crate::frame::EncodedFrame;
use crate::relay::ViewerFeed;
use crate::source::{MediaConnector, SourceConnector, StreamDescriptor, StreamId};
use crate::stats::RegistrySummary;

/// Central registry for all managed streams
///
/// The map lock is only held to insert, look up or remove a loop. Starting,
/// stopping and status reads run against the cloned `Arc<CaptureLoop>`, so a
/// slow stop on one stream never stalls requests for another.
pub struct StreamRegistry {
    /// Map of stream id to capture loop
    streams: RwLock<HashMap<StreamId, Arc<CaptureLoop>>>,

    /// Opens sources for every stream
    connector: Arc<dyn SourceConnector>,

    /// Optional frame analysis
    hook: Option<Arc<dyn AnalysisHook>>,

    /// Configuration
    config: RegistryConfig,
}

impl StreamRegistry {
    /// Create a registry with default configuration
    pub fn new(connector: Arc<dyn SourceConnector>) -> Self {
        Self::with_config(connector, RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(connector: Arc<dyn SourceConnector>, config: RegistryConfig) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            connector,
            hook: None,
            config,
        }
    }

    /// Create a registry backed by a [`MediaConnector`] built from
    /// `config.connector`
    pub fn from_config(config: RegistryConfig) -> Self {
        let connector = Arc::new(MediaConnector::new(config.connector.clone()));
        Self::with_config(connector, config)
    }

    /// Attach an analysis hook to streams created from now on
    pub fn with_hook(mut self, hook: Arc<dyn AnalysisHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register the configured initial streams, starting them if
    /// `autostart` is set. Returns the number registered.
    pub async fn load_initial_streams(&self) -> Result<usize, RegistryError> {
        let mut loaded = 0;
        for descriptor in self.config.initial_streams.clone() {
            let id = descriptor.id.clone();
            self.create(descriptor).await?;
            if self.config.autostart {
                self.start(&id).await?;
            }
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Register a new stream in the `Idle` state
    pub async fn create(&self, descriptor: StreamDescriptor) -> Result<StreamStatus, RegistryError> {
        descriptor.validate()?;

        let mut streams = self.streams.write().await;
        if streams.contains_key(&descriptor.id) {
            return Err(RegistryError::AlreadyExists(descriptor.id));
        }

        let id = descriptor.id.clone();
        let stream = Arc::new(CaptureLoop::new(
            descriptor,
            Arc::clone(&self.connector),
            self.hook.clone(),
            self.config.capture.clone(),
        ));
        let status = stream.status();
        streams.insert(id.clone(), stream);

        tracing::info!(
            stream = %id,
            kind = %status.kind,
            connection = %status.connection,
            "Stream created"
        );

        Ok(status)
    }

    /// Start a stream. Starting a running stream is a no-op.
    pub async fn start(&self, id: &StreamId) -> Result<StreamStatus, RegistryError> {
        let stream = self.stream(id).await?;
        stream
            .start()
            .await
            .map_err(|e| RegistryError::Spawn(e.to_string()))?;
        Ok(stream.status())
    }

    /// Stop a stream and release its source. Stopping twice is a no-op.
    pub async fn stop(&self, id: &StreamId) -> Result<StreamStatus, RegistryError> {
        let stream = self.stream(id).await?;
        stream.stop().await;
        Ok(stream.status())
    }

    /// Status snapshot of one stream
    pub async fn get(&self, id: &StreamId) -> Result<StreamStatus, RegistryError> {
        Ok(self.stream(id).await?.status())
    }

    /// Status snapshots of every stream, ordered by id
    pub async fn list(&self) -> Vec<StreamStatus> {
        let mut statuses: Vec<StreamStatus> = self
            .snapshot()
            .await
            .iter()
            .map(|stream| stream.status())
            .collect();
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    /// Stop and unregister a stream, returning its final status
    pub async fn remove(&self, id: &StreamId) -> Result<StreamStatus, RegistryError> {
        let stream = self
            .streams
            .write()
            .await
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        stream.stop().await;
        tracing::info!(stream = %id, "Stream removed");

        Ok(stream.status())
    }

    /// Take the freshest frame of a stream, if one is buffered
    pub async fn latest_frame(
        &self,
        id: &StreamId,
    ) -> Result<Option<Arc<EncodedFrame>>, RegistryError> {
        Ok(self.stream(id).await?.take_latest())
    }

    /// Look up a stream's capture loop
    pub async fn stream(&self, id: &StreamId) -> Result<Arc<CaptureLoop>, RegistryError> {
        self.streams
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Open a viewer feed on a stream
    ///
    /// Feeds read frames without consuming them, so any number of viewers
    /// can follow the same stream.
    pub async fn watch(&self, id: &StreamId) -> Result<ViewerFeed, RegistryError> {
        let stream = self.stream(id).await?;
        tracing::debug!(stream = %id, "Viewer attached");
        Ok(ViewerFeed::spawn(
            stream,
            self.config.viewer_interval,
            self.config.recent_highlights,
        ))
    }

    /// Registry-wide totals
    pub async fn summary(&self) -> RegistrySummary {
        let statuses = self.list().await;
        RegistrySummary::from_statuses(&statuses)
    }

    /// Get total number of streams
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Stop every stream concurrently. Streams stay registered.
    pub async fn shutdown(&self) {
        let mut stops = JoinSet::new();
        for stream in self.snapshot().await {
            stops.spawn(async move { stream.stop().await });
        }

        while let Some(result) = stops.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Stream stop task failed");
            }
        }

        tracing::info!("All streams stopped");
    }

    async fn snapshot(&self) -> Vec<Arc<CaptureLoop>> {
        self.streams.read().await.values().cloned().collect()
    }
}
