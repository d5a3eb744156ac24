//! Per-stream capture loop handle

use std::io;
use std::sync::Arc;
use std::thread::{self, Thread};

use tokio::runtime::Handle;
use tokio::sync::{oneshot, Mutex};

use super::config::CaptureConfig;
use super::shared::StreamShared;
use super::state::{CaptureState, StreamStatus};
use super::worker::Worker;
use crate::analysis::{AnalysisHook, Annotation, Highlight};
use crate::frame::EncodedFrame;
use crate::source::{SourceConnector, StreamDescriptor, StreamId};

/// Thread bookkeeping guarded across start/stop
#[derive(Default)]
struct Control {
    thread: Option<Thread>,
    done: Option<oneshot::Receiver<()>>,
}

/// Owns the capture thread of one stream
///
/// The thread connects through the [`SourceConnector`], runs the capture
/// cycle, reconnects with a fixed delay and gives up after
/// [`CaptureConfig::max_attempts`] consecutive failed connects. Every `N`th
/// frame is handed to the [`AnalysisHook`] on a tokio task.
///
/// `start` and `stop` are serialized; status reads never wait on them.
pub struct CaptureLoop {
    shared: Arc<StreamShared>,
    connector: Arc<dyn SourceConnector>,
    hook: Option<Arc<dyn AnalysisHook>>,
    control: Mutex<Control>,
}

impl CaptureLoop {
    /// Create an idle capture loop
    pub fn new(
        descriptor: StreamDescriptor,
        connector: Arc<dyn SourceConnector>,
        hook: Option<Arc<dyn AnalysisHook>>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            shared: Arc::new(StreamShared::new(descriptor, config)),
            connector,
            hook,
            control: Mutex::new(Control::default()),
        }
    }

    /// Start capturing. No-op if already running.
    ///
    /// Resets the attempt budget, so a failed stream retries from scratch.
    /// Analysis tasks are spawned on the runtime this is called from.
    pub async fn start(&self) -> io::Result<()> {
        let mut control = self.control.lock().await;
        // A thread that has reported Failed is about to retire, so it does
        // not count as running
        if self.shared.is_running() && self.shared.state() != CaptureState::Failed {
            return Ok(());
        }

        // A thread that exhausted its budget is already on its way out
        if let Some(done) = control.done.take() {
            let _ = done.await;
        }

        let runtime = Handle::try_current().ok();
        if runtime.is_none() && self.hook.is_some() {
            tracing::warn!(stream = %self.id(), "No tokio runtime, frame analysis disabled");
        }

        let generation = self.shared.activate();
        let (done_tx, done_rx) = oneshot::channel();
        let worker = Worker {
            shared: Arc::clone(&self.shared),
            connector: Arc::clone(&self.connector),
            hook: self.hook.clone(),
            runtime,
            generation,
            _done: done_tx,
        };

        let spawned = thread::Builder::new()
            .name(format!("capture-{}", self.id()))
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                control.thread = Some(handle.thread().clone());
                control.done = Some(done_rx);
                tracing::info!(stream = %self.id(), "Stream started");
                Ok(())
            }
            Err(e) => {
                self.shared.deactivate();
                self.shared.set_error(&e);
                self.shared.set_state(CaptureState::Failed);
                Err(e)
            }
        }
    }

    /// Stop capturing and release the source. Idempotent.
    ///
    /// Waits up to [`CaptureConfig::stop_timeout`] for the capture thread. If
    /// it is stuck in a blocking read, the source is force-closed and the
    /// thread detached; it exits on its own once the read returns.
    pub async fn stop(&self) {
        let mut control = self.control.lock().await;
        let was_running = self.shared.deactivate();

        if let Some(thread) = control.thread.take() {
            thread.unpark();
        }

        if let Some(done) = control.done.take() {
            let timeout = self.shared.config.stop_timeout;
            if tokio::time::timeout(timeout, done).await.is_err() {
                tracing::warn!(
                    stream = %self.id(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Capture thread did not stop in time, force-closing source"
                );
            }
        }

        // The thread clears this when it exits normally
        if let Some(close) = self.shared.take_closer() {
            close();
        }

        self.shared.mark_stopped();
        if was_running {
            tracing::info!(stream = %self.id(), "Stream stopped");
        }
    }

    /// Stream id
    pub fn id(&self) -> &StreamId {
        &self.shared.descriptor.id
    }

    /// Stream descriptor
    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.shared.descriptor
    }

    /// Capture configuration
    pub fn config(&self) -> &CaptureConfig {
        &self.shared.config
    }

    /// Whether a capture thread is running
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Current lifecycle state
    pub fn state(&self) -> CaptureState {
        self.shared.state()
    }

    /// Status snapshot
    pub fn status(&self) -> StreamStatus {
        self.shared.status()
    }

    /// Take the freshest frame, leaving the slot empty
    pub fn take_latest(&self) -> Option<Arc<EncodedFrame>> {
        self.shared.slot.take_latest()
    }

    /// Freshest frame newer than `sequence`, without consuming it
    pub fn latest_since(&self, sequence: Option<u64>) -> Option<Arc<EncodedFrame>> {
        self.shared.slot.latest_since(sequence)
    }

    /// Annotations from the most recent analysis result
    pub fn annotations(&self) -> Vec<Annotation> {
        self.shared.insights.annotations()
    }

    /// The last `count` highlights, oldest first
    pub fn recent_highlights(&self, count: usize) -> Vec<Highlight> {
        self.shared.insights.recent_highlights(count)
    }

    /// Accumulated reward score
    pub fn reward_score(&self) -> u64 {
        self.shared.insights.reward_score()
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        // Let a still-running thread wind down on its own
        if self.shared.deactivate() {
            if let Some(thread) = self.control.get_mut().thread.take() {
                thread.unpark();
            }
        }
    }
}

impl std::fmt::Debug for CaptureLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLoop")
            .field("id", self.id())
            .field("state", &self.state())
            .field("running", &self.is_running())
            .finish()
    }
}
