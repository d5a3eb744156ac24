//! Capture thread body
//!
//! Owns the source handle for the lifetime of one connection. Every write to
//! shared state is gated on the thread's generation still being the live one,
//! so a thread detached by a timed-out stop cannot clobber its successor.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::insights;
use super::shared::StreamShared;
use super::state::CaptureState;
use crate::analysis::AnalysisHook;
use crate::frame::overlay::Caption;
use crate::frame::{EncodedFrame, FrameProcessor};
use crate::source::{ReadError, SourceConnector, SourceHandle};
use crate::stats::FpsCounter;

pub(crate) struct Worker {
    pub(crate) shared: Arc<StreamShared>,
    pub(crate) connector: Arc<dyn SourceConnector>,
    pub(crate) hook: Option<Arc<dyn AnalysisHook>>,
    pub(crate) runtime: Option<Handle>,
    pub(crate) generation: u64,
    /// Dropped when the thread exits, which wakes a waiting `stop`
    pub(crate) _done: oneshot::Sender<()>,
}

impl Worker {
    pub(crate) fn run(self) {
        let id = self.shared.descriptor.id.clone();
        tracing::debug!(stream = %id, generation = self.generation, "Capture thread started");

        while self.live() {
            self.set_state(CaptureState::Connecting);

            let mut handle = match self.connector.connect(&self.shared.descriptor) {
                Ok(handle) => handle,
                Err(e) => {
                    if !self.live() {
                        break;
                    }
                    let attempts = self.shared.record_attempt();
                    let max = self.shared.config.max_attempts;
                    self.shared.set_error(&e);
                    tracing::warn!(
                        stream = %id,
                        attempt = attempts,
                        max_attempts = max,
                        error = %e,
                        "Connect failed"
                    );

                    if attempts >= max {
                        self.fail();
                        break;
                    }

                    self.set_state(CaptureState::Reconnecting);
                    let delay = if e.is_unavailable() {
                        self.shared.config.unavailable_delay
                    } else {
                        self.shared.config.reconnect_delay
                    };
                    self.pause(delay);
                    continue;
                }
            };

            if !self.live() {
                self.connector.disconnect(handle.as_mut());
                break;
            }

            self.shared.reset_attempts();
            self.shared.set_closer(handle.force_close());
            self.shared.set_connected(true);
            self.set_state(CaptureState::Streaming);
            tracing::info!(stream = %id, kind = %self.shared.descriptor.kind, "Capture streaming");

            let outcome = self.stream(handle.as_mut());

            self.shared.set_closer(None);
            self.connector.disconnect(handle.as_mut());
            drop(handle);

            if !self.live() {
                break;
            }
            self.shared.set_connected(false);
            self.shared.set_fps(0);

            if let Err(e) = outcome {
                self.shared.set_error(&e);
                tracing::warn!(stream = %id, error = %e, "Read failed, reconnecting");
                self.set_state(CaptureState::Reconnecting);
                self.pause(self.shared.config.reconnect_delay);
            }
        }

        tracing::debug!(stream = %id, generation = self.generation, "Capture thread exiting");
    }

    /// Capture cycles until the handle fails or the thread is retired
    fn stream(&self, handle: &mut dyn SourceHandle) -> Result<(), ReadError> {
        let config = &self.shared.config;
        let processor = FrameProcessor::new(config.max_width, config.jpeg_quality, config.overlay);
        let interval = config.frame_interval();
        let mut fps = FpsCounter::new();

        while self.live() {
            let cycle = Instant::now();

            if !handle.is_open() {
                return Err(ReadError::Closed);
            }
            let image = handle.read_frame()?;
            if !self.live() {
                break;
            }

            let captured_at = Utc::now();
            let sequence = self.shared.next_sequence();
            let caption = config.overlay.then(|| {
                Caption::live(captured_at, fps.rate(), self.shared.insights.reward_score())
            });

            match processor.process(image, caption.as_ref(), sequence, captured_at) {
                Ok(frame) => {
                    let frame = Arc::new(frame);
                    self.shared.slot.publish(Arc::clone(&frame));
                    self.maybe_analyze(frame);
                }
                Err(e) => {
                    tracing::warn!(stream = %self.shared.descriptor.id, error = %e, "Dropping frame");
                }
            }

            if let Some(rate) = fps.tick(Instant::now()) {
                self.shared.set_fps(rate);
            }

            if let Some(rest) = interval.checked_sub(cycle.elapsed()) {
                self.pause(rest);
            }
        }

        Ok(())
    }

    fn maybe_analyze(&self, frame: Arc<EncodedFrame>) {
        let every = self.shared.config.analysis_interval;
        if every == 0 || frame.sequence % every != 0 {
            return;
        }
        if let (Some(hook), Some(runtime)) = (&self.hook, &self.runtime) {
            insights::dispatch(&self.shared, hook, frame, runtime);
        }
    }

    fn fail(&self) {
        self.shared.set_connected(false);
        self.shared.set_fps(0);
        self.set_state(CaptureState::Failed);
        if self.shared.retire(self.generation) {
            tracing::error!(
                stream = %self.shared.descriptor.id,
                attempts = self.shared.config.max_attempts,
                "Reconnect budget exhausted, stream failed"
            );
        }
    }

    /// Sleep up to `duration`, waking early when stopped
    fn pause(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while self.live() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }

    fn live(&self) -> bool {
        self.shared.is_live(self.generation)
    }

    fn set_state(&self, state: CaptureState) {
        if self.live() {
            self.shared.set_state(state);
        }
    }
}
