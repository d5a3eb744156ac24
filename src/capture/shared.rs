//! State shared between a [`CaptureLoop`](super::CaptureLoop), its capture
//! thread and its analysis tasks

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;

use super::config::CaptureConfig;
use super::insights::Insights;
use super::state::{AtomicState, CaptureState, StreamStatus};
use crate::frame::FrameSlot;
use crate::source::{ForceClose, StreamDescriptor};

/// A rate not refreshed for this long is reported as 0
const FPS_STALE_AFTER: Duration = Duration::from_secs(2);

pub(crate) struct StreamShared {
    pub(crate) descriptor: StreamDescriptor,
    pub(crate) config: CaptureConfig,
    pub(crate) slot: FrameSlot,
    pub(crate) insights: Arc<Insights>,

    /// Generation of the running capture thread, 0 when none runs
    active: AtomicU64,
    generations: AtomicU64,

    state: AtomicState,
    connected: AtomicBool,
    attempts: AtomicU32,
    fps: AtomicU32,
    /// Milliseconds since `epoch` when `fps` was last written
    fps_updated_ms: AtomicU64,
    epoch: Instant,
    next_sequence: AtomicU64,
    last_error: ArcSwapOption<String>,
    closer: Mutex<Option<ForceClose>>,
}

impl StreamShared {
    pub(crate) fn new(descriptor: StreamDescriptor, config: CaptureConfig) -> Self {
        Self {
            descriptor,
            config,
            slot: FrameSlot::new(),
            insights: Arc::new(Insights::default()),
            active: AtomicU64::new(0),
            generations: AtomicU64::new(0),
            state: AtomicState::new(CaptureState::Idle),
            connected: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
            fps: AtomicU32::new(0),
            fps_updated_ms: AtomicU64::new(0),
            epoch: Instant::now(),
            next_sequence: AtomicU64::new(0),
            last_error: ArcSwapOption::empty(),
            closer: Mutex::new(None),
        }
    }

    /// Mark a new capture thread as the running one and return its generation
    pub(crate) fn activate(&self) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::AcqRel) + 1;
        self.attempts.store(0, Ordering::Release);
        self.state.store(CaptureState::Connecting);
        self.active.store(generation, Ordering::Release);
        generation
    }

    /// Clear the running flag. Returns whether a thread was running.
    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(0, Ordering::AcqRel) != 0
    }

    /// Clear the running flag only if `generation` still owns it
    pub(crate) fn retire(&self, generation: u64) -> bool {
        self.active
            .compare_exchange(generation, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire) != 0
    }

    /// Whether `generation` is the running capture thread
    pub(crate) fn is_live(&self, generation: u64) -> bool {
        self.active.load(Ordering::Acquire) == generation
    }

    pub(crate) fn state(&self) -> CaptureState {
        self.state.load()
    }

    pub(crate) fn set_state(&self, state: CaptureState) {
        self.state.store(state);
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub(crate) fn set_fps(&self, fps: u32) {
        self.set_fps_at(fps, Instant::now());
    }

    fn set_fps_at(&self, fps: u32, now: Instant) {
        let since_epoch = now.saturating_duration_since(self.epoch).as_millis() as u64;
        self.fps_updated_ms.store(since_epoch, Ordering::Release);
        self.fps.store(fps, Ordering::Release);
    }

    /// Last computed rate, or 0 if the capture thread has not refreshed it
    /// recently (a source stalled inside a blocking read)
    fn fps_at(&self, now: Instant) -> u32 {
        let fps = self.fps.load(Ordering::Acquire);
        if fps == 0 {
            return 0;
        }
        let updated = self.epoch + Duration::from_millis(self.fps_updated_ms.load(Ordering::Acquire));
        if now.saturating_duration_since(updated) > FPS_STALE_AFTER {
            0
        } else {
            fps
        }
    }

    /// Count a failed connection attempt and return the new total
    pub(crate) fn record_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn reset_attempts(&self) {
        self.attempts.store(0, Ordering::Release);
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::AcqRel)
    }

    pub(crate) fn set_error(&self, error: impl ToString) {
        self.last_error.store(Some(Arc::new(error.to_string())));
    }

    pub(crate) fn set_closer(&self, closer: Option<ForceClose>) {
        *self.closer.lock().unwrap_or_else(PoisonError::into_inner) = closer;
    }

    pub(crate) fn take_closer(&self) -> Option<ForceClose> {
        self.closer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Reset the live counters after the capture thread is gone
    pub(crate) fn mark_stopped(&self) {
        self.connected.store(false, Ordering::Release);
        self.fps.store(0, Ordering::Release);
        self.state.store(CaptureState::Stopped);
        self.slot.clear();
    }

    pub(crate) fn status(&self) -> StreamStatus {
        let descriptor = &self.descriptor;
        StreamStatus {
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            kind: descriptor.kind,
            connection: descriptor.connection.clone(),
            state: self.state(),
            running: self.is_running(),
            connected: self.connected.load(Ordering::Acquire),
            fps: self.fps_at(Instant::now()),
            queue_depth: self.slot.depth(),
            attempt_count: self.attempts.load(Ordering::Acquire),
            max_attempts: self.config.max_attempts,
            frames_published: self.slot.published(),
            annotation_count: self.insights.annotation_count(),
            highlight_count: self.insights.highlight_count(),
            reward_score: self.insights.reward_score(),
            last_error: self.last_error.load_full().map(|e| e.as_ref().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> StreamShared {
        StreamShared::new(
            StreamDescriptor::fallback("t", "test-pattern"),
            CaptureConfig::default(),
        )
    }

    #[test]
    fn test_generations() {
        let shared = shared();
        assert!(!shared.is_running());

        let first = shared.activate();
        assert!(shared.is_live(first));
        assert!(shared.deactivate());
        assert!(!shared.deactivate());

        let second = shared.activate();
        assert_ne!(first, second);
        // A stale thread cannot clear the flag of a newer one
        assert!(!shared.retire(first));
        assert!(shared.is_running());
        assert!(shared.retire(second));
        assert!(!shared.is_running());
    }

    #[test]
    fn test_activate_resets_attempts() {
        let shared = shared();
        shared.record_attempt();
        shared.record_attempt();
        assert_eq!(shared.status().attempt_count, 2);

        shared.activate();
        let status = shared.status();
        assert_eq!(status.attempt_count, 0);
        assert_eq!(status.state, CaptureState::Connecting);
        assert!(status.running);
    }

    #[test]
    fn test_status_snapshot() {
        let shared = shared();
        shared.set_error("boom");

        let status = shared.status();
        assert_eq!(status.id.as_str(), "t");
        assert_eq!(status.state, CaptureState::Idle);
        assert_eq!(status.queue_depth, 0);
        assert_eq!(status.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_stale_fps_reads_as_zero() {
        let shared = shared();
        let now = Instant::now();
        shared.set_fps_at(30, now);

        assert_eq!(shared.fps_at(now + Duration::from_millis(900)), 30);
        assert_eq!(shared.fps_at(now + Duration::from_millis(1900)), 30);
        assert_eq!(shared.fps_at(now + Duration::from_millis(2400)), 0);

        // A fresh window brings the rate back
        shared.set_fps_at(12, now + Duration::from_secs(3));
        assert_eq!(shared.fps_at(now + Duration::from_millis(3500)), 12);
    }
}
