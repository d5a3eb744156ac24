//! Scripted sources and hooks shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use camstream::analysis::AnalysisError;
use camstream::source::ForceClose;
use camstream::{
    AnalysisHook, Annotation, CaptureConfig, CaptureState, ConnectError, EncodedFrame, ReadError,
    SourceConnector, SourceHandle, StreamDescriptor, StreamStatus,
};
use image::{Rgb, RgbImage};

/// How one `connect` call should go
#[derive(Debug, Clone)]
pub enum Step {
    /// Open a handle that yields `frames` frames, then fails reads (`None` = forever)
    Connect { frames: Option<usize> },
    /// Fail with a transient error
    Fail,
    /// Fail as categorically unavailable
    Unavailable,
    /// Open a handle whose reads block until force-closed
    Hang,
    /// Yield `frames` frames, then block like `Hang`
    StallAfter(usize),
}

/// Connector that follows a script, then repeats a fallback step
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    connects: AtomicUsize,
    disconnects: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new(script: impl IntoIterator<Item = Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            connects: AtomicUsize::new(0),
            disconnects: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn always(step: Step) -> Arc<Self> {
        Self::new([], step)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl SourceConnector for ScriptedConnector {
    fn connect(&self, descriptor: &StreamDescriptor) -> Result<Box<dyn SourceHandle>, ConnectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Connect { frames } => Ok(Box::new(MockHandle::new(frames, false))),
            Step::Hang => Ok(Box::new(MockHandle::new(None, true))),
            Step::StallAfter(frames) => {
                let mut handle = MockHandle::new(None, true);
                handle.before_hang = frames;
                Ok(Box::new(handle))
            }
            Step::Fail => Err(ConnectError::Failed(format!("{} refused", descriptor.id))),
            Step::Unavailable => Err(ConnectError::Unavailable("no such device".into())),
        }
    }

    fn disconnect(&self, handle: &mut dyn SourceHandle) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        handle.close();
    }
}

/// In-memory source producing small solid frames
pub struct MockHandle {
    remaining: Option<usize>,
    hang: bool,
    before_hang: usize,
    open: Arc<AtomicBool>,
}

impl MockHandle {
    fn new(frames: Option<usize>, hang: bool) -> Self {
        Self {
            remaining: frames,
            hang,
            before_hang: 0,
            open: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl SourceHandle for MockHandle {
    fn read_frame(&mut self) -> Result<RgbImage, ReadError> {
        if self.hang && self.before_hang > 0 {
            self.before_hang -= 1;
        } else if self.hang {
            // Blocks until force_close flips the flag
            while self.open.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(5));
            }
            return Err(ReadError::Closed);
        }
        if !self.open.load(Ordering::SeqCst) {
            return Err(ReadError::Closed);
        }
        match self.remaining.as_mut() {
            Some(0) => return Err(ReadError::Timeout),
            Some(n) => *n -= 1,
            None => {}
        }
        std::thread::sleep(Duration::from_millis(2));
        Ok(RgbImage::from_pixel(16, 16, Rgb([40, 120, 200])))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn force_close(&self) -> Option<ForceClose> {
        let open = Arc::clone(&self.open);
        Some(Arc::new(move || open.store(false, Ordering::SeqCst)))
    }
}

/// Hook returning a fixed result
pub struct FixedHook {
    result: Result<Vec<Annotation>, ()>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixedHook {
    pub fn annotations(annotations: Vec<Annotation>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(annotations),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: Err(()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(annotations: Vec<Annotation>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(annotations),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisHook for FixedHook {
    async fn analyze(&self, _frame: &EncodedFrame) -> Result<Vec<Annotation>, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result
            .clone()
            .map_err(|_| AnalysisError::Status(503))
    }
}

/// Capture options with millisecond timings
pub fn fast_config() -> CaptureConfig {
    CaptureConfig::default()
        .max_width(16)
        .target_fps(200)
        .reconnect_delay(Duration::from_millis(10))
        .unavailable_delay(Duration::from_millis(20))
        .stop_timeout(Duration::from_millis(500))
        .analysis_timeout(Duration::from_millis(500))
}

/// Poll `status` until `done` holds or two seconds pass
pub async fn wait_for<F, P>(status: F, done: P) -> StreamStatus
where
    F: FnMut() -> StreamStatus,
    P: Fn(&StreamStatus) -> bool,
{
    wait_for_within(Duration::from_secs(2), status, done).await
}

/// Poll `status` until `done` holds or `limit` passes
pub async fn wait_for_within<F, P>(limit: Duration, mut status: F, done: P) -> StreamStatus
where
    F: FnMut() -> StreamStatus,
    P: Fn(&StreamStatus) -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let current = status();
        if done(&current) || tokio::time::Instant::now() >= deadline {
            return current;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn in_state(state: CaptureState) -> impl Fn(&StreamStatus) -> bool {
    move |status: &StreamStatus| status.state == state
}
