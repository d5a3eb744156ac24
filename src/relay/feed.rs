//! Per-viewer frame feed

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::message::ViewerMessage;
use crate::capture::CaptureLoop;
use crate::source::StreamId;

/// Messages buffered for a slow viewer before frames are dropped
const FEED_CAPACITY: usize = 2;

/// Polls one stream at a fixed cadence and delivers each new frame
///
/// A viewer that falls behind loses frames rather than delaying them. The
/// polling task ends when the feed is dropped.
pub struct ViewerFeed {
    stream_id: StreamId,
    rx: mpsc::Receiver<ViewerMessage>,
    task: JoinHandle<()>,
}

impl ViewerFeed {
    /// Start polling `stream` every `interval`
    pub fn spawn(stream: Arc<CaptureLoop>, interval: Duration, recent_highlights: usize) -> Self {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let stream_id = stream.id().clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_seen = None;

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let Some(frame) = stream.latest_since(last_seen) else {
                    continue;
                };
                last_seen = Some(frame.sequence);

                let message = ViewerMessage::from_frame(&stream, &frame, recent_highlights);
                match tx.try_send(message) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::trace!(stream = %stream.id(), sequence = frame.sequence, "Viewer lagging, frame dropped");
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }

            tracing::debug!(stream = %stream.id(), "Viewer feed ended");
        });

        Self {
            stream_id,
            rx,
            task,
        }
    }

    /// Stream this feed follows
    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Wait for the next message
    pub async fn recv(&mut self) -> Option<ViewerMessage> {
        self.rx.recv().await
    }
}

impl Drop for ViewerFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}
