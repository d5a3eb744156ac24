//! Single-slot, overwrite-on-publish frame buffer
//!
//! The capture thread publishes every frame it encodes; consumers only ever
//! see the newest one. A publish replaces an unread frame instead of waiting
//! for it to be consumed, so the producer never blocks and a stale frame is
//! never delivered after a newer one exists.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::EncodedFrame;

/// Freshest-frame buffer
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: ArcSwapOption<EncodedFrame>,
    published: AtomicU64,
    overwritten: AtomicU64,
}

impl FrameSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a frame, evicting any unread one. Never blocks.
    pub fn publish(&self, frame: Arc<EncodedFrame>) {
        if self.latest.swap(Some(frame)).is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove and return the buffered frame, if any
    pub fn take_latest(&self) -> Option<Arc<EncodedFrame>> {
        self.latest.swap(None)
    }

    /// Return the buffered frame without consuming it
    pub fn peek(&self) -> Option<Arc<EncodedFrame>> {
        self.latest.load_full()
    }

    /// Return the buffered frame if it is newer than `sequence`
    ///
    /// Lets several viewers follow one stream without stealing frames from
    /// each other.
    pub fn latest_since(&self, sequence: Option<u64>) -> Option<Arc<EncodedFrame>> {
        self.peek()
            .filter(|frame| sequence.map_or(true, |seen| frame.sequence > seen))
    }

    /// Number of buffered frames (0 or 1)
    pub fn depth(&self) -> usize {
        usize::from(self.latest.load().is_some())
    }

    /// Drop the buffered frame
    pub fn clear(&self) {
        self.latest.store(None);
    }

    /// Total frames published
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Frames evicted before anyone read them
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use bytes::Bytes;
    use chrono::Utc;

    use super::*;

    fn frame(sequence: u64) -> Arc<EncodedFrame> {
        Arc::new(EncodedFrame {
            sequence,
            captured_at: Utc::now(),
            width: 2,
            height: 2,
            data: Bytes::from(vec![sequence as u8; 4]),
        })
    }

    #[test]
    fn test_empty_slot() {
        let slot = FrameSlot::new();
        assert!(slot.take_latest().is_none());
        assert_eq!(slot.depth(), 0);
    }

    #[test]
    fn test_freshness() {
        let slot = FrameSlot::new();
        for seq in 1..=5 {
            slot.publish(frame(seq));
        }

        assert_eq!(slot.depth(), 1);
        let latest = slot.take_latest().unwrap();
        assert_eq!(latest.sequence, 5);

        // Slot is now empty
        assert!(slot.take_latest().is_none());
        assert_eq!(slot.depth(), 0);
        assert_eq!(slot.published(), 5);
        assert_eq!(slot.overwritten(), 4);
    }

    #[test]
    fn test_publish_never_blocks() {
        let slot = FrameSlot::new();
        let shared = frame(0);

        let start = Instant::now();
        for _ in 0..100_000 {
            slot.publish(Arc::clone(&shared));
        }

        // No consumer at all; publishing must still complete promptly
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(slot.depth(), 1);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let slot = FrameSlot::new();
        slot.publish(frame(7));

        assert_eq!(slot.peek().unwrap().sequence, 7);
        assert_eq!(slot.peek().unwrap().sequence, 7);
        assert_eq!(slot.take_latest().unwrap().sequence, 7);
    }

    #[test]
    fn test_latest_since() {
        let slot = FrameSlot::new();
        assert!(slot.latest_since(None).is_none());

        slot.publish(frame(3));
        assert_eq!(slot.latest_since(None).unwrap().sequence, 3);
        assert_eq!(slot.latest_since(Some(2)).unwrap().sequence, 3);
        assert!(slot.latest_since(Some(3)).is_none());
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        let slot = Arc::new(FrameSlot::new());
        let producer_slot = Arc::clone(&slot);

        let producer = std::thread::spawn(move || {
            for seq in 1..=1000 {
                producer_slot.publish(frame(seq));
            }
        });

        let mut last_seen = 0;
        while !producer.is_finished() {
            if let Some(frame) = slot.take_latest() {
                // Frames never go backwards
                assert!(frame.sequence > last_seen);
                last_seen = frame.sequence;
            }
        }
        producer.join().unwrap();

        if let Some(frame) = slot.take_latest() {
            assert!(frame.sequence > last_seen);
            last_seen = frame.sequence;
        }
        assert_eq!(last_seen, 1000);
    }

    #[test]
    fn test_clear() {
        let slot = FrameSlot::new();
        slot.publish(frame(1));
        slot.clear();
        assert_eq!(slot.depth(), 0);
    }
}
