//! Generated test-pattern source
//!
//! Produces a moving colour-bar pattern paced at the requested frame rate.
//! Useful when no camera is attached and in tests.

use std::thread;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};

use super::error::ReadError;
use super::SourceHandle;

const BARS: [[u8; 3]; 7] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
];

/// Test-pattern source
#[derive(Debug)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_interval: Duration,
    next_frame_at: Instant,
    frame_index: u64,
    open: bool,
}

impl SyntheticSource {
    /// Create a pattern of the given size paced at `fps`
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            frame_interval: Duration::from_secs(1) / fps.max(1),
            next_frame_at: Instant::now(),
            frame_index: 0,
            open: true,
        }
    }

    /// Number of frames produced so far
    pub fn frames(&self) -> u64 {
        self.frame_index
    }

    fn render(&self) -> RgbImage {
        let bar_width = (self.width / BARS.len() as u32).max(1);
        let sweep = (self.frame_index % u64::from(self.width)) as u32;

        RgbImage::from_fn(self.width, self.height, |x, y| {
            // Bottom eighth carries a white marker sweeping left to right
            if y >= self.height - self.height / 8 {
                return if x.abs_diff(sweep) < 4 {
                    Rgb([255, 255, 255])
                } else {
                    Rgb([16, 16, 16])
                };
            }
            let bar = ((x / bar_width) as usize).min(BARS.len() - 1);
            Rgb(BARS[bar])
        })
    }
}

impl SourceHandle for SyntheticSource {
    fn read_frame(&mut self) -> Result<RgbImage, ReadError> {
        if !self.open {
            return Err(ReadError::Closed);
        }

        let now = Instant::now();
        if self.next_frame_at > now {
            thread::sleep(self.next_frame_at - now);
        }
        self.next_frame_at = Instant::now() + self.frame_interval;

        let frame = self.render();
        self.frame_index += 1;
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_dimensions() {
        let mut source = SyntheticSource::new(64, 48, 1000);
        let frame = source.read_frame().unwrap();

        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(source.frames(), 1);
    }

    #[test]
    fn test_pattern_has_bars() {
        let mut source = SyntheticSource::new(70, 40, 1000);
        let frame = source.read_frame().unwrap();

        assert_eq!(frame.get_pixel(0, 0), &Rgb(BARS[0]));
        assert_eq!(frame.get_pixel(69, 0), &Rgb(BARS[6]));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut source = SyntheticSource::new(8, 8, 30);
        source.close();
        source.close();

        assert!(!source.is_open());
        assert!(matches!(source.read_frame(), Err(ReadError::Closed)));
    }
}
