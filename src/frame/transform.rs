//! Resize, caption and encode raw frames

use std::io::Cursor;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;

use super::overlay::Caption;
use super::{EncodeError, EncodedFrame};

/// Default maximum output width
pub const DEFAULT_MAX_WIDTH: u32 = 1280;

/// Default JPEG quality
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Turns raw RGB frames into [`EncodedFrame`]s
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    max_width: u32,
    quality: u8,
    overlay: bool,
}

impl Default for FrameProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH, DEFAULT_JPEG_QUALITY, true)
    }
}

impl FrameProcessor {
    /// Create a processor. `max_width` of 0 disables downscaling.
    pub fn new(max_width: u32, quality: u8, overlay: bool) -> Self {
        Self {
            max_width,
            quality: quality.clamp(1, 100),
            overlay,
        }
    }

    /// Downscale, caption and encode one frame
    pub fn process(
        &self,
        image: RgbImage,
        caption: Option<&Caption>,
        sequence: u64,
        captured_at: DateTime<Utc>,
    ) -> Result<EncodedFrame, EncodeError> {
        let mut image = downscale(image, self.max_width);

        if self.overlay {
            if let Some(caption) = caption {
                caption.draw(&mut image);
            }
        }

        let data = encode_jpeg(&image, self.quality)?;

        Ok(EncodedFrame {
            sequence,
            captured_at,
            width: image.width(),
            height: image.height(),
            data,
        })
    }
}

/// Shrink `image` to `max_width`, preserving aspect ratio
pub fn downscale(image: RgbImage, max_width: u32) -> RgbImage {
    if max_width == 0 || image.width() <= max_width {
        return image;
    }

    let height = (u64::from(image.height()) * u64::from(max_width) / u64::from(image.width()))
        .max(1) as u32;
    imageops::resize(&image, max_width, height, FilterType::Triangle)
}

/// Encode an RGB image as JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Bytes, EncodeError> {
    let mut buf = Cursor::new(Vec::with_capacity(image.as_raw().len() / 8));
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
    Ok(Bytes::from(buf.into_inner()))
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn test_downscale_preserves_aspect() {
        let image = RgbImage::new(1920, 1080);
        let scaled = downscale(image, 1280);
        assert_eq!(scaled.dimensions(), (1280, 720));
    }

    #[test]
    fn test_downscale_small_image_untouched() {
        let image = RgbImage::new(640, 480);
        let scaled = downscale(image, 1280);
        assert_eq!(scaled.dimensions(), (640, 480));
    }

    #[test]
    fn test_downscale_disabled() {
        let image = RgbImage::new(4000, 10);
        assert_eq!(downscale(image, 0).dimensions(), (4000, 10));
    }

    #[test]
    fn test_encode_produces_jpeg() {
        let image = RgbImage::from_pixel(32, 16, Rgb([200, 10, 10]));
        let data = encode_jpeg(&image, 85).unwrap();

        assert_eq!(&data[..2], &[0xFF, 0xD8]);
        assert_eq!(&data[data.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_process_sets_metadata() {
        let processor = FrameProcessor::new(64, 90, true);
        let image = RgbImage::from_pixel(128, 64, Rgb([0, 0, 255]));
        let caption = Caption::live(Utc::now(), 30, 0);
        let at = Utc::now();

        let frame = processor.process(image, Some(&caption), 42, at).unwrap();

        assert_eq!(frame.sequence, 42);
        assert_eq!(frame.captured_at, at);
        assert_eq!((frame.width, frame.height), (64, 32));
        assert!(!frame.data.is_empty());
    }

    #[test]
    fn test_quality_clamped() {
        let processor = FrameProcessor::new(0, 0, false);
        let image = RgbImage::new(8, 8);
        assert!(processor.process(image, None, 0, Utc::now()).is_ok());
    }
}
