//! Status caption burned into outgoing frames
//!
//! A 3x5 bitmap font scaled up 2x, drawn over a darkened band at the top of
//! the frame. Purely cosmetic: viewers get the same data in the message
//! envelope.

use chrono::{DateTime, Utc};
use image::{Rgb, RgbImage};

const GLYPH_W: u32 = 3;
const GLYPH_H: u32 = 5;
const SCALE: u32 = 2;
const MARGIN: u32 = 6;
const LINE_GAP: u32 = 4;

const TIME_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const STATUS_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Lines of caption text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    lines: Vec<String>,
}

impl Caption {
    /// Caption from arbitrary lines
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Standard live caption: timestamp, fps and reward score
    pub fn live(at: DateTime<Utc>, fps: u32, reward: u64) -> Self {
        Self::new(vec![
            format!("LIVE {}", at.format("%Y-%m-%d %H:%M:%S")),
            format!("FPS {} | SCORE {}", fps, reward),
        ])
    }

    /// Caption lines
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Draw the caption onto `image`, clipped to its bounds
    pub fn draw(&self, image: &mut RgbImage) {
        if self.lines.is_empty() {
            return;
        }

        let line_height = GLYPH_H * SCALE + LINE_GAP;
        let band = (MARGIN * 2 + line_height * self.lines.len() as u32).min(image.height());
        darken(image, band);

        for (row, line) in self.lines.iter().enumerate() {
            let color = if row == 0 { TIME_COLOR } else { STATUS_COLOR };
            let y = MARGIN + row as u32 * line_height;
            draw_text(image, MARGIN, y, line, color);
        }
    }
}

fn darken(image: &mut RgbImage, rows: u32) {
    let width = image.width();
    for y in 0..rows {
        for x in 0..width {
            let pixel = image.get_pixel_mut(x, y);
            pixel.0 = pixel.0.map(|c| c / 3);
        }
    }
}

fn draw_text(image: &mut RgbImage, x: u32, y: u32, text: &str, color: Rgb<u8>) {
    let advance = (GLYPH_W + 1) * SCALE;
    for (i, ch) in text.chars().enumerate() {
        let gx = x + i as u32 * advance;
        if gx >= image.width() {
            break;
        }
        draw_glyph(image, gx, y, glyph(ch), color);
    }
}

fn draw_glyph(image: &mut RgbImage, x: u32, y: u32, rows: [u8; 5], color: Rgb<u8>) {
    for (row, bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_W {
            if bits & (1 << (GLYPH_W - 1 - col)) == 0 {
                continue;
            }
            for dy in 0..SCALE {
                for dx in 0..SCALE {
                    let px = x + col * SCALE + dx;
                    let py = y + row as u32 * SCALE + dy;
                    if px < image.width() && py < image.height() {
                        image.put_pixel(px, py, color);
                    }
                }
            }
        }
    }
}

/// Row bitmaps, most significant of the low three bits is the left column
fn glyph(ch: char) -> [u8; 5] {
    match ch.to_ascii_uppercase() {
        '0' => [7, 5, 5, 5, 7],
        '1' => [2, 6, 2, 2, 7],
        '2' => [7, 1, 7, 4, 7],
        '3' => [7, 1, 7, 1, 7],
        '4' => [5, 5, 7, 1, 1],
        '5' => [7, 4, 7, 1, 7],
        '6' => [7, 4, 7, 5, 7],
        '7' => [7, 1, 1, 1, 1],
        '8' => [7, 5, 7, 5, 7],
        '9' => [7, 5, 7, 1, 7],
        'A' => [2, 5, 7, 5, 5],
        'B' => [6, 5, 6, 5, 6],
        'C' => [3, 4, 4, 4, 3],
        'D' => [6, 5, 5, 5, 6],
        'E' => [7, 4, 6, 4, 7],
        'F' => [7, 4, 6, 4, 4],
        'G' => [3, 4, 5, 5, 3],
        'H' => [5, 5, 7, 5, 5],
        'I' => [7, 2, 2, 2, 7],
        'J' => [1, 1, 1, 5, 2],
        'K' => [5, 5, 6, 5, 5],
        'L' => [4, 4, 4, 4, 7],
        'M' => [5, 7, 7, 5, 5],
        'N' => [6, 5, 5, 5, 5],
        'O' => [2, 5, 5, 5, 2],
        'P' => [6, 5, 6, 4, 4],
        'Q' => [2, 5, 5, 6, 3],
        'R' => [6, 5, 6, 5, 5],
        'S' => [3, 4, 2, 1, 6],
        'T' => [7, 2, 2, 2, 2],
        'U' => [5, 5, 5, 5, 7],
        'V' => [5, 5, 5, 5, 2],
        'W' => [5, 5, 7, 7, 5],
        'X' => [5, 5, 2, 5, 5],
        'Y' => [5, 5, 2, 2, 2],
        'Z' => [7, 1, 2, 4, 7],
        '-' => [0, 0, 7, 0, 0],
        ':' => [0, 2, 0, 2, 0],
        '.' => [0, 0, 0, 0, 2],
        '|' => [2, 2, 2, 2, 2],
        '/' => [1, 1, 2, 4, 4],
        ' ' => [0, 0, 0, 0, 0],
        _ => [7, 1, 2, 0, 2],
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_live_caption_text() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 14, 5, 9).unwrap();
        let caption = Caption::live(at, 29, 120);

        assert_eq!(caption.lines()[0], "LIVE 2026-03-01 14:05:09");
        assert_eq!(caption.lines()[1], "FPS 29 | SCORE 120");
    }

    #[test]
    fn test_draw_changes_top_band_only() {
        let mut image = RgbImage::from_pixel(200, 100, Rgb([90, 90, 90]));
        Caption::new(vec!["1".into()]).draw(&mut image);

        // Band is darkened, text pixels are lit
        assert_eq!(image.get_pixel(199, 0), &Rgb([30, 30, 30]));
        assert_eq!(image.get_pixel(MARGIN + 2, MARGIN), &TIME_COLOR);
        // Below the band nothing changed
        assert_eq!(image.get_pixel(0, 99), &Rgb([90, 90, 90]));
    }

    #[test]
    fn test_draw_clips_to_small_image() {
        let mut image = RgbImage::from_pixel(8, 4, Rgb([255, 255, 255]));
        Caption::live(Utc::now(), 30, 0).draw(&mut image);
        assert_eq!(image.dimensions(), (8, 4));
    }

    #[test]
    fn test_empty_caption_is_noop() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        Caption::new(Vec::new()).draw(&mut image);
        assert_eq!(image.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }
}
