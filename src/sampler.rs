//! Representative color of one rectangular image region.

use std::collections::HashMap;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::catalog::RgbColor;

/// Pixels with alpha below this are treated as transparent and ignored.
pub const ALPHA_THRESHOLD: u8 = 128;

/// How a region is reduced to a single color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelationMode {
    /// Most frequent exact color; keeps hard edges (cartoon look).
    Dominant,
    /// Per-channel mean; smoother transitions (realistic look).
    Average,
}

#[inline(always)]
fn pack(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Compute the representative color of `[start_x, start_x + width) x
/// [start_y, start_y + height)`.
///
/// The region is clipped to the image. Returns `None` when it holds no
/// opaque pixel.
pub fn sample_cell(
    image: &RgbaImage,
    start_x: u32,
    start_y: u32,
    width: u32,
    height: u32,
    mode: PixelationMode,
) -> Option<RgbColor> {
    let (img_w, img_h) = image.dimensions();
    let end_x = start_x.saturating_add(width).min(img_w);
    let end_y = start_y.saturating_add(height).min(img_h);
    let raw = image.as_raw();

    let mut count = 0u64;
    let (mut r_sum, mut g_sum, mut b_sum) = (0u64, 0u64, 0u64);

    let mut freq: HashMap<u32, u32> = HashMap::new();
    let mut dominant = None;
    let mut max_count = 0u32;

    for y in start_y..end_y {
        for x in start_x..end_x {
            let idx = ((y as usize) * (img_w as usize) + x as usize) * 4;
            if raw[idx + 3] < ALPHA_THRESHOLD {
                continue;
            }
            let (r, g, b) = (raw[idx], raw[idx + 1], raw[idx + 2]);
            count += 1;

            match mode {
                PixelationMode::Average => {
                    r_sum += r as u64;
                    g_sum += g as u64;
                    b_sum += b as u64;
                }
                PixelationMode::Dominant => {
                    let seen = freq.entry(pack(r, g, b)).or_insert(0);
                    *seen += 1;
                    // Strictly greater: the first color to reach a count keeps it.
                    if *seen > max_count {
                        max_count = *seen;
                        dominant = Some(RgbColor::new(r, g, b));
                    }
                }
            }
        }
    }

    if count == 0 {
        return None;
    }

    match mode {
        PixelationMode::Average => {
            // Round half up, per channel.
            let mean = |sum: u64| ((2 * sum + count) / (2 * count)) as u8;
            Some(RgbColor::new(mean(r_sum), mean(g_sum), mean(b_sum)))
        }
        PixelationMode::Dominant => dominant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    fn image_from(w: u32, h: u32, pixels: &[Rgba<u8>]) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| pixels[(y * w + x) as usize])
    }

    #[test]
    fn test_dominant_picks_most_frequent() {
        let img = image_from(2, 2, &[RED, RED, RED, BLUE]);
        let c = sample_cell(&img, 0, 0, 2, 2, PixelationMode::Dominant);
        assert_eq!(c, Some(RgbColor::new(255, 0, 0)));
    }

    #[test]
    fn test_dominant_tie_keeps_first_seen() {
        let img = image_from(2, 2, &[BLUE, RED, RED, BLUE]);
        let c = sample_cell(&img, 0, 0, 2, 2, PixelationMode::Dominant);
        assert_eq!(c, Some(RgbColor::new(0, 0, 255)));
    }

    #[test]
    fn test_dominant_later_color_must_exceed() {
        // blue reaches 1 first, red reaches 2 first, blue ties at 2 later
        let img = image_from(5, 1, &[BLUE, RED, RED, BLUE, BLUE]);
        let c = sample_cell(&img, 0, 0, 4, 1, PixelationMode::Dominant);
        assert_eq!(c, Some(RgbColor::new(255, 0, 0)));
        let c = sample_cell(&img, 0, 0, 5, 1, PixelationMode::Dominant);
        assert_eq!(c, Some(RgbColor::new(0, 0, 255)));
    }

    #[test]
    fn test_average_rounds_per_channel() {
        let img = image_from(
            2,
            1,
            &[Rgba([10, 0, 255, 255]), Rgba([11, 1, 0, 255])],
        );
        let c = sample_cell(&img, 0, 0, 2, 1, PixelationMode::Average);
        // 10.5 -> 11, 0.5 -> 1, 127.5 -> 128
        assert_eq!(c, Some(RgbColor::new(11, 1, 128)));
    }

    #[test]
    fn test_transparent_pixels_are_skipped() {
        let img = image_from(
            3,
            1,
            &[Rgba([0, 0, 0, 127]), Rgba([0, 0, 0, 127]), Rgba([90, 90, 90, 128])],
        );
        assert_eq!(
            sample_cell(&img, 0, 0, 3, 1, PixelationMode::Dominant),
            Some(RgbColor::new(90, 90, 90))
        );
        assert_eq!(
            sample_cell(&img, 0, 0, 3, 1, PixelationMode::Average),
            Some(RgbColor::new(90, 90, 90))
        );
        assert_eq!(sample_cell(&img, 0, 0, 2, 1, PixelationMode::Average), None);
    }

    #[test]
    fn test_region_clipped_to_image() {
        let img = image_from(2, 2, &[RED, RED, RED, BLUE]);
        let c = sample_cell(&img, 1, 1, 10, 10, PixelationMode::Dominant);
        assert_eq!(c, Some(RgbColor::new(0, 0, 255)));
        assert_eq!(sample_cell(&img, 5, 5, 1, 1, PixelationMode::Dominant), None);
    }
}
