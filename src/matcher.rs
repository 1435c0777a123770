//! Nearest palette color lookup.

use crate::catalog::{PaletteColor, RgbColor};
use crate::error::{Error, Result};

/// Euclidean distance in RGB space (0.0 ..= ~441.7).
pub fn color_distance(a: RgbColor, b: RgbColor) -> f64 {
    let dr = a.r as f64 - b.r as f64;
    let dg = a.g as f64 - b.g as f64;
    let db = a.b as f64 - b.b as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Position of the palette entry nearest to `target`.
///
/// Linear scan; on equal distance the earlier entry wins, and an exact
/// match stops the scan.
pub fn closest_index<'a, I>(target: RgbColor, colors: I) -> Option<usize>
where
    I: IntoIterator<Item = &'a RgbColor>,
{
    let mut best = None;
    let mut best_dist = f64::INFINITY;
    for (idx, rgb) in colors.into_iter().enumerate() {
        let dist = color_distance(target, *rgb);
        if dist < best_dist {
            best_dist = dist;
            best = Some(idx);
        }
        if dist == 0.0 {
            break;
        }
    }
    best
}

/// Nearest palette color to `target`.
pub fn find_closest(target: RgbColor, palette: &[PaletteColor]) -> Result<&PaletteColor> {
    closest_index(target, palette.iter().map(|p| &p.rgb))
        .map(|idx| &palette[idx])
        .ok_or(Error::EmptyPalette)
}
