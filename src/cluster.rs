//! Clustered conversion: extract the image's main colors with k-means, map
//! them onto the catalog, then paint each cell with the nearest of those.

use std::collections::HashSet;

use image::RgbaImage;
use kmeans_colors::get_kmeans;
use log::debug;
use palette::{IntoColor, Lab, Srgb};

use crate::catalog::{Palette, RgbColor};
use crate::error::{Error, Result};
use crate::grid::{Cell, Grid, cell_span};
use crate::matcher::{closest_index, color_distance};
use crate::sampler::{ALPHA_THRESHOLD, PixelationMode, sample_cell};

/// Mapped colors closer than this are grouped in simplified output.
pub const SIMPLIFY_THRESHOLD: f64 = 35.0;

const KMEANS_SEED: u64 = 0;

/// Tuning of one clustered conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterParams {
    pub clusters: usize,
    pub max_iter: usize,
    pub converge: f32,
    /// 0..=100; below 100 centroids are pulled toward gray.
    pub complexity: u8,
    /// Group near-identical bead colors after mapping.
    pub simplify: bool,
}

impl ClusterParams {
    /// Fewer, coarser clusters with similar beads grouped.
    pub fn simple(color_count: usize, complexity: u8) -> Self {
        Self {
            clusters: (color_count.saturating_mul(6) / 10).clamp(3, 30),
            max_iter: 15,
            converge: 1e-2,
            complexity,
            simplify: true,
        }
    }

    /// Up to 50 clusters, every mapped bead kept.
    pub fn realistic(color_count: usize, complexity: u8) -> Self {
        Self {
            clusters: color_count.clamp(3, 50),
            max_iter: 10,
            converge: 1e-4,
            complexity,
            simplify: false,
        }
    }
}

/// A bead the cells can be painted with, and the color it is matched by.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeadChoice {
    pub index: usize,
    pub rgb: RgbColor,
}

/// K-means centroids over the opaque pixels of `image`, in sRGB.
///
/// At most one centroid per distinct opaque color is requested.
pub fn extract_colors(image: &RgbaImage, params: &ClusterParams) -> Vec<RgbColor> {
    let mut distinct = HashSet::new();
    let mut lab_pixels: Vec<Lab> = Vec::new();
    for p in image.pixels().filter(|p| p[3] >= ALPHA_THRESHOLD) {
        distinct.insert([p[0], p[1], p[2]]);
        let srgb = Srgb::<u8>::new(p[0], p[1], p[2]);
        lab_pixels.push(srgb.into_linear().into_color());
    }
    if lab_pixels.is_empty() {
        return Vec::new();
    }

    let k = params.clusters.clamp(1, distinct.len());
    let kmeans = get_kmeans(k, params.max_iter, params.converge, false, &lab_pixels, KMEANS_SEED);
    kmeans
        .centroids
        .iter()
        .map(|&lab| {
            let rgb_f32: Srgb<f32> = Srgb::from_linear(lab.into_color());
            RgbColor::from(rgb_f32.into_format::<u8>())
        })
        .collect()
}

/// Pull `color` toward its channel mean; `complexity` 100 leaves it as is.
pub fn desaturate(color: RgbColor, complexity: u8) -> RgbColor {
    if complexity >= 100 {
        return color;
    }
    let factor = complexity as f64 / 100.0;
    let gray = (color.r as f64 + color.g as f64 + color.b as f64) / 3.0;
    let adjust = |c: u8| (gray + (c as f64 - gray) * factor).round().clamp(0.0, 255.0) as u8;
    RgbColor::new(adjust(color.r), adjust(color.g), adjust(color.b))
}

/// Group choices closer than `threshold` to an earlier group leader.
///
/// Each group keeps its leader's bead and matches by the group's mean color.
pub fn simplify_choices(choices: &[BeadChoice], threshold: f64) -> Vec<BeadChoice> {
    let mut used = vec![false; choices.len()];
    let mut merged = Vec::new();

    for i in 0..choices.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let mut group = vec![choices[i]];
        for j in (i + 1)..choices.len() {
            if !used[j] && color_distance(choices[i].rgb, choices[j].rgb) < threshold {
                used[j] = true;
                group.push(choices[j]);
            }
        }

        let n = group.len() as f64;
        let mean = |f: fn(&RgbColor) -> u8| {
            (group.iter().map(|c| f(&c.rgb) as f64).sum::<f64>() / n).round() as u8
        };
        merged.push(BeadChoice {
            index: choices[i].index,
            rgb: RgbColor::new(mean(|c| c.r), mean(|c| c.g), mean(|c| c.b)),
        });
    }
    merged
}

/// Beads selected for `image` under `params`.
pub fn bead_choices(image: &RgbaImage, palette: &Palette, params: &ClusterParams) -> Result<Vec<BeadChoice>> {
    let rgbs: Vec<RgbColor> = palette.iter().map(|c| c.rgb).collect();
    let choices = extract_colors(image, params)
        .into_iter()
        .map(|c| {
            let index = closest_index(desaturate(c, params.complexity), &rgbs).ok_or(Error::EmptyPalette)?;
            Ok(BeadChoice { index, rgb: rgbs[index] })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(if params.simplify {
        simplify_choices(&choices, SIMPLIFY_THRESHOLD)
    } else {
        choices
    })
}

/// Paint a `grid_size x grid_size` grid with the clustered bead set.
pub fn cluster_grid(
    image: &RgbaImage,
    palette: &Palette,
    grid_size: u32,
    params: &ClusterParams,
) -> Result<Grid<Cell>> {
    let (img_w, img_h) = image.dimensions();
    if grid_size == 0 || img_w == 0 || img_h == 0 {
        return Err(Error::InvalidDimensions(format!(
            "grid {grid_size}, image {img_w}x{img_h}"
        )));
    }

    let choices = bead_choices(image, palette, params)?;
    debug!("clustered into {} bead colors", choices.len());
    let choice_rgbs: Vec<RgbColor> = choices.iter().map(|c| c.rgb).collect();

    let n = grid_size as usize;
    Ok(Grid::from_fn(n, n, |row, col| {
        let xs = cell_span(col as u32, img_w, grid_size);
        let ys = cell_span(row as u32, img_h, grid_size);
        sample_cell(image, xs.start, ys.start, xs.len() as u32, ys.len() as u32, PixelationMode::Average)
            .and_then(|rgb| closest_index(rgb, &choice_rgbs))
            .map_or(Cell::Empty, |i| Cell::Assigned(choices[i].index))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PaletteColor;
    use image::Rgba;

    #[test]
    fn test_cluster_counts() {
        assert_eq!(ClusterParams::simple(16, 100).clusters, 9);
        assert_eq!(ClusterParams::simple(2, 100).clusters, 3);
        assert_eq!(ClusterParams::simple(100, 100).clusters, 30);
        assert_eq!(ClusterParams::simple(usize::MAX, 100).clusters, 30);
        assert_eq!(ClusterParams::realistic(usize::MAX, 100).clusters, 50);
        assert_eq!(ClusterParams::realistic(1, 100).clusters, 3);
        assert_eq!(ClusterParams::realistic(80, 100).clusters, 50);
    }

    #[test]
    fn test_desaturate() {
        let c = RgbColor::new(200, 100, 0);
        assert_eq!(desaturate(c, 100), c);
        assert_eq!(desaturate(c, 0), RgbColor::new(100, 100, 100));
        assert_eq!(desaturate(c, 50), RgbColor::new(150, 100, 50));
    }

    #[test]
    fn test_simplify_groups_similar() {
        let choices = [
            BeadChoice { index: 0, rgb: RgbColor::new(100, 100, 100) },
            BeadChoice { index: 3, rgb: RgbColor::new(110, 110, 110) },
            BeadChoice { index: 5, rgb: RgbColor::new(250, 0, 0) },
        ];
        let out = simplify_choices(&choices, SIMPLIFY_THRESHOLD);
        assert_eq!(
            out,
            vec![
                BeadChoice { index: 0, rgb: RgbColor::new(105, 105, 105) },
                BeadChoice { index: 5, rgb: RgbColor::new(250, 0, 0) },
            ]
        );
    }

    #[test]
    fn test_transparent_image_has_no_colors() {
        let img = RgbaImage::new(4, 4);
        assert!(extract_colors(&img, &ClusterParams::realistic(8, 100)).is_empty());

        let palette = Palette::new(vec![PaletteColor::new("K", RgbColor::new(0, 0, 0))]).unwrap();
        let grid = cluster_grid(&img, &palette, 2, &ClusterParams::simple(8, 100)).unwrap();
        assert!(grid.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_two_tone_image_uses_matching_beads() {
        let img = RgbaImage::from_fn(8, 8, |x, _| {
            if x < 4 { Rgba([250, 250, 250, 255]) } else { Rgba([5, 5, 5, 255]) }
        });
        let palette = Palette::new(vec![
            PaletteColor::new("white", RgbColor::new(255, 255, 255)),
            PaletteColor::new("red", RgbColor::new(255, 0, 0)),
            PaletteColor::new("black", RgbColor::new(0, 0, 0)),
        ])
        .unwrap();
        let grid = cluster_grid(&img, &palette, 2, &ClusterParams::realistic(3, 100)).unwrap();
        assert_eq!(grid.get(0, 0), Some(&Cell::Assigned(0)));
        assert_eq!(grid.get(1, 1), Some(&Cell::Assigned(2)));
    }
}
