//! End-to-end conversion from a decoded image to a bead pattern.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::catalog::{Palette, RgbColor};
use crate::cluster::{ClusterParams, cluster_grid};
use crate::error::{Error, Result};
use crate::grid::{Cell, Grid, pixelate};
use crate::matcher::closest_index;
use crate::merge::merge_colors;
use crate::result::{PatternResult, assemble};
use crate::sampler::PixelationMode;

/// Default similarity threshold for the merge pass, in RGB distance units.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 30.0;

/// Conversion strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Dominant color per cell, followed by the global merge pass.
    #[default]
    Dominant,
    /// Mean color per cell, no merging.
    Average,
    /// K-means with few clusters and grouped beads.
    Simple,
    /// K-means with up to 50 clusters.
    Realistic,
}

impl ConversionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionMode::Dominant => "dominant",
            ConversionMode::Average => "average",
            ConversionMode::Simple => "simple",
            ConversionMode::Realistic => "realistic",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}', expected dominant, average, simple or realistic")]
pub struct ParseModeError(String);

impl FromStr for ConversionMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dominant" => Ok(ConversionMode::Dominant),
            "average" => Ok(ConversionMode::Average),
            "simple" => Ok(ConversionMode::Simple),
            "realistic" => Ok(ConversionMode::Realistic),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// Parameters of one conversion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Beads per side.
    pub grid_size: u32,
    pub mode: ConversionMode,
    /// Only used in dominant mode.
    pub merge_threshold: f64,
    /// Target color count for the clustered modes.
    pub color_count: usize,
    /// 0..=100, clustered modes only.
    pub color_complexity: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            grid_size: 50,
            mode: ConversionMode::Dominant,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            color_count: 16,
            color_complexity: 100,
        }
    }
}

impl ConvertOptions {
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(Error::InvalidDimensions("grid size must be at least 1".into()));
        }
        if self.merge_threshold.is_nan() || self.merge_threshold < 0.0 {
            return Err(Error::InvalidThreshold(self.merge_threshold));
        }
        Ok(())
    }
}

/// Match every sampled cell to its nearest palette color.
pub fn match_grid(samples: &Grid<Option<RgbColor>>, palette: &Palette) -> Result<Grid<Cell>> {
    let rgbs: Vec<_> = palette.iter().map(|c| c.rgb).collect();
    if rgbs.is_empty() {
        return Err(Error::EmptyPalette);
    }
    Ok(samples.map(|sample| match sample {
        Some(rgb) => closest_index(*rgb, &rgbs).map_or(Cell::Empty, Cell::Assigned),
        None => Cell::Empty,
    }))
}

/// Convert a decoded image into a bead pattern.
pub fn convert(image: &RgbaImage, palette: &Palette, options: &ConvertOptions) -> Result<PatternResult> {
    options.validate()?;
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::InvalidDimensions(format!("image {w}x{h}")));
    }
    let size = options.grid_size;
    debug!("converting {w}x{h} image to {size}x{size} beads ({})", options.mode);

    let grid = match options.mode {
        ConversionMode::Dominant | ConversionMode::Average => {
            let sampling = if options.mode == ConversionMode::Dominant {
                PixelationMode::Dominant
            } else {
                PixelationMode::Average
            };
            let matched = match_grid(&pixelate(image, size, size, sampling)?, palette)?;
            if options.mode == ConversionMode::Dominant {
                merge_colors(&matched, palette, options.merge_threshold)
            } else {
                matched
            }
        }
        ConversionMode::Simple => cluster_grid(
            image,
            palette,
            size,
            &ClusterParams::simple(options.color_count, options.color_complexity),
        )?,
        ConversionMode::Realistic => cluster_grid(
            image,
            palette,
            size,
            &ClusterParams::realistic(options.color_count, options.color_complexity),
        )?,
    };

    let result = assemble(&grid, palette, options.mode)?;
    info!(
        "pattern ready: {} beads, {} transparent, {} colors",
        result.total_beads,
        result.transparent_pixels,
        result.color_count()
    );
    Ok(result)
}

/// Decode an encoded image (PNG, JPEG, ...) and convert it.
pub fn convert_bytes(input: &[u8], palette: &Palette, options: &ConvertOptions) -> Result<PatternResult> {
    let img = image::load_from_memory(input).map_err(|e| Error::DecodeUnavailable(e.to_string()))?;
    convert(&img.to_rgba8(), palette, options)
}

/// Convert a raw RGBA buffer of `width x height` pixels.
pub fn convert_rgba(
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    palette: &Palette,
    options: &ConvertOptions,
) -> Result<PatternResult> {
    let len = rgba.len();
    let mismatch = || Error::InvalidDimensions(format!("{len} bytes do not form a {width}x{height} RGBA image"));
    if len as u64 != width as u64 * height as u64 * 4 {
        return Err(mismatch());
    }
    let img = RgbaImage::from_raw(width, height, rgba).ok_or_else(mismatch)?;
    convert(&img, palette, options)
}
