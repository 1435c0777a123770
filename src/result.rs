//! Final pattern: key grid, used colors and bead counts.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::catalog::{Palette, PaletteColor};
use crate::error::{Error, Result};
use crate::grid::{Cell, Grid};
use crate::pipeline::ConversionMode;

/// A finished bead pattern.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternResult {
    pub grid_size: usize,
    pub mode: ConversionMode,
    /// Palette key per cell, `None` for transparent cells.
    pub pixels: Vec<Vec<Option<String>>>,
    /// Colors actually used, in row-major first-seen order.
    pub color_palette: Vec<PaletteColor>,
    pub color_usage: BTreeMap<String, usize>,
    pub total_beads: usize,
    pub transparent_pixels: usize,
}

impl PatternResult {
    /// Number of distinct colors in the pattern.
    pub fn color_count(&self) -> usize {
        self.color_palette.len()
    }
}

/// Build the final pattern from a matched (and possibly merged) grid.
pub fn assemble(grid: &Grid<Cell>, palette: &Palette, mode: ConversionMode) -> Result<PatternResult> {
    let mut pixels = Vec::with_capacity(grid.rows());
    let mut color_palette = Vec::new();
    let mut seen = HashSet::new();
    let mut color_usage = BTreeMap::new();
    let mut transparent_pixels = 0;

    for r in 0..grid.rows() {
        let mut row = Vec::with_capacity(grid.cols());
        for cell in grid.row(r) {
            match *cell {
                Cell::Empty => {
                    transparent_pixels += 1;
                    row.push(None);
                }
                Cell::Assigned(idx) => {
                    let color = palette.get(idx).ok_or(Error::UnknownPaletteIndex(idx))?;
                    if seen.insert(idx) {
                        color_palette.push(color.clone());
                    }
                    *color_usage.entry(color.key.clone()).or_insert(0) += 1;
                    row.push(Some(color.key.clone()));
                }
            }
        }
        pixels.push(row);
    }

    Ok(PatternResult {
        grid_size: grid.rows(),
        mode,
        pixels,
        color_palette,
        color_usage,
        total_beads: grid.len() - transparent_pixels,
        transparent_pixels,
    })
}

/// Plain-text chart: the key grid followed by a materials list.
pub fn bead_chart(result: &PatternResult) -> String {
    let mut chart = String::new();
    for row in &result.pixels {
        for key in row {
            chart.push_str(&format!("{:<4}", key.as_deref().unwrap_or(" ")));
        }
        chart.push('\n');
    }

    chart.push_str("\n\n=== Materials ===\n");
    chart.push_str("Color ID | Name | Count\n");
    chart.push_str(&"-".repeat(50));
    chart.push('\n');
    for color in &result.color_palette {
        let count = result.color_usage.get(&color.key).copied().unwrap_or(0);
        chart.push_str(&format!("{} | {} | {}\n", color.key, color.name, count));
    }
    chart
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RgbColor;

    fn palette() -> Palette {
        Palette::new(vec![
            PaletteColor::new("A1", RgbColor::new(255, 255, 255)),
            PaletteColor::new("B2", RgbColor::new(0, 0, 0)),
            PaletteColor::new("C3", RgbColor::new(255, 0, 0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_assemble_counts() {
        let grid = Grid::new(
            2,
            2,
            vec![Cell::Assigned(1), Cell::Empty, Cell::Assigned(0), Cell::Assigned(1)],
        )
        .unwrap();
        let result = assemble(&grid, &palette(), ConversionMode::Dominant).unwrap();

        assert_eq!(result.grid_size, 2);
        assert_eq!(result.transparent_pixels, 1);
        assert_eq!(result.total_beads, 3);
        assert_eq!(result.pixels[0], vec![Some("B2".to_string()), None]);
        let keys: Vec<_> = result.color_palette.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, ["B2", "A1"]);
        assert_eq!(result.color_usage.get("B2"), Some(&2));
        assert_eq!(result.color_usage.get("A1"), Some(&1));
        assert!(!result.color_usage.contains_key("C3"));
    }

    #[test]
    fn test_assemble_all_transparent() {
        let grid = Grid::new(2, 2, vec![Cell::Empty; 4]).unwrap();
        let result = assemble(&grid, &palette(), ConversionMode::Average).unwrap();
        assert_eq!(result.transparent_pixels, 4);
        assert_eq!(result.total_beads, 0);
        assert!(result.color_palette.is_empty());
        assert!(result.color_usage.is_empty());
    }

    #[test]
    fn test_assemble_unknown_index() {
        let grid = Grid::new(1, 1, vec![Cell::Assigned(9)]).unwrap();
        assert!(matches!(
            assemble(&grid, &palette(), ConversionMode::Dominant),
            Err(Error::UnknownPaletteIndex(9))
        ));
    }

    #[test]
    fn test_bead_chart() {
        let grid = Grid::new(1, 2, vec![Cell::Assigned(2), Cell::Empty]).unwrap();
        let result = assemble(&grid, &palette(), ConversionMode::Dominant).unwrap();
        let chart = bead_chart(&result);
        assert!(chart.starts_with("C3      \n"));
        assert!(chart.contains("=== Materials ===\n"));
        assert!(chart.ends_with("C3 | C3 | 1\n"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let grid = Grid::new(1, 1, vec![Cell::Assigned(0)]).unwrap();
        let result = assemble(&grid, &palette(), ConversionMode::Dominant).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalBeads"], 1);
        assert_eq!(json["mode"], "dominant");
        assert_eq!(json["pixels"][0][0], "A1");
    }
}
