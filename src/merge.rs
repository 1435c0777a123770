//! Frequency-driven global color merging.
//!
//! After palette matching, an image often ends up with many near-identical
//! bead colors that each cover only a handful of cells. This pass folds the
//! rarer of two similar colors into the more frequent one:
//!
//! 1. Count every assigned color over the whole grid (row-major scan).
//! 2. Order colors by descending count. Equal counts keep first-seen order.
//! 3. Walking that list, each color not yet replaced absorbs every later,
//!    not yet replaced color whose RGB distance is below `threshold`.
//!
//! A replaced color never absorbs others and is never revisited, so the pass
//! is single and non-transitive. Empty cells are left untouched.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::catalog::Palette;
use crate::grid::{Cell, Grid};
use crate::matcher::color_distance;

/// What a merge pass did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeReport {
    /// Distinct colors before merging.
    pub initial_colors: usize,
    /// `(from_key, into_key, distance)` in the order merges happened.
    pub merged: Vec<(String, String, f64)>,
}

/// Merge similar colors and return the rewritten grid.
pub fn merge_colors(grid: &Grid<Cell>, palette: &Palette, threshold: f64) -> Grid<Cell> {
    merge_colors_with_report(grid, palette, threshold).0
}

/// Same as [`merge_colors`], also reporting which colors were folded.
pub fn merge_colors_with_report(
    grid: &Grid<Cell>,
    palette: &Palette,
    threshold: f64,
) -> (Grid<Cell>, MergeReport) {
    // Counts in first-seen order.
    let mut counts: Vec<(usize, usize)> = Vec::new();
    let mut slot: HashMap<usize, usize> = HashMap::new();
    for idx in grid.iter().filter_map(|c| c.index()) {
        match slot.get(&idx) {
            Some(&s) => counts[s].1 += 1,
            None => {
                slot.insert(idx, counts.len());
                counts.push((idx, 1));
            }
        }
    }

    let mut report = MergeReport {
        initial_colors: counts.len(),
        ..MergeReport::default()
    };
    if counts.is_empty() {
        debug!("no assigned cells, skipping color merge");
        return (grid.clone(), report);
    }

    // Stable sort: ties stay in scan order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    let by_frequency: Vec<usize> = counts.iter().map(|&(idx, _)| idx).collect();

    let mut replaced = vec![false; by_frequency.len()];
    let mut remap: HashMap<usize, usize> = HashMap::new();

    for i in 0..by_frequency.len() {
        if replaced[i] {
            continue;
        }
        let Some(current) = palette.get(by_frequency[i]) else {
            warn!("palette position {} not found, skipping", by_frequency[i]);
            continue;
        };
        for j in (i + 1)..by_frequency.len() {
            if replaced[j] {
                continue;
            }
            let Some(lower) = palette.get(by_frequency[j]) else {
                warn!("palette position {} not found, skipping", by_frequency[j]);
                continue;
            };
            let dist = color_distance(current.rgb, lower.rgb);
            if dist < threshold {
                debug!("merging color {} into {} (distance {dist:.2})", lower.key, current.key);
                replaced[j] = true;
                remap.insert(by_frequency[j], by_frequency[i]);
                report.merged.push((lower.key.clone(), current.key.clone(), dist));
            }
        }
    }

    if report.merged.is_empty() {
        info!("no colors were similar enough to merge ({} colors)", report.initial_colors);
    } else {
        info!(
            "merged {} less frequent colors, {} -> {} colors",
            report.merged.len(),
            report.initial_colors,
            report.initial_colors - report.merged.len()
        );
    }

    // Merge targets are never replaced themselves, so one lookup suffices.
    let merged = grid.map(|cell| match *cell {
        Cell::Assigned(idx) => Cell::Assigned(remap.get(&idx).copied().unwrap_or(idx)),
        Cell::Empty => Cell::Empty,
    });
    (merged, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PaletteColor, RgbColor};
    use std::collections::HashSet;

    fn palette(entries: &[(&str, (u8, u8, u8))]) -> Palette {
        Palette::new(
            entries
                .iter()
                .map(|(k, (r, g, b))| PaletteColor::new(*k, RgbColor::new(*r, *g, *b)))
                .collect(),
        )
        .unwrap()
    }

    fn grid_of(cells: Vec<Cell>) -> Grid<Cell> {
        let n = cells.len();
        Grid::new(1, n, cells).unwrap()
    }

    fn count(grid: &Grid<Cell>, idx: usize) -> usize {
        grid.iter().filter(|c| **c == Cell::Assigned(idx)).count()
    }

    #[test]
    fn test_less_frequent_similar_color_is_absorbed() {
        // A: 10 cells, B: 3 cells, distance 5 (3-4-0 triangle)
        let p = palette(&[("A", (100, 100, 100)), ("B", (103, 104, 100))]);
        let mut cells = vec![Cell::Assigned(0); 10];
        cells.extend([Cell::Assigned(1); 3]);
        let (merged, report) = merge_colors_with_report(&grid_of(cells), &p, 10.0);
        assert_eq!(count(&merged, 0), 13);
        assert_eq!(count(&merged, 1), 0);
        assert_eq!(report.initial_colors, 2);
        assert_eq!(report.merged, vec![("B".to_string(), "A".to_string(), 5.0)]);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let p = palette(&[("A", (100, 100, 100)), ("B", (103, 104, 100))]);
        let grid = grid_of(vec![Cell::Assigned(0), Cell::Assigned(0), Cell::Assigned(1)]);
        let merged = merge_colors(&grid, &p, 5.0);
        assert_eq!(merged, grid);
    }

    #[test]
    fn test_frequency_decides_direction() {
        // B is later in the palette but more frequent, so A folds into B.
        let p = palette(&[("A", (0, 0, 0)), ("B", (5, 5, 5))]);
        let grid = grid_of(vec![
            Cell::Assigned(0),
            Cell::Assigned(1),
            Cell::Assigned(1),
        ]);
        let merged = merge_colors(&grid, &p, 30.0);
        assert_eq!(count(&merged, 1), 3);
    }

    #[test]
    fn test_equal_counts_keep_scan_order() {
        let p = palette(&[("A", (0, 0, 0)), ("B", (5, 5, 5))]);
        let grid = grid_of(vec![Cell::Assigned(1), Cell::Assigned(0)]);
        let merged = merge_colors(&grid, &p, 30.0);
        assert_eq!(count(&merged, 1), 2);
    }

    #[test]
    fn test_no_transitive_merging() {
        // A absorbs B (dist 20) but not C (dist 40); B is gone, so C survives
        // even though it is within 20 of B.
        let p = palette(&[("A", (0, 0, 0)), ("B", (20, 0, 0)), ("C", (40, 0, 0))]);
        let mut cells = vec![Cell::Assigned(0); 5];
        cells.extend([Cell::Assigned(1); 3]);
        cells.extend([Cell::Assigned(2); 1]);
        let merged = merge_colors(&grid_of(cells), &p, 25.0);
        assert_eq!(count(&merged, 0), 8);
        assert_eq!(count(&merged, 2), 1);
    }

    #[test]
    fn test_empty_cells_untouched() {
        let p = palette(&[("A", (0, 0, 0)), ("B", (1, 1, 1))]);
        let grid = grid_of(vec![Cell::Empty, Cell::Assigned(0), Cell::Empty, Cell::Assigned(1)]);
        let merged = merge_colors(&grid, &p, 10.0);
        assert_eq!(merged.as_slice()[0], Cell::Empty);
        assert_eq!(merged.as_slice()[2], Cell::Empty);
        assert_eq!(merged.iter().filter(|c| !c.is_empty()).count(), 2);
    }

    #[test]
    fn test_all_empty_is_noop() {
        let p = palette(&[("A", (0, 0, 0))]);
        let grid = grid_of(vec![Cell::Empty; 4]);
        let (merged, report) = merge_colors_with_report(&grid, &p, 30.0);
        assert_eq!(merged, grid);
        assert_eq!(report, MergeReport::default());
    }

    #[test]
    fn test_merge_never_adds_colors_and_is_monotone() {
        let p = palette(&[
            ("A", (0, 0, 0)),
            ("B", (12, 0, 0)),
            ("C", (30, 10, 0)),
            ("D", (60, 60, 60)),
            ("E", (200, 200, 200)),
        ]);
        let cells: Vec<Cell> = (0..40).map(|i| Cell::Assigned((i * 7 + i / 3) % 5)).collect();
        let grid = grid_of(cells);
        let distinct = |g: &Grid<Cell>| g.iter().filter_map(|c| c.index()).collect::<HashSet<_>>();
        let before = distinct(&grid);

        let mut last = before.len();
        for threshold in [0.0, 5.0, 15.0, 35.0, 80.0, 300.0, 500.0] {
            let after = distinct(&merge_colors(&grid, &p, threshold));
            assert!(after.is_subset(&before));
            assert!(after.len() <= last, "threshold {threshold}");
            last = after.len();
        }
        assert_eq!(last, 1);
    }
}
