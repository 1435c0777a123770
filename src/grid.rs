//! Square-ish cell grids and the image-to-grid pixelation step.

use std::ops::Range;

use image::RgbaImage;

use crate::catalog::RgbColor;
use crate::error::{Error, Result};
use crate::sampler::{PixelationMode, sample_cell};

/// Row-major matrix stored in one flat buffer (`index = row * cols + col`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Wrap `cells`, which must hold exactly `rows * cols` items.
    pub fn new(rows: usize, cols: usize, cells: Vec<T>) -> Result<Self> {
        if cells.len() != rows * cols {
            return Err(Error::InvalidDimensions(format!(
                "{} cells for a {rows}x{cols} grid",
                cells.len()
            )));
        }
        Ok(Self { rows, cols, cells })
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(f(row, col));
            }
        }
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.cells.iter()
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(f).collect(),
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

/// State of one bead cell after palette matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Transparent source region; never counted or merged.
    Empty,
    /// Position of the assigned color in the palette.
    Assigned(usize),
}

impl Cell {
    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn index(self) -> Option<usize> {
        match self {
            Cell::Empty => None,
            Cell::Assigned(i) => Some(i),
        }
    }
}

/// Source pixels covered by grid line `index` when `extent` pixels are split
/// into `cells` lines.
///
/// Spans run from `floor(index * extent / cells)` to
/// `ceil((index + 1) * extent / cells)`, clipped to the axis. Every pixel is
/// covered; where a boundary falls inside a pixel that pixel belongs to both
/// neighbouring cells. A span is never narrower than one pixel.
pub fn cell_span(index: u32, extent: u32, cells: u32) -> Range<u32> {
    let (i, e, n) = (index as u64, extent as u64, cells as u64);
    let start = (i * e / n) as u32;
    let end = ((i + 1) * e).div_ceil(n).min(e) as u32;
    start..end.max(start + 1)
}

/// Split `image` into `rows x cols` cells and sample each one.
///
/// `None` marks a cell whose region has no opaque pixel.
pub fn pixelate(
    image: &RgbaImage,
    rows: u32,
    cols: u32,
    mode: PixelationMode,
) -> Result<Grid<Option<RgbColor>>> {
    let (img_w, img_h) = image.dimensions();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions(format!("grid {rows}x{cols}")));
    }
    if img_w == 0 || img_h == 0 {
        return Err(Error::InvalidDimensions(format!("image {img_w}x{img_h}")));
    }

    let x_spans: Vec<Range<u32>> = (0..cols).map(|i| cell_span(i, img_w, cols)).collect();
    Ok(Grid::from_fn(rows as usize, cols as usize, |row, col| {
        let ys = cell_span(row as u32, img_h, rows);
        let xs = &x_spans[col];
        sample_cell(image, xs.start, ys.start, xs.len() as u32, ys.len() as u32, mode)
    }))
}
