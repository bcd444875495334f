//! Borrowed views over raw detection-grid tensors.
//!
//! A detection grid holds one candidate cell per logical row and
//! `4 + 1 + C` attributes per cell: `cx, cy, w, h, objectness` followed by
//! `C` class scores. `GridView` is a zero-copy view into the flat `f32`
//! buffer produced by the inference call. Two memory layouts are accepted:
//! row-major `[rows, cols]` and channel-major `[cols, rows]` (the transposed
//! `[1, 5 + C, N]` head emitted by many exported detectors). Logical access
//! is identical for both.

use crate::util::{RoadScanError, RoadScanResult};

/// Number of leading box parameters in every cell (`cx, cy, w, h`).
pub const BOX_PARAMS: usize = 4;
/// Column index of the objectness score.
pub const OBJECTNESS_COL: usize = BOX_PARAMS;
/// Column index of the first class score.
pub const CLASS_SCORES_START: usize = BOX_PARAMS + 1;

/// Memory layout of the flat grid buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GridLayout {
    /// `[rows, cols]`: each candidate's attributes are contiguous.
    #[default]
    RowMajor,
    /// `[cols, rows]`: each attribute is contiguous across candidates.
    ChannelMajor,
}

/// Borrowed view of a detection grid.
#[derive(Copy, Clone, Debug)]
pub struct GridView<'a> {
    data: &'a [f32],
    rows: usize,
    cols: usize,
    layout: GridLayout,
}

impl<'a> GridView<'a> {
    /// Creates a row-major view.
    pub fn from_slice(data: &'a [f32], rows: usize, cols: usize) -> RoadScanResult<Self> {
        Self::new(data, rows, cols, GridLayout::RowMajor)
    }

    /// Creates a view with an explicit layout.
    ///
    /// `rows == 0` is an empty grid and is accepted; `cols` must be non-zero.
    pub fn new(
        data: &'a [f32],
        rows: usize,
        cols: usize,
        layout: GridLayout,
    ) -> RoadScanResult<Self> {
        if cols == 0 {
            return Err(RoadScanError::ShapeMismatch {
                expected: CLASS_SCORES_START + 1,
                got: 0,
            });
        }
        let needed = rows
            .checked_mul(cols)
            .ok_or(RoadScanError::InvalidParameter {
                name: "rows",
                reason: "rows * cols overflows usize",
            })?;
        if data.len() < needed {
            return Err(RoadScanError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data: &data[..needed],
            rows,
            cols,
            layout,
        })
    }

    /// Number of candidate cells.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of attributes per cell.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Memory layout of the backing buffer.
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Number of class-score columns, if the grid is wide enough to hold any.
    pub fn num_classes(&self) -> Option<usize> {
        self.cols.checked_sub(CLASS_SCORES_START).filter(|&c| c > 0)
    }

    /// Returns the value at logical `(row, col)` if it is within bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let idx = match self.layout {
            GridLayout::RowMajor => row * self.cols + col,
            GridLayout::ChannelMajor => col * self.rows + row,
        };
        self.data.get(idx).copied()
    }

    /// Returns row `row` as a contiguous slice when the layout allows it.
    ///
    /// Only row-major grids store a cell contiguously; channel-major grids
    /// return `None` and callers fall back to [`GridView::copy_row`].
    pub fn row(&self, row: usize) -> Option<&'a [f32]> {
        if self.layout != GridLayout::RowMajor || row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.data.get(start..start + self.cols)
    }

    /// Copies logical row `row` into `out`, which must hold `cols` values.
    ///
    /// Returns `false` when `row` is out of bounds or `out` is too short.
    pub fn copy_row(&self, row: usize, out: &mut [f32]) -> bool {
        if row >= self.rows || out.len() < self.cols {
            return false;
        }
        match self.row(row) {
            Some(src) => out[..self.cols].copy_from_slice(src),
            None => {
                for (col, slot) in out[..self.cols].iter_mut().enumerate() {
                    *slot = self.data[col * self.rows + row];
                }
            }
        }
        true
    }
}

/// Owned detection grid, convenient for tests and callers that assemble
/// tensors themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedGrid {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
    layout: GridLayout,
}

impl OwnedGrid {
    /// Creates an owned row-major grid, validating the buffer length.
    pub fn new(data: Vec<f32>, rows: usize, cols: usize) -> RoadScanResult<Self> {
        Self::with_layout(data, rows, cols, GridLayout::RowMajor)
    }

    /// Creates an owned grid with an explicit layout.
    pub fn with_layout(
        data: Vec<f32>,
        rows: usize,
        cols: usize,
        layout: GridLayout,
    ) -> RoadScanResult<Self> {
        GridView::new(&data, rows, cols, layout)?;
        Ok(Self {
            data,
            rows,
            cols,
            layout,
        })
    }

    /// Builds a row-major grid from per-cell rows of equal length.
    pub fn from_rows(rows: &[Vec<f32>]) -> RoadScanResult<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(CLASS_SCORES_START + 1);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(RoadScanError::ShapeMismatch {
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Self::new(data, rows.len(), cols)
    }

    /// Returns a borrowed view of the grid.
    pub fn view(&self) -> GridView<'_> {
        GridView {
            data: &self.data,
            rows: self.rows,
            cols: self.cols,
            layout: self.layout,
        }
    }

    /// Returns the backing buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns a copy of this grid stored in the other layout.
    pub fn transposed(&self) -> Self {
        let view = self.view();
        let mut data = Vec::with_capacity(self.data.len());
        let layout = match self.layout {
            GridLayout::RowMajor => {
                for col in 0..self.cols {
                    for row in 0..self.rows {
                        data.push(view.get(row, col).unwrap_or_default());
                    }
                }
                GridLayout::ChannelMajor
            }
            GridLayout::ChannelMajor => {
                for row in 0..self.rows {
                    for col in 0..self.cols {
                        data.push(view.get(row, col).unwrap_or_default());
                    }
                }
                GridLayout::RowMajor
            }
        };
        Self {
            data,
            rows: self.rows,
            cols: self.cols,
            layout,
        }
    }
}
