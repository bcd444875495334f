//! Rayon-parallel grid decoding (feature-gated).
//!
//! Rows are independent, so the grid is split across the thread pool and
//! results are collected back in row order. Output is identical to the
//! sequential decoder.

use crate::decode::{decode_row, DecodeConfig};
use crate::detection::Detection;
use crate::grid::{GridLayout, GridView};
use rayon::prelude::*;

/// Row-parallel decode of an already shape-checked grid.
pub fn decode_par(grid: GridView<'_>, num_labels: usize, cfg: &DecodeConfig) -> Vec<Detection> {
    match grid.layout() {
        GridLayout::RowMajor => (0..grid.rows())
            .into_par_iter()
            .filter_map(|r| grid.row(r).and_then(|row| decode_row(row, num_labels, cfg)))
            .collect(),
        GridLayout::ChannelMajor => (0..grid.rows())
            .into_par_iter()
            .map_init(
                || vec![0.0f32; grid.cols()],
                |scratch, r| {
                    if grid.copy_row(r, scratch) {
                        decode_row(scratch, num_labels, cfg)
                    } else {
                        None
                    }
                },
            )
            .flatten()
            .collect(),
    }
}
