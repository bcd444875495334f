//! Decoding of raw detection grids into candidate detections.
//!
//! Each grid row is one candidate cell: `cx, cy, w, h, objectness` followed
//! by one score per class. A row becomes a [`Detection`] when
//! `objectness * max(class scores)` reaches the confidence threshold and the
//! winning class exists in the label set. Boxes are converted to corner form
//! and clamped to the `[0, input_size]` square.

use crate::detection::{BBox, Detection};
use crate::grid::{GridLayout, GridView, BOX_PARAMS, CLASS_SCORES_START, OBJECTNESS_COL};
use crate::label::LabelSet;
use crate::trace::{trace_event, trace_span};
use crate::util::math::{argmax, is_positive_finite, is_unit_interval};
use crate::util::{RoadScanError, RoadScanResult};

#[cfg(feature = "rayon")]
pub mod rayon;

/// Units of the box parameters stored in the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CoordUnits {
    /// Pixels at the model input size.
    #[default]
    Pixels,
    /// Fractions of the model input size, multiplied by it on decode.
    Normalized,
}

/// Decoder configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeConfig {
    /// Minimum `objectness * class probability` to keep a row.
    pub confidence_threshold: f32,
    /// Side length of the square model input the boxes refer to.
    pub input_size: f32,
    /// Units of the stored box parameters.
    pub coords: CoordUnits,
    /// Decode rows in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            input_size: 640.0,
            coords: CoordUnits::Pixels,
            parallel: false,
        }
    }
}

impl DecodeConfig {
    /// Checks threshold and size ranges.
    pub fn validate(&self) -> RoadScanResult<()> {
        if !is_unit_interval(self.confidence_threshold) {
            return Err(RoadScanError::InvalidParameter {
                name: "confidence_threshold",
                reason: "must be within [0, 1]",
            });
        }
        if !is_positive_finite(self.input_size) {
            return Err(RoadScanError::InvalidParameter {
                name: "input_size",
                reason: "must be finite and > 0",
            });
        }
        Ok(())
    }

    fn coord_scale(&self) -> f32 {
        match self.coords {
            CoordUnits::Pixels => 1.0,
            CoordUnits::Normalized => self.input_size,
        }
    }
}

/// Checks that `grid` has exactly `4 + 1 + labels.len()` columns.
pub fn check_shape(grid: &GridView<'_>, labels: &LabelSet) -> RoadScanResult<()> {
    let expected = CLASS_SCORES_START + labels.len();
    if grid.cols() != expected {
        return Err(RoadScanError::ShapeMismatch {
            expected,
            got: grid.cols(),
        });
    }
    Ok(())
}

/// Decodes one grid row.
///
/// `row` must hold `4 + 1 + C` values. Returns `None` for rows that fall
/// below the threshold, pick a class outside `num_labels`, or carry
/// non-finite values. An invalid `cfg` rejects every row.
pub fn decode_row(row: &[f32], num_labels: usize, cfg: &DecodeConfig) -> Option<Detection> {
    cfg.validate().ok()?;
    let scores = row.get(CLASS_SCORES_START..)?;
    let objectness = row[OBJECTNESS_COL];
    let (class_id, max_class_prob) = argmax(scores)?;
    let confidence = objectness * max_class_prob;
    if confidence.is_nan() || confidence < cfg.confidence_threshold || class_id >= num_labels {
        return None;
    }

    let scale = cfg.coord_scale();
    let [cx, cy, w, h]: [f32; BOX_PARAMS] = [row[0], row[1], row[2], row[3]].map(|v| v * scale);
    if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
        return None;
    }
    let bbox = BBox::from_center(cx, cy, w, h).clamp(cfg.input_size);
    Some(Detection::new(class_id, confidence, bbox))
}

/// Decodes every admissible row of `grid` into a candidate detection.
///
/// Candidates are returned in row order. An all-background grid yields an
/// empty vector, not an error.
pub fn decode(
    grid: GridView<'_>,
    labels: &LabelSet,
    cfg: &DecodeConfig,
) -> RoadScanResult<Vec<Detection>> {
    cfg.validate()?;
    check_shape(&grid, labels)?;

    let _span = trace_span!("decode", rows = grid.rows(), classes = labels.len()).entered();

    let out = decode_rows(grid, labels.len(), cfg);
    trace_event!("decode_done", rows = grid.rows(), kept = out.len());
    Ok(out)
}

#[cfg(feature = "rayon")]
fn decode_rows(grid: GridView<'_>, num_labels: usize, cfg: &DecodeConfig) -> Vec<Detection> {
    if cfg.parallel {
        rayon::decode_par(grid, num_labels, cfg)
    } else {
        decode_seq(grid, num_labels, cfg)
    }
}

// Without rayon the `parallel` flag is ignored.
#[cfg(not(feature = "rayon"))]
fn decode_rows(grid: GridView<'_>, num_labels: usize, cfg: &DecodeConfig) -> Vec<Detection> {
    decode_seq(grid, num_labels, cfg)
}

fn decode_seq(grid: GridView<'_>, num_labels: usize, cfg: &DecodeConfig) -> Vec<Detection> {
    let mut out = Vec::new();
    match grid.layout() {
        GridLayout::RowMajor => {
            for r in 0..grid.rows() {
                if let Some(det) = grid.row(r).and_then(|row| decode_row(row, num_labels, cfg)) {
                    out.push(det);
                }
            }
        }
        GridLayout::ChannelMajor => {
            let mut scratch = vec![0.0f32; grid.cols()];
            for r in 0..grid.rows() {
                if grid.copy_row(r, &mut scratch) {
                    if let Some(det) = decode_row(&scratch, num_labels, cfg) {
                        out.push(det);
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{decode, decode_row, CoordUnits, DecodeConfig};
    use crate::detection::BBox;
    use crate::grid::OwnedGrid;
    use crate::label::LabelSet;
    use crate::util::RoadScanError;

    fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, scores: [f32; 4]) -> Vec<f32> {
        let mut r = vec![cx, cy, w, h, obj];
        r.extend_from_slice(&scores);
        r
    }

    #[test]
    fn decodes_reference_row() {
        let r = row(100.0, 100.0, 20.0, 40.0, 0.9, [0.1, 0.1, 0.1, 0.9]);
        let det = decode_row(&r, 4, &DecodeConfig::default()).unwrap();
        assert_eq!(det.class_id, 3);
        assert!((det.confidence - 0.81).abs() < 1e-6);
        assert_eq!(det.bbox, BBox::new(90.0, 80.0, 110.0, 120.0));
    }

    #[test]
    fn filters_below_threshold() {
        let r = row(100.0, 100.0, 20.0, 20.0, 0.6, [0.8, 0.1, 0.1, 0.1]);
        assert!(decode_row(&r, 4, &DecodeConfig::default()).is_none());
    }

    #[test]
    fn filters_class_outside_labels() {
        let r = row(100.0, 100.0, 20.0, 20.0, 1.0, [0.0, 0.0, 0.0, 1.0]);
        assert!(decode_row(&r, 3, &DecodeConfig::default()).is_none());
    }

    #[test]
    fn normalized_coordinates_are_scaled() {
        let cfg = DecodeConfig {
            coords: CoordUnits::Normalized,
            ..DecodeConfig::default()
        };
        let r = row(0.5, 0.5, 0.25, 0.5, 1.0, [1.0, 0.0, 0.0, 0.0]);
        let det = decode_row(&r, 4, &cfg).unwrap();
        assert_eq!(det.bbox, BBox::new(240.0, 160.0, 400.0, 480.0));
    }

    #[test]
    fn boxes_are_clamped_to_input() {
        let r = row(5.0, 635.0, 40.0, 40.0, 1.0, [1.0, 0.0, 0.0, 0.0]);
        let det = decode_row(&r, 4, &DecodeConfig::default()).unwrap();
        assert_eq!(det.bbox, BBox::new(0.0, 615.0, 25.0, 640.0));
    }

    #[test]
    fn invalid_config_rejects_rows_without_panicking() {
        let r = row(100.0, 100.0, 20.0, 20.0, 1.0, [0.0001, 0.0, 0.0, 0.0]);
        for cfg in [
            DecodeConfig {
                input_size: -1.0,
                ..DecodeConfig::default()
            },
            DecodeConfig {
                input_size: f32::NAN,
                ..DecodeConfig::default()
            },
            DecodeConfig {
                confidence_threshold: f32::NAN,
                ..DecodeConfig::default()
            },
        ] {
            assert!(decode_row(&r, 4, &cfg).is_none(), "{cfg:?}");
        }
    }

    #[test]
    fn non_finite_rows_are_discarded() {
        let cfg = DecodeConfig::default();
        let nan_objectness = row(100.0, 100.0, 20.0, 20.0, f32::NAN, [0.9, 0.0, 0.0, 0.0]);
        let infinite_center = row(f32::INFINITY, 100.0, 20.0, 20.0, 0.9, [0.9, 0.0, 0.0, 0.0]);
        let infinite_objectness =
            row(100.0, 100.0, 20.0, 20.0, f32::INFINITY, [0.0, 0.0, 0.0, 0.0]);
        assert!(decode_row(&nan_objectness, 4, &cfg).is_none());
        assert!(decode_row(&infinite_center, 4, &cfg).is_none());
        assert!(decode_row(&infinite_objectness, 4, &cfg).is_none());
    }

    #[test]
    fn short_rows_tolerate_large_label_counts() {
        let cfg = DecodeConfig::default();
        let r = row(100.0, 100.0, 20.0, 20.0, 0.9, [0.0, 0.9, 0.0, 0.0]);
        let det = decode_row(&r, 10, &cfg).unwrap();
        assert_eq!(det.class_id, 1);
        assert!(decode_row(&r[..5], 10, &cfg).is_none());
        assert!(decode_row(&r[..3], 10, &cfg).is_none());
    }

    #[test]
    fn wrong_column_count_is_shape_error() {
        let grid = OwnedGrid::new(vec![0.0; 16], 2, 8).unwrap();
        let err = decode(grid.view(), &LabelSet::road_damage(), &DecodeConfig::default())
            .unwrap_err();
        assert_eq!(err, RoadScanError::ShapeMismatch { expected: 9, got: 8 });
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let cfg = DecodeConfig {
            confidence_threshold: 1.5,
            ..DecodeConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(RoadScanError::InvalidParameter {
                name: "confidence_threshold",
                ..
            })
        ));
    }

    #[test]
    fn channel_major_grid_decodes_like_row_major() {
        let grid = OwnedGrid::from_rows(&[
            row(100.0, 100.0, 20.0, 20.0, 0.9, [0.9, 0.0, 0.0, 0.0]),
            row(300.0, 300.0, 20.0, 20.0, 0.1, [0.9, 0.0, 0.0, 0.0]),
            row(500.0, 200.0, 60.0, 20.0, 0.8, [0.0, 0.0, 0.95, 0.0]),
        ])
        .unwrap();
        let labels = LabelSet::road_damage();
        let cfg = DecodeConfig::default();
        let a = decode(grid.view(), &labels, &cfg).unwrap();
        let b = decode(grid.transposed().view(), &labels, &cfg).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);
    }
}
