//! Greedy IoU non-maximum suppression for detections.

use crate::detection::{confidence_cmp_desc, Detection};
use crate::trace::{trace_event, trace_span};
use crate::util::math::is_unit_interval;
use crate::util::{RoadScanError, RoadScanResult};

/// Suppression settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsConfig {
    /// Candidates whose IoU with a kept detection exceeds this are dropped.
    pub iou_threshold: f32,
    /// Compare only detections of the same class. When `false`, an
    /// overlapping box suppresses lower-scored boxes of any class.
    pub per_class: bool,
    /// Stop after this many kept detections.
    pub max_detections: Option<usize>,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            per_class: false,
            max_detections: None,
        }
    }
}

impl NmsConfig {
    /// Checks that the IoU threshold lies in `[0, 1]`.
    pub fn validate(&self) -> RoadScanResult<()> {
        if !is_unit_interval(self.iou_threshold) {
            return Err(RoadScanError::InvalidParameter {
                name: "iou_threshold",
                reason: "must be within [0, 1]",
            });
        }
        Ok(())
    }
}

/// Returns the indices of detections kept by NMS, in descending
/// confidence order.
///
/// Indices refer to `detections`, so the result is a subset of the input by
/// identity. Confidence ties keep their input order.
pub fn suppress_indices(detections: &[Detection], cfg: &NmsConfig) -> Vec<usize> {
    let limit = cfg.max_detections.unwrap_or(usize::MAX);
    if limit == 0 {
        return Vec::new();
    }
    if detections.len() <= 1 {
        return (0..detections.len()).collect();
    }

    let _span = trace_span!(
        "suppress",
        candidates = detections.len(),
        per_class = cfg.per_class
    )
    .entered();

    let mut order: Vec<usize> = (0..detections.len()).collect();
    order.sort_by(|&a, &b| confidence_cmp_desc(detections[a].confidence, detections[b].confidence));

    let mut suppressed = vec![false; order.len()];
    let mut kept = Vec::new();

    for i in 0..order.len() {
        if suppressed[i] {
            continue;
        }
        let current = &detections[order[i]];
        kept.push(order[i]);
        if kept.len() >= limit {
            break;
        }
        for j in (i + 1)..order.len() {
            if suppressed[j] {
                continue;
            }
            let other = &detections[order[j]];
            if cfg.per_class && other.class_id != current.class_id {
                continue;
            }
            if current.bbox.iou(&other.bbox) > cfg.iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    trace_event!(
        "suppress_done",
        candidates = detections.len(),
        kept = kept.len()
    );
    kept
}

/// Applies NMS and returns copies of the kept detections in descending
/// confidence order.
pub fn suppress(detections: &[Detection], cfg: &NmsConfig) -> Vec<Detection> {
    suppress_indices(detections, cfg)
        .into_iter()
        .map(|idx| detections[idx])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{suppress, suppress_indices, NmsConfig};
    use crate::detection::{BBox, Detection};

    fn det(class_id: usize, confidence: f32, b: [f32; 4]) -> Detection {
        Detection::new(class_id, confidence, BBox::from(b))
    }

    #[test]
    fn keeps_highest_of_identical_boxes() {
        let dets = [
            det(0, 0.7, [0.0, 0.0, 10.0, 10.0]),
            det(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
        ];
        let kept = suppress(&dets, &NmsConfig::default());
        assert_eq!(kept, vec![dets[1]]);
    }

    #[test]
    fn disjoint_boxes_survive_any_threshold() {
        let dets = [
            det(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
            det(0, 0.8, [100.0, 100.0, 110.0, 110.0]),
        ];
        for t in [0.0, 0.5, 1.0] {
            let cfg = NmsConfig {
                iou_threshold: t,
                ..NmsConfig::default()
            };
            assert_eq!(suppress_indices(&dets, &cfg), vec![0, 1]);
        }
    }

    #[test]
    fn single_and_empty_inputs_pass_through() {
        assert!(suppress(&[], &NmsConfig::default()).is_empty());
        let one = [det(2, 0.1, [0.0, 0.0, 1.0, 1.0])];
        assert_eq!(suppress(&one, &NmsConfig::default()), one.to_vec());
    }

    #[test]
    fn per_class_keeps_overlapping_other_classes() {
        let dets = [
            det(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
            det(1, 0.8, [1.0, 1.0, 10.0, 10.0]),
        ];
        assert_eq!(suppress_indices(&dets, &NmsConfig::default()), vec![0]);
        let cfg = NmsConfig {
            per_class: true,
            ..NmsConfig::default()
        };
        assert_eq!(suppress_indices(&dets, &cfg), vec![0, 1]);
    }

    #[test]
    fn suppressed_box_does_not_suppress_others() {
        // b overlaps a and c; a overlaps b only. c must survive because b is
        // removed before it gets a chance to suppress.
        let dets = [
            det(0, 0.9, [0.0, 0.0, 10.0, 10.0]),
            det(0, 0.8, [4.0, 0.0, 14.0, 10.0]),
            det(0, 0.7, [8.0, 0.0, 18.0, 10.0]),
        ];
        let cfg = NmsConfig {
            iou_threshold: 0.3,
            ..NmsConfig::default()
        };
        assert_eq!(suppress_indices(&dets, &cfg), vec![0, 2]);
    }

    #[test]
    fn max_detections_caps_output() {
        let dets = [
            det(0, 0.3, [0.0, 0.0, 1.0, 1.0]),
            det(0, 0.9, [10.0, 10.0, 11.0, 11.0]),
            det(0, 0.6, [20.0, 20.0, 21.0, 21.0]),
        ];
        let cfg = NmsConfig {
            max_detections: Some(2),
            ..NmsConfig::default()
        };
        assert_eq!(suppress_indices(&dets, &cfg), vec![1, 2]);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let cfg = NmsConfig {
            iou_threshold: -0.1,
            ..NmsConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
