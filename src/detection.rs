//! Bounding boxes and scored detections.

use crate::util::math::is_positive_finite;
use crate::util::{RoadScanError, RoadScanResult};
use std::cmp::Ordering;

/// Axis-aligned box in corner form.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BBox {
    /// Left edge.
    pub x1: f32,
    /// Top edge.
    pub y1: f32,
    /// Right edge.
    pub x2: f32,
    /// Bottom edge.
    pub y2: f32,
}

impl BBox {
    /// Creates a box from corner coordinates.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Converts a center-form box to corner form without clamping.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        let hw = w * 0.5;
        let hh = h * 0.5;
        Self {
            x1: cx - hw,
            y1: cy - hh,
            x2: cx + hw,
            y2: cy + hh,
        }
    }

    /// Width, zero for inverted boxes.
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Height, zero for inverted boxes.
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    /// Area, zero for degenerate or inverted boxes.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Clamps the box into `[0, size]` on both axes.
    ///
    /// The result always satisfies `0 <= x1 <= x2 <= size` and
    /// `0 <= y1 <= y2 <= size`. A negative or NaN `size` collapses the box
    /// to the origin.
    pub fn clamp(&self, size: f32) -> Self {
        let size = if size >= 0.0 { size } else { 0.0 };
        let x1 = self.x1.max(0.0).min(size);
        let y1 = self.y1.max(0.0).min(size);
        let x2 = self.x2.max(0.0).min(size).max(x1);
        let y2 = self.y2.max(0.0).min(size).max(y1);
        Self { x1, y1, x2, y2 }
    }

    /// Scales x coordinates by `sx` and y coordinates by `sy`.
    pub fn scale(&self, sx: f32, sy: f32) -> Self {
        Self {
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            x2: self.x2 * sx,
            y2: self.y2 * sy,
        }
    }

    /// Intersection over union with `other`.
    ///
    /// Returns 0 when the boxes do not overlap or when the union area is 0,
    /// so degenerate boxes never suppress anything.
    pub fn iou(&self, other: &BBox) -> f32 {
        let iw = self.x2.min(other.x2) - self.x1.max(other.x1);
        let ih = self.y2.min(other.y2) - self.y1.max(other.y1);
        if !(iw > 0.0 && ih > 0.0) {
            return 0.0;
        }
        let inter = iw * ih;
        let union = self.area() + other.area() - inter;
        if !(union > 0.0) {
            return 0.0;
        }
        inter / union
    }

    /// Corner coordinates as `[x1, y1, x2, y2]`.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

/// A scored, classified box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Index into the label set.
    pub class_id: usize,
    /// Objectness times best class probability, in `[0, 1]`.
    pub confidence: f32,
    /// Box in the coordinate space of the model input.
    pub bbox: BBox,
}

impl Detection {
    /// Creates a detection.
    pub fn new(class_id: usize, confidence: f32, bbox: BBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }

    /// Maps the box from an `input_size` square to a `width` x `height`
    /// image.
    pub fn rescaled(&self, input_size: f32, width: f32, height: f32) -> RoadScanResult<Self> {
        let (sx, sy) = rescale_factors(input_size, width, height)?;
        Ok(Self {
            bbox: self.bbox.scale(sx, sy),
            ..*self
        })
    }
}

fn rescale_factors(input_size: f32, width: f32, height: f32) -> RoadScanResult<(f32, f32)> {
    if !is_positive_finite(input_size) {
        return Err(RoadScanError::InvalidParameter {
            name: "input_size",
            reason: "must be finite and > 0",
        });
    }
    if !is_positive_finite(width) || !is_positive_finite(height) {
        return Err(RoadScanError::InvalidParameter {
            name: "original_size",
            reason: "width and height must be finite and > 0",
        });
    }
    Ok((width / input_size, height / input_size))
}

/// Maps every detection from an `input_size` square to a `width` x
/// `height` image, preserving order.
pub fn rescale_detections(
    detections: &[Detection],
    input_size: f32,
    width: f32,
    height: f32,
) -> RoadScanResult<Vec<Detection>> {
    let (sx, sy) = rescale_factors(input_size, width, height)?;
    Ok(detections
        .iter()
        .map(|d| Detection {
            bbox: d.bbox.scale(sx, sy),
            ..*d
        })
        .collect())
}

/// Descending confidence order with NaN sorted last.
pub(crate) fn confidence_cmp_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Stable sort by descending confidence; ties keep their relative order.
pub fn sort_by_confidence_desc(detections: &mut [Detection]) {
    detections.sort_by(|a, b| confidence_cmp_desc(a.confidence, b.confidence));
}
