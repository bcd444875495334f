//! Wire records and per-class statistics.
//!
//! [`DetectionRecord`] is the `{class, confidence, bbox}` shape stored by
//! the server and sent to clients. [`ClassHistogram`] counts detections per
//! class in label order, the "damage type distribution" reported by the
//! statistics endpoint.

use crate::detection::Detection;
use crate::label::LabelSet;

/// Serializable detection with its class resolved to a name.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectionRecord {
    /// Class name from the label set.
    pub class: String,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    /// Box as `[x1, y1, x2, y2]`.
    pub bbox: [f32; 4],
}

impl DetectionRecord {
    /// Resolves `det` against `labels`; `None` if the class id is unknown.
    pub fn from_detection(det: &Detection, labels: &LabelSet) -> Option<Self> {
        let class = labels.name(det.class_id)?.to_owned();
        Some(Self {
            class,
            confidence: det.confidence,
            bbox: det.bbox.to_array(),
        })
    }

    /// Converts the record back into a detection using `labels`.
    pub fn to_detection(&self, labels: &LabelSet) -> Option<Detection> {
        let class_id = labels.index_of(&self.class)?;
        Some(Detection::new(class_id, self.confidence, self.bbox.into()))
    }
}

/// Converts detections to records, skipping any with unknown class ids.
pub fn to_records(detections: &[Detection], labels: &LabelSet) -> Vec<DetectionRecord> {
    detections
        .iter()
        .filter_map(|d| DetectionRecord::from_detection(d, labels))
        .collect()
}

/// Per-class detection counts in label order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassHistogram {
    labels: LabelSet,
    counts: Vec<usize>,
}

impl ClassHistogram {
    /// Creates an all-zero histogram over `labels`.
    pub fn new(labels: LabelSet) -> Self {
        let counts = vec![0; labels.len()];
        Self { labels, counts }
    }

    /// Counts `detections`; unknown class ids are ignored.
    pub fn from_detections(labels: LabelSet, detections: &[Detection]) -> Self {
        let mut hist = Self::new(labels);
        for det in detections {
            hist.add_class_id(det.class_id);
        }
        hist
    }

    /// Counts `records` by class name; unknown names are ignored.
    pub fn from_records(labels: LabelSet, records: &[DetectionRecord]) -> Self {
        let mut hist = Self::new(labels);
        for record in records {
            if let Some(id) = hist.labels.index_of(&record.class) {
                hist.counts[id] += 1;
            }
        }
        hist
    }

    /// Increments the count for `class_id`. Returns `false` if unknown.
    pub fn add_class_id(&mut self, class_id: usize) -> bool {
        match self.counts.get_mut(class_id) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    /// Count for `class_id`.
    pub fn count(&self, class_id: usize) -> usize {
        self.counts.get(class_id).copied().unwrap_or(0)
    }

    /// Total number of counted detections.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Iterates `(class name, count)` in label order, including zeros.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.labels.iter().zip(self.counts.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::{to_records, ClassHistogram, DetectionRecord};
    use crate::detection::{BBox, Detection};
    use crate::label::LabelSet;

    #[test]
    fn records_resolve_class_names() {
        let labels = LabelSet::road_damage();
        let dets = [
            Detection::new(3, 0.81, BBox::new(1.0, 2.0, 3.0, 4.0)),
            Detection::new(9, 0.9, BBox::new(1.0, 2.0, 3.0, 4.0)),
        ];
        let records = to_records(&dets, &labels);
        assert_eq!(
            records,
            vec![DetectionRecord {
                class: "Potholes".to_string(),
                confidence: 0.81,
                bbox: [1.0, 2.0, 3.0, 4.0],
            }]
        );
        assert_eq!(records[0].to_detection(&labels), Some(dets[0]));
    }

    #[test]
    fn histogram_counts_in_label_order() {
        let labels = LabelSet::road_damage();
        let b = BBox::default();
        let dets = [
            Detection::new(3, 0.9, b),
            Detection::new(0, 0.9, b),
            Detection::new(3, 0.9, b),
            Detection::new(5, 0.9, b),
        ];
        let hist = ClassHistogram::from_detections(labels.clone(), &dets);
        assert_eq!(hist.total(), 3);
        let pairs: Vec<_> = hist.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("Longitudinal Crack", 1),
                ("Transverse Crack", 0),
                ("Alligator Crack", 0),
                ("Potholes", 2),
            ]
        );
        let from_records = ClassHistogram::from_records(labels.clone(), &to_records(&dets, &labels));
        assert_eq!(from_records, hist);
    }
}
