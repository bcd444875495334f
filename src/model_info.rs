//! Metadata written next to converted detector models.
//!
//! Converted models ship a `model_info.json` describing the input size and
//! class names. With the `serde` feature this type deserializes directly
//! from that file.

use crate::label::LabelSet;
use crate::util::math::is_positive_finite;
use crate::util::{RoadScanError, RoadScanResult};

/// Input size and class list of a detector model.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ModelInfo {
    /// Side length of the square model input.
    pub input_size: f32,
    /// Number of class-score columns the model emits.
    pub num_classes: usize,
    /// Class names in class-id order.
    pub class_names: Vec<String>,
}

impl ModelInfo {
    /// Metadata of the reference road damage detector.
    pub fn road_damage() -> Self {
        let labels = LabelSet::road_damage();
        Self {
            input_size: 640.0,
            num_classes: labels.len(),
            class_names: labels.iter().map(str::to_owned).collect(),
        }
    }

    /// Checks that the class count, names and input size agree.
    pub fn validate(&self) -> RoadScanResult<()> {
        if self.num_classes != self.class_names.len() {
            return Err(RoadScanError::ModelInfoMismatch {
                num_classes: self.num_classes,
                names: self.class_names.len(),
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

    /// Builds the label set after validation.
    pub fn labels(&self) -> RoadScanResult<LabelSet> {
        self.validate()?;
        LabelSet::new(self.class_names.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::ModelInfo;
    use crate::util::RoadScanError;

    #[test]
    fn road_damage_info_is_consistent() {
        let info = ModelInfo::road_damage();
        assert_eq!(info.labels().unwrap().len(), 4);
    }

    #[test]
    fn mismatched_class_count_is_rejected() {
        let info = ModelInfo {
            num_classes: 5,
            ..ModelInfo::road_damage()
        };
        assert_eq!(
            info.labels().unwrap_err(),
            RoadScanError::ModelInfoMismatch {
                num_classes: 5,
                names: 4
            }
        );
    }

    #[test]
    fn empty_class_list_is_rejected() {
        let info = ModelInfo {
            input_size: 320.0,
            num_classes: 0,
            class_names: Vec::new(),
        };
        assert_eq!(info.labels().unwrap_err(), RoadScanError::EmptyLabels);
    }
}
