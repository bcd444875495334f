//! Ordered class-label sets.

use crate::util::{RoadScanError, RoadScanResult};

/// Road damage categories produced by the reference detector, in class-id
/// order.
pub const ROAD_DAMAGE_CLASSES: [&str; 4] = [
    "Longitudinal Crack",
    "Transverse Crack",
    "Alligator Crack",
    "Potholes",
];

/// Ordered, non-empty list of class names indexed by class id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    /// Creates a label set from names in class-id order.
    pub fn new<I, S>(names: I) -> RoadScanResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(RoadScanError::EmptyLabels);
        }
        Ok(Self { names })
    }

    /// The four road damage categories.
    pub fn road_damage() -> Self {
        Self {
            names: ROAD_DAMAGE_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if there are no classes.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns the class name for `class_id`.
    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Returns the class id for `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Iterates names in class-id order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::road_damage()
    }
}
