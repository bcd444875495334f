//! Candidate pruning.
//!
//! Greedy IoU non-maximum suppression over decoded detections.

pub(crate) mod nms;
