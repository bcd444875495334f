//! Low-level building blocks for custom post-processing pipelines.
//!
//! These expose the per-row decoder, shape check and index-returning
//! suppressor for callers that run their own loops, e.g. to decode several
//! output heads before a single suppression pass. Most users should prefer
//! [`PostProcessor`](crate::PostProcessor).

pub use crate::candidate::nms::suppress_indices;
pub use crate::decode::{check_shape, decode_row};
pub use crate::detection::sort_by_confidence_desc;
pub use crate::grid::{BOX_PARAMS, CLASS_SCORES_START, OBJECTNESS_COL};

#[cfg(feature = "rayon")]
pub use crate::decode::rayon::decode_par;
