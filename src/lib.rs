//! roadscan turns raw detector output into final road damage detections.
//!
//! The crate covers the post-processing half of a detector: decoding a dense
//! `[rows, 4 + 1 + C]` grid into scored boxes, then greedy IoU non-maximum
//! suppression. Both stages are pure functions; [`PostProcessor`] bundles
//! them with a label set as an explicit, caller-owned context. Row decoding
//! can run in parallel via the `rayon` feature, records serialize with the
//! `serde` feature, and stage spans are emitted with the `tracing` feature.

mod candidate;
pub mod decode;
pub mod detection;
pub mod grid;
pub mod label;
pub mod lowlevel;
pub mod model_info;
pub mod pipeline;
pub mod record;
mod trace;
pub mod util;

pub use candidate::nms::{suppress, NmsConfig};
pub use decode::{decode, CoordUnits, DecodeConfig};
pub use detection::{rescale_detections, BBox, Detection};
pub use grid::{GridLayout, GridView, OwnedGrid};
pub use label::{LabelSet, ROAD_DAMAGE_CLASSES};
pub use model_info::ModelInfo;
pub use pipeline::{PipelineConfig, PostProcessor};
pub use record::{to_records, ClassHistogram, DetectionRecord};
pub use util::{RoadScanError, RoadScanResult};
