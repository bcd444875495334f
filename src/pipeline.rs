//! Caller-owned post-processing context.
//!
//! A [`PostProcessor`] bundles the label set with decoder and suppression
//! settings and runs grid → candidates → final detections. It holds no
//! global state: build one per model and share it by reference across
//! threads.

use crate::candidate::nms::{suppress, NmsConfig};
use crate::decode::{decode, DecodeConfig};
use crate::detection::Detection;
use crate::grid::GridView;
use crate::label::LabelSet;
use crate::trace::trace_debug;
use crate::util::RoadScanResult;

/// Combined decoder and suppressor settings.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineConfig {
    /// Grid decoding settings.
    pub decode: DecodeConfig,
    /// Non-maximum suppression settings.
    pub nms: NmsConfig,
}

impl PipelineConfig {
    /// Validates both stages.
    pub fn validate(&self) -> RoadScanResult<()> {
        self.decode.validate()?;
        self.nms.validate()
    }
}

/// Decode-then-suppress pipeline bound to one label set.
#[derive(Clone, Debug)]
pub struct PostProcessor {
    labels: LabelSet,
    cfg: PipelineConfig,
}

impl PostProcessor {
    /// Creates a post-processor with default settings.
    pub fn new(labels: LabelSet) -> Self {
        Self {
            labels,
            cfg: PipelineConfig::default(),
        }
    }

    /// Replaces the pipeline settings.
    pub fn with_config(mut self, cfg: PipelineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the label set.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Returns the pipeline settings.
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Decodes `grid` and suppresses overlaps.
    ///
    /// Returns detections in descending confidence order. An empty result
    /// means nothing cleared the threshold; errors mean the grid could not
    /// be interpreted.
    pub fn run(&self, grid: GridView<'_>) -> RoadScanResult<Vec<Detection>> {
        self.cfg.validate()?;
        let candidates = decode(grid, &self.labels, &self.cfg.decode)?;
        if candidates.is_empty() {
            trace_debug!(rows = grid.rows(), "no candidate above threshold");
            return Ok(candidates);
        }
        Ok(suppress(&candidates, &self.cfg.nms))
    }

    /// Suppresses detections obtained elsewhere, e.g. from a remote
    /// inference service, with this processor's settings.
    ///
    /// Detections below the confidence threshold or with a class id outside
    /// the label set are dropped first, matching what [`decode`] admits.
    pub fn refine(&self, detections: &[Detection]) -> RoadScanResult<Vec<Detection>> {
        self.cfg.validate()?;
        let admissible: Vec<Detection> = detections
            .iter()
            .filter(|d| {
                d.confidence >= self.cfg.decode.confidence_threshold
                    && d.class_id < self.labels.len()
            })
            .copied()
            .collect();
        Ok(suppress(&admissible, &self.cfg.nms))
    }
}
