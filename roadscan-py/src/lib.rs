//! Python bindings for the roadscan post-processing library.
//!
//! Lets the detection server run the same decode and suppression pipeline on
//! numpy arrays that on-device clients use.

use numpy::{PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use roadscan::{
    BBox, CoordUnits, DecodeConfig as RustDecodeConfig, Detection as RustDetection, GridLayout,
    GridView, LabelSet, NmsConfig as RustNmsConfig, PipelineConfig,
    PostProcessor as RustPostProcessor, RoadScanError,
};

/// Convert a RoadScanError to a Python exception.
fn to_py_err(err: RoadScanError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_layout(layout: &str) -> PyResult<GridLayout> {
    match layout.to_lowercase().as_str() {
        "row_major" | "rows" => Ok(GridLayout::RowMajor),
        "channel_major" | "channels" => Ok(GridLayout::ChannelMajor),
        _ => Err(PyValueError::new_err(
            "layout must be 'row_major' or 'channel_major'",
        )),
    }
}

/// Borrow a 2-D float32 array as a grid.
///
/// Row-major arrays are `(rows, 5 + C)`; channel-major arrays are
/// `(5 + C, rows)`.
fn grid_view<'a>(data: &'a [f32], shape: &[usize], layout: GridLayout) -> PyResult<GridView<'a>> {
    let (rows, cols) = match layout {
        GridLayout::RowMajor => (shape[0], shape[1]),
        GridLayout::ChannelMajor => (shape[1], shape[0]),
    };
    GridView::new(data, rows, cols, layout).map_err(to_py_err)
}

fn labels_from(names: Option<Vec<String>>) -> PyResult<LabelSet> {
    match names {
        Some(names) => LabelSet::new(names).map_err(to_py_err),
        None => Ok(LabelSet::road_damage()),
    }
}

/// A scored, classified box in model-input pixels.
#[pyclass]
#[derive(Clone)]
pub struct Detection {
    /// Index into the label list.
    #[pyo3(get)]
    pub class_id: usize,
    /// Objectness times best class probability.
    #[pyo3(get)]
    pub confidence: f32,
    /// Box as (x1, y1, x2, y2).
    #[pyo3(get)]
    pub bbox: (f32, f32, f32, f32),
}

#[pymethods]
impl Detection {
    #[new]
    fn new(class_id: usize, confidence: f32, bbox: (f32, f32, f32, f32)) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }

    /// Wire record `{class, confidence, bbox}`.
    ///
    /// Args:
    ///     labels: class names in id order (default: road damage classes)
    #[pyo3(signature = (labels = None))]
    fn to_dict<'py>(
        &self,
        py: Python<'py>,
        labels: Option<Vec<String>>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let labels = labels_from(labels)?;
        let name = labels
            .name(self.class_id)
            .ok_or_else(|| PyValueError::new_err("class_id outside the label list"))?;
        let dict = PyDict::new(py);
        dict.set_item("class", name)?;
        dict.set_item("confidence", self.confidence)?;
        let (x1, y1, x2, y2) = self.bbox;
        dict.set_item("bbox", vec![x1, y1, x2, y2])?;
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        let (x1, y1, x2, y2) = self.bbox;
        format!(
            "Detection(class_id={}, confidence={:.4}, bbox=({:.1}, {:.1}, {:.1}, {:.1}))",
            self.class_id, self.confidence, x1, y1, x2, y2
        )
    }
}

impl From<RustDetection> for Detection {
    fn from(d: RustDetection) -> Self {
        let b = d.bbox;
        Self {
            class_id: d.class_id,
            confidence: d.confidence,
            bbox: (b.x1, b.y1, b.x2, b.y2),
        }
    }
}

impl From<&Detection> for RustDetection {
    fn from(d: &Detection) -> Self {
        let (x1, y1, x2, y2) = d.bbox;
        RustDetection::new(d.class_id, d.confidence, BBox::new(x1, y1, x2, y2))
    }
}

/// Grid decoding settings.
#[pyclass]
#[derive(Clone)]
pub struct DecodeConfig {
    inner: RustDecodeConfig,
}

#[pymethods]
impl DecodeConfig {
    /// Create a new DecodeConfig.
    ///
    /// Args:
    ///     confidence_threshold: minimum objectness * class score (default: 0.5)
    ///     input_size: model input side length (default: 640)
    ///     coords: "pixels" or "normalized" (default: "pixels")
    ///     parallel: decode rows in parallel (default: False)
    #[new]
    #[pyo3(signature = (confidence_threshold = 0.5, input_size = 640.0, coords = "pixels", parallel = false))]
    fn new(confidence_threshold: f32, input_size: f32, coords: &str, parallel: bool) -> PyResult<Self> {
        let coords = match coords.to_lowercase().as_str() {
            "pixels" => CoordUnits::Pixels,
            "normalized" => CoordUnits::Normalized,
            _ => {
                return Err(PyValueError::new_err(
                    "coords must be 'pixels' or 'normalized'",
                ))
            }
        };
        let inner = RustDecodeConfig {
            confidence_threshold,
            input_size,
            coords,
            parallel,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn __repr__(&self) -> String {
        let coords = match self.inner.coords {
            CoordUnits::Pixels => "pixels",
            CoordUnits::Normalized => "normalized",
        };
        format!(
            "DecodeConfig(confidence_threshold={}, input_size={}, coords='{}', parallel={})",
            self.inner.confidence_threshold, self.inner.input_size, coords, self.inner.parallel
        )
    }
}

/// Non-maximum suppression settings.
#[pyclass]
#[derive(Clone)]
pub struct NmsConfig {
    inner: RustNmsConfig,
}

#[pymethods]
impl NmsConfig {
    /// Create a new NmsConfig.
    ///
    /// Args:
    ///     iou_threshold: overlap above which lower scores are dropped (default: 0.5)
    ///     per_class: only suppress within the same class (default: False)
    ///     max_detections: cap on kept detections (default: None)
    #[new]
    #[pyo3(signature = (iou_threshold = 0.5, per_class = false, max_detections = None))]
    fn new(iou_threshold: f32, per_class: bool, max_detections: Option<usize>) -> PyResult<Self> {
        let inner = RustNmsConfig {
            iou_threshold,
            per_class,
            max_detections,
        };
        inner.validate().map_err(to_py_err)?;
        Ok(Self { inner })
    }

    fn __repr__(&self) -> String {
        format!(
            "NmsConfig(iou_threshold={}, per_class={}, max_detections={:?})",
            self.inner.iou_threshold, self.inner.per_class, self.inner.max_detections
        )
    }
}

/// Decode-then-suppress pipeline bound to a label list.
#[pyclass]
pub struct PostProcessor {
    inner: RustPostProcessor,
}

#[pymethods]
impl PostProcessor {
    /// Create a post-processor.
    ///
    /// Args:
    ///     labels: class names in id order (default: road damage classes)
    ///     decode: DecodeConfig (default: DecodeConfig())
    ///     nms: NmsConfig (default: NmsConfig())
    #[new]
    #[pyo3(signature = (labels = None, decode = None, nms = None))]
    fn new(
        labels: Option<Vec<String>>,
        decode: Option<DecodeConfig>,
        nms: Option<NmsConfig>,
    ) -> PyResult<Self> {
        let cfg = PipelineConfig {
            decode: decode.map(|c| c.inner).unwrap_or_default(),
            nms: nms.map(|c| c.inner).unwrap_or_default(),
        };
        let inner = RustPostProcessor::new(labels_from(labels)?).with_config(cfg);
        Ok(Self { inner })
    }

    /// Run the pipeline on a detector output array.
    ///
    /// Args:
    ///     grid: 2D float32 numpy array
    ///     layout: "row_major" (rows, 5 + C) or "channel_major" (5 + C, rows)
    ///
    /// Returns:
    ///     list of Detection, highest confidence first
    #[pyo3(signature = (grid, layout = "row_major"))]
    fn run(&self, grid: PyReadonlyArray2<'_, f32>, layout: &str) -> PyResult<Vec<Detection>> {
        let layout = parse_layout(layout)?;
        let shape = grid.shape().to_vec();
        let view = grid_view(grid.as_slice()?, &shape, layout)?;
        let dets = self.inner.run(view).map_err(to_py_err)?;
        Ok(dets.into_iter().map(Detection::from).collect())
    }

    /// Suppress detections produced elsewhere with this processor's settings.
    fn refine(&self, detections: Vec<Detection>) -> PyResult<Vec<Detection>> {
        let rust: Vec<RustDetection> = detections.iter().map(RustDetection::from).collect();
        let kept = self.inner.refine(&rust).map_err(to_py_err)?;
        Ok(kept.into_iter().map(Detection::from).collect())
    }

    /// Class names in id order.
    #[getter]
    fn labels(&self) -> Vec<String> {
        self.inner.labels().iter().map(str::to_owned).collect()
    }

    fn __repr__(&self) -> String {
        format!("PostProcessor(classes={})", self.inner.labels().len())
    }
}

/// Decode a detector output array into candidate detections (no NMS).
///
/// Args:
///     grid: 2D float32 numpy array
///     labels: class names in id order (default: road damage classes)
///     config: DecodeConfig (default: DecodeConfig())
///     layout: "row_major" or "channel_major" (default: "row_major")
#[pyfunction]
#[pyo3(signature = (grid, labels = None, config = None, layout = "row_major"))]
fn decode(
    grid: PyReadonlyArray2<'_, f32>,
    labels: Option<Vec<String>>,
    config: Option<DecodeConfig>,
    layout: &str,
) -> PyResult<Vec<Detection>> {
    let labels = labels_from(labels)?;
    let cfg = config.map(|c| c.inner).unwrap_or_default();
    let layout = parse_layout(layout)?;
    let shape = grid.shape().to_vec();
    let view = grid_view(grid.as_slice()?, &shape, layout)?;
    let dets = roadscan::decode(view, &labels, &cfg).map_err(to_py_err)?;
    Ok(dets.into_iter().map(Detection::from).collect())
}

/// Apply non-maximum suppression to a list of detections.
///
/// Args:
///     detections: list of Detection
///     config: NmsConfig (default: NmsConfig())
#[pyfunction]
#[pyo3(signature = (detections, config = None))]
fn suppress(detections: Vec<Detection>, config: Option<NmsConfig>) -> Vec<Detection> {
    let cfg = config.map(|c| c.inner).unwrap_or_default();
    let rust: Vec<RustDetection> = detections.iter().map(RustDetection::from).collect();
    roadscan::suppress(&rust, &cfg)
        .into_iter()
        .map(Detection::from)
        .collect()
}

/// Intersection over union of two (x1, y1, x2, y2) boxes.
#[pyfunction]
fn iou(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> f32 {
    let a = BBox::new(a.0, a.1, a.2, a.3);
    let b = BBox::new(b.0, b.1, b.2, b.3);
    a.iou(&b)
}

/// Python module for roadscan post-processing.
#[pymodule]
fn _roadscan(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Detection>()?;
    m.add_class::<DecodeConfig>()?;
    m.add_class::<NmsConfig>()?;
    m.add_class::<PostProcessor>()?;
    m.add_function(wrap_pyfunction!(decode, m)?)?;
    m.add_function(wrap_pyfunction!(suppress, m)?)?;
    m.add_function(wrap_pyfunction!(iou, m)?)?;
    m.add("CLASSES", roadscan::ROAD_DAMAGE_CLASSES.to_vec())?;

    // Add version
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
