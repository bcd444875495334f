use clap::Parser;
use roadscan::{
    rescale_detections, to_records, ClassHistogram, CoordUnits, DecodeConfig, DetectionRecord,
    GridLayout, GridView, LabelSet, ModelInfo, NmsConfig, PipelineConfig, PostProcessor,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "roadscan CLI: decode and suppress detector output (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DecodeConfigJson {
    confidence_threshold: f32,
    /// Overrides the model info input size when set.
    input_size: Option<f32>,
    coords: CoordUnits,
    parallel: bool,
}

impl Default for DecodeConfigJson {
    fn default() -> Self {
        let cfg = DecodeConfig::default();
        Self {
            confidence_threshold: cfg.confidence_threshold,
            input_size: None,
            coords: cfg.coords,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NmsConfigJson {
    iou_threshold: f32,
    per_class: bool,
    max_detections: Option<usize>,
}

impl Default for NmsConfigJson {
    fn default() -> Self {
        let cfg = NmsConfig::default();
        Self {
            iou_threshold: cfg.iou_threshold,
            per_class: cfg.per_class,
            max_detections: cfg.max_detections,
        }
    }
}

impl From<NmsConfigJson> for NmsConfig {
    fn from(value: NmsConfigJson) -> Self {
        Self {
            iou_threshold: value.iou_threshold,
            per_class: value.per_class,
            max_detections: value.max_detections,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    grid_path: String,
    model_info_path: Option<String>,
    labels: Option<Vec<String>>,
    output_path: Option<String>,
    /// Original image `[width, height]`; boxes are rescaled to it when set.
    original_size: Option<[f32; 2]>,
    decode: DecodeConfigJson,
    nms: NmsConfigJson,
}

/// Detector output tensor dumped as JSON.
#[derive(Debug, Deserialize)]
struct GridFile {
    rows: usize,
    cols: usize,
    #[serde(default)]
    layout: GridLayout,
    data: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct Output {
    detections: Vec<DetectionRecord>,
    distribution: BTreeMap<String, usize>,
    total: usize,
}

/// Resolves labels and input size from, in order of precedence, the config
/// itself, the model info file, and the road damage defaults.
fn resolve_model(config: &Config) -> Result<(LabelSet, f32), Box<dyn std::error::Error>> {
    let info = match &config.model_info_path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            let info: ModelInfo = serde_json::from_str(&text)?;
            info.validate()?;
            info
        }
        None => ModelInfo::road_damage(),
    };
    let labels = match &config.labels {
        Some(names) => LabelSet::new(names.iter().cloned())?,
        None => info.labels()?,
    };
    let input_size = config.decode.input_size.unwrap_or(info.input_size);
    Ok((labels, input_size))
}

fn build_pipeline_config(config: Config, input_size: f32) -> PipelineConfig {
    PipelineConfig {
        decode: DecodeConfig {
            confidence_threshold: config.decode.confidence_threshold,
            input_size,
            coords: config.decode.coords,
            parallel: config.decode.parallel,
        },
        nms: config.nms.into(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("roadscan=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.grid_path.is_empty() {
        return Err("grid_path must be set in the config".into());
    }

    let (labels, input_size) = resolve_model(&config)?;
    let grid_text = fs::read_to_string(&config.grid_path)?;
    let grid: GridFile = serde_json::from_str(&grid_text)?;
    let view = GridView::new(&grid.data, grid.rows, grid.cols, grid.layout)?;

    let output_path = config.output_path.clone();
    let original_size = config.original_size;
    let processor =
        PostProcessor::new(labels.clone()).with_config(build_pipeline_config(config, input_size));
    let mut detections = processor.run(view)?;
    tracing::info!(rows = grid.rows, kept = detections.len(), "post-processing done");

    if let Some([width, height]) = original_size {
        detections = rescale_detections(&detections, input_size, width, height)?;
    }

    let records = to_records(&detections, &labels);
    let hist = ClassHistogram::from_records(labels, &records);
    let distribution = hist
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| (name.to_owned(), count))
        .collect();
    let output = Output {
        total: hist.total(),
        detections: records,
        distribution,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
