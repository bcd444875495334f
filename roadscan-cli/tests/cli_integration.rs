use std::error::Error;
use std::fs;
use std::process::Command;

use serde_json::{json, Value};
use tempfile::tempdir;

const BIN: &str = env!("CARGO_BIN_EXE_roadscan");

fn grid_json() -> Value {
    // Two overlapping pothole cells and one transverse crack.
    json!({
        "rows": 3,
        "cols": 9,
        "layout": "row_major",
        "data": [
            200.0, 300.0, 80.0, 60.0, 0.95, 0.0, 0.0, 0.0, 0.9,
            204.0, 298.0, 82.0, 62.0, 0.90, 0.0, 0.0, 0.0, 0.85,
            500.0, 100.0, 120.0, 20.0, 0.80, 0.0, 0.9, 0.0, 0.0
        ]
    })
}

#[test]
fn writes_records_and_distribution() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let grid_path = dir.path().join("grid.json");
    let out_path = dir.path().join("out.json");
    let config_path = dir.path().join("config.json");
    fs::write(&grid_path, grid_json().to_string())?;
    fs::write(
        &config_path,
        json!({
            "grid_path": grid_path,
            "output_path": out_path,
            "original_size": [1280, 1280]
        })
        .to_string(),
    )?;

    let status = Command::new(BIN).arg("--config").arg(&config_path).status()?;
    assert!(status.success());

    let out: Value = serde_json::from_str(&fs::read_to_string(&out_path)?)?;
    assert_eq!(out["total"], 2);
    assert_eq!(out["detections"][0]["class"], "Potholes");
    assert_eq!(out["detections"][1]["class"], "Transverse Crack");
    assert_eq!(out["detections"][0]["bbox"], json!([320.0, 540.0, 480.0, 660.0]));
    assert_eq!(out["distribution"]["Potholes"], 1);
    assert_eq!(out["distribution"]["Transverse Crack"], 1);
    Ok(())
}

#[test]
fn shape_mismatch_fails_the_run() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let grid_path = dir.path().join("grid.json");
    let config_path = dir.path().join("config.json");
    fs::write(
        &grid_path,
        json!({ "rows": 1, "cols": 8, "data": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0] })
            .to_string(),
    )?;
    fs::write(&config_path, json!({ "grid_path": grid_path }).to_string())?;

    let output = Command::new(BIN).arg("--config").arg(&config_path).output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ShapeMismatch"), "{stderr}");
    Ok(())
}

#[test]
fn prints_example_config() -> Result<(), Box<dyn Error>> {
    let output = Command::new(BIN).arg("--print-example").output()?;
    assert!(output.status.success());
    let example: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(example["grid_path"], "grid.json");
    Ok(())
}
