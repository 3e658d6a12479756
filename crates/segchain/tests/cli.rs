use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use assert_cmd::Command;
use image::{GrayImage, ImageBuffer, Luma};
use predicates::prelude::*;
use tempfile::TempDir;

/// Five bright 3x5 boxes, ten pixels apart, on a dark background.
fn write_boxes(dir: &Path) -> PathBuf {
    let img: GrayImage = ImageBuffer::from_fn(50, 9, |x, y| {
        let inside = (2..7).contains(&y) && x % 10 >= 1 && x % 10 < 4 && x < 44;
        Luma([if inside { 220 } else { 15 }])
    });
    let path = dir.join("boxes.png");
    img.save(&path).expect("write png");
    path
}

fn segchain() -> Command {
    Command::cargo_bin("segchain").expect("segchain binary")
}

#[test]
fn prints_a_summary() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_boxes(dir.path());
    segchain()
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("image 50x9: 6 segments, 1 chains"))
        .stdout(predicate::str::contains("chain 0: length 5"));
}

#[test]
fn json_report_is_parseable() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_boxes(dir.path());
    let output = segchain()
        .arg(&input)
        .args(["--json", "--select", "2,4"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["segments"], 6);
    assert_eq!(report["chains"][0]["segments"], serde_json::json!([1, 2, 3, 4, 5]));
    let vertical = report["chains"][0]["vertical_shear"].as_f64().expect("shear");
    assert_relative_eq!(vertical, 0.0, epsilon = 1e-12);
    assert_eq!(report["selected"][0]["index"], 2);
    assert_eq!(report["selected"][1]["xmin"], 31);
}

#[test]
fn params_file_overrides_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_boxes(dir.path());
    let params = dir.path().join("params.json");
    std::fs::write(&params, r#"{ "drmax": 1.5 }"#).expect("write params");
    segchain()
        .arg(&input)
        .arg("--params")
        .arg(&params)
        .assert()
        .success()
        .stdout(predicate::str::contains("6 segments, 0 chains"));
}

#[test]
fn bad_selection_fails() {
    let dir = TempDir::new().expect("tempdir");
    let input = write_boxes(dir.path());
    segchain()
        .arg(&input)
        .args(["--select", "99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn missing_image_fails() {
    let dir = TempDir::new().expect("tempdir");
    segchain()
        .arg(dir.path().join("nope.png"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: io:"));
}
