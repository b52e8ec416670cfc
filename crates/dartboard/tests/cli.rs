#![cfg(feature = "cli")]

use assert_cmd::Command;
use dartboard::{
    BBox, Board, BoardRadii, CalibrationConfig, CalibrationParams, CalibrationReport, Detections,
    Homography, Point2,
};
use nalgebra::Matrix3;
use predicates::str::contains;
use std::path::Path;

fn cmd() -> Command {
    Command::cargo_bin("dartcal").unwrap()
}

fn camera() -> Homography {
    let (s, c) = 2.0_f64.to_radians().sin_cos();
    Homography::new(Matrix3::new(
        2000.0 * c, -2000.0 * s, 640.0, //
        2000.0 * s, 2000.0 * c, 360.0, //
        0.2, 0.1, 1.0,
    ))
}

/// Writes `det.json` and `cfg.json` into `dir` and returns the config path.
fn write_config(dir: &Path, seed: u64) -> std::path::PathBuf {
    let board = Board::new(BoardRadii::default()).unwrap();
    let cam = camera();
    let cross_points: Vec<Point2<f64>> = board
        .cross_points()
        .iter()
        .map(|p| cam.apply(p).unwrap())
        .collect();
    let b = cam.apply(&Point2::origin()).unwrap();
    let detections = Detections {
        cross_points,
        outer_bull_box: Some(BBox::new(b.x - 32.0, b.y - 32.0, b.x + 32.0, b.y + 32.0)),
        inner_bull_box: None,
    };
    std::fs::write(
        dir.join("det.json"),
        serde_json::to_string(&detections).unwrap(),
    )
    .unwrap();

    let cfg = CalibrationConfig {
        detections_path: Some("det.json".into()),
        params: CalibrationParams::default().with_seed(seed),
        output_path: Some(dir.join("report.json").to_string_lossy().into_owned()),
        ..CalibrationConfig::default()
    };
    let path = dir.join("cfg.json");
    cfg.write_json(&path).unwrap();
    path
}

#[test]
fn calibrate_then_score() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(dir.path(), 9);

    cmd()
        .arg("calibrate")
        .arg(&cfg)
        .args(["--seed", "1"])
        .assert()
        .success()
        .stdout(contains("calibrated"));

    let report_path = dir.path().join("report.json");
    let report = CalibrationReport::load_json(&report_path).unwrap();
    let result = report.result.expect("calibration result");
    assert!(report.error.is_none());
    assert!((result.center.x - 640.0).abs() < 1e-6);
    assert!((result.center.y - 360.0).abs() < 1e-6);

    cmd()
        .arg("score")
        .arg(&report_path)
        .args(["640,360", "5000,5000"])
        .assert()
        .success()
        .stdout(contains("DB\nOUT\n"));
}

#[test]
fn out_flag_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(dir.path(), 2);
    let out = dir.path().join("elsewhere.json");

    cmd()
        .arg("calibrate")
        .arg(&cfg)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    assert!(out.exists());
    assert!(!dir.path().join("report.json").exists());
}

#[test]
fn failed_calibration_still_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.json");
    let cfg = CalibrationConfig {
        detections: Some(Detections::default()),
        output_path: Some(report_path.to_string_lossy().into_owned()),
        ..CalibrationConfig::default()
    };
    let cfg_path = dir.path().join("cfg.json");
    cfg.write_json(&cfg_path).unwrap();

    cmd()
        .arg("calibrate")
        .arg(&cfg_path)
        .assert()
        .code(2)
        .stderr(contains("calibration failed"));

    let report = CalibrationReport::load_json(&report_path).unwrap();
    assert!(report.result.is_none());
    assert!(report.error.is_some());

    cmd()
        .arg("score")
        .arg(&report_path)
        .arg("1,1")
        .assert()
        .failure()
        .stderr(contains("no calibration result"));
}

#[test]
fn rejects_malformed_tip() {
    cmd()
        .args(["score", "report.json", "12;4"])
        .assert()
        .failure()
        .stderr(contains("expected `x,y`"));
}
