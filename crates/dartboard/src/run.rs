//! Config-file driven calibration and scoring.

use crate::calib::{BoardError, ConfigError, IoError};
use crate::{Board, CalibrateError, CalibrationConfig, CalibrationReport, ScoreZone};
use nalgebra::Point2;
use std::path::{Path, PathBuf};

/// Errors produced by the file-based helpers.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Calibrate(#[from] CalibrateError),

    #[error("report {0} holds no calibration result")]
    NoResult(PathBuf),

    #[error("calibration points do not define a board transform")]
    DegenerateCalibration,
}

/// Outcome of [`calibrate_config`].
#[derive(Debug)]
pub struct CalibrationRun {
    pub report: CalibrationReport,
    pub output_path: PathBuf,
}

/// Load `config_path`, calibrate and write the report.
///
/// A failed calibration is recorded in the report (and still written); only
/// configuration and I/O problems are returned as errors. `seed` overrides the
/// seed from the config.
pub fn calibrate_config(
    config_path: &Path,
    seed: Option<u64>,
    output_override: Option<&Path>,
) -> Result<CalibrationRun, RunError> {
    let mut cfg = CalibrationConfig::load_json(config_path)?;
    if seed.is_some() {
        cfg.params.seed = seed;
    }

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let detections = cfg.load_detections(base_dir)?;
    let calibrator = cfg.build_calibrator()?;

    let mut report = CalibrationReport::new(&cfg, config_path, &detections);
    match calibrator.calibrate(&detections) {
        Ok(res) => {
            log::info!(
                "calibrated with {} inliers, bull at ({:.1}, {:.1})",
                res.confidence,
                res.center.x,
                res.center.y
            );
            report.set_result(res);
        }
        Err(err) => {
            log::warn!("calibration failed: {err}");
            report.set_error(&err);
        }
    }

    let output_path = output_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cfg.output_path());
    report.write_json(&output_path)?;

    Ok(CalibrationRun {
        report,
        output_path,
    })
}

/// Score pixel-space dart tips against a stored calibration report.
pub fn score_report(report_path: &Path, tips: &[Point2<f64>]) -> Result<Vec<ScoreZone>, RunError> {
    let report = CalibrationReport::load_json(report_path)?;
    let result = report
        .result
        .ok_or_else(|| RunError::NoResult(report_path.to_path_buf()))?;
    let board = Board::new(report.board)?;
    result
        .score(&board, tips)
        .ok_or(RunError::DegenerateCalibration)
}
