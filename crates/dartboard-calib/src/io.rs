//! JSON configuration and report helpers for board calibration.

use crate::{
    Board, BoardError, BoardRadii, CalibrateError, CalibrationParams, CalibrationResult,
    Calibrator, Detections,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("config has neither `detections` nor `detections_path`")]
    MissingDetections,
}

fn load<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T, IoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// Input for a calibration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// JSON file holding [`Detections`]; relative paths resolve against the
    /// config file's directory.
    #[serde(default)]
    pub detections_path: Option<String>,
    /// Inline detections, used when `detections_path` is absent.
    #[serde(default)]
    pub detections: Option<Detections>,
    #[serde(default)]
    pub board: BoardRadii,
    #[serde(default)]
    pub params: CalibrationParams,
    #[serde(default)]
    pub output_path: Option<String>,
}

impl CalibrationConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        load(path)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        write(self, path)
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("dartboard_calibration_report.json"))
    }

    /// Build a validated board from the config.
    pub fn build_board(&self) -> Result<Board, ConfigError> {
        Ok(Board::new(self.board)?)
    }

    /// Build a calibrator from this config.
    pub fn build_calibrator(&self) -> Result<Calibrator, ConfigError> {
        Ok(Calibrator::new(self.build_board()?, self.params.clone()))
    }

    /// Detections from `detections_path` (relative to `base_dir`) or inline.
    pub fn load_detections(&self, base_dir: &Path) -> Result<Detections, ConfigError> {
        match (&self.detections_path, &self.detections) {
            (Some(path), _) => Ok(load(base_dir.join(path))?),
            (None, Some(inline)) => Ok(inline.clone()),
            (None, None) => Err(ConfigError::MissingDetections),
        }
    }
}

/// Outcome of a calibration run, as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub config_path: String,
    pub board: BoardRadii,
    pub num_cross_points: usize,
    #[serde(default)]
    pub result: Option<CalibrationResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CalibrationReport {
    /// Build a base report from the input config.
    pub fn new(cfg: &CalibrationConfig, config_path: &Path, detections: &Detections) -> Self {
        Self {
            config_path: config_path.to_string_lossy().into_owned(),
            board: cfg.board,
            num_cross_points: detections.cross_points.len(),
            result: None,
            error: None,
        }
    }

    /// Populate the report from a successful calibration.
    pub fn set_result(&mut self, res: CalibrationResult) {
        self.result = Some(res);
        self.error = None;
    }

    /// Record a calibration error.
    pub fn set_error(&mut self, err: &CalibrateError) {
        self.result = None;
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, IoError> {
        load(path)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), IoError> {
        write(self, path)
    }
}
