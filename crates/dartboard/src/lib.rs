//! High-level facade crate for the `dartboard-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying crates
//! - [`run`]: file-based helpers that load a calibration config, calibrate and
//!   score, as used by the `dartcal` command-line tool (feature `cli`).
//!
//! ## Quickstart
//!
//! ```no_run
//! use dartboard::{Board, BoardRadii, CalibrationParams, Calibrator, Detections};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let board = Board::new(BoardRadii::default())?;
//! let calibrator = Calibrator::new(board.clone(), CalibrationParams::default());
//! let detections = Detections::default(); // from your keypoint detector
//! match calibrator.calibrate(&detections) {
//!     Ok(res) => println!("bull at {:?}", res.center),
//!     Err(e) => eprintln!("calibration failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `dartboard::core`: geometry kernel, homographies, matching, outlier filters.
//! - `dartboard::registration`: ICP and the generic RANSAC driver with its models.
//! - `dartboard::calib`: board model, score zones, the calibrator and JSON I/O.

pub use dartboard_calib as calib;
pub use dartboard_core as core;
pub use dartboard_registration as registration;

pub use dartboard_calib::{
    BBox, Board, BoardRadii, CalibrateError, CalibrationConfig, CalibrationParams,
    CalibrationReport, CalibrationResult, Calibrator, Detections, KeypointDetector, ScoreZone,
};
pub use dartboard_core::{Homography, Point2};

pub mod run;
