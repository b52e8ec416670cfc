//! Dartboard calibration and scoring.
//!
//! Current focus:
//! - the board geometry model and score-zone lookup,
//! - calibration from detector keypoints to a board -> image homography,
//! - JSON configuration and reports for batch runs.
//!
//! Numeric building blocks live in `dartboard-core` and
//! `dartboard-registration`.
//!
//! ```no_run
//! use dartboard_calib::{Board, BoardRadii, CalibrationParams, Calibrator, Detections};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let board = Board::new(BoardRadii::default())?;
//! let calibrator = Calibrator::new(board.clone(), CalibrationParams::default().with_seed(1));
//! let detections: Detections = serde_json::from_str(&std::fs::read_to_string("det.json")?)?;
//! let result = calibrator.calibrate(&detections)?;
//! let zones = result.score(&board, &[result.center]);
//! println!("{zones:?}");
//! # Ok(())
//! # }
//! ```

mod board;
mod detector;
mod io;
mod score;

pub use board::{Board, BoardError, BoardRadii, SECTOR_ORDER, SECTOR_WIDTH_DEG};
pub use detector::{
    BBox, CalibrateError, CalibrationParams, CalibrationResult, Calibrator, Detections,
    KeypointDetector,
};
pub use io::{CalibrationConfig, CalibrationReport, ConfigError, IoError};
pub use score::{ScoreZone, ScoreZoneParseError};

pub use dartboard_core::{Homography, OutlierStrategy};
pub use dartboard_registration::{IcpParams, PairRejection, RansacParams, SampleStrategy};
