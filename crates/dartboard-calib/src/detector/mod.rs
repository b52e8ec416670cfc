//! Board calibration pipeline.
//!
//! This module turns noisy keypoint detections (ring/sector intersections and
//! bull bounding boxes) into a board -> image homography: coarse normalization,
//! ICP against the board template, two RANSAC passes and a least-squares refit.

mod error;
mod params;
mod pipeline;
mod result;

pub use error::CalibrateError;
pub use params::CalibrationParams;
pub use pipeline::{BBox, Calibrator, Detections, KeypointDetector};
pub use result::CalibrationResult;
