use dartboard_core::Homography;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::score::ScoreZone;

/// Output of a calibration run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Images of [`Board::calibration_points`] (top, right, bottom, left), pixels.
    pub calibration_points: [Point2<f64>; 4],
    /// Board (meters) -> image (pixels).
    pub transform: Homography,
    /// Number of inlier keypoints supporting `transform`.
    pub confidence: usize,
    /// Mean inlier residual in the normalized frame.
    pub mean_error: f64,
    /// Image of the bull, pixels.
    pub center: Point2<f64>,
}

impl CalibrationResult {
    /// Map a board point into the image.
    pub fn board_to_image(&self, p: &Point2<f64>) -> Option<Point2<f64>> {
        self.transform.apply(p)
    }

    /// Map an image point onto the board.
    pub fn image_to_board(&self, p: &Point2<f64>) -> Option<Point2<f64>> {
        self.transform.inverse()?.apply(p)
    }

    /// Score dart tips given in pixels.
    pub fn score(&self, board: &Board, tips: &[Point2<f64>]) -> Option<Vec<ScoreZone>> {
        board.get_dart_scores(&self.calibration_points, tips)
    }
}
