/// Errors returned by the calibrator.
#[derive(thiserror::Error, Debug)]
pub enum CalibrateError {
    #[error("no keypoints detected")]
    NoKeypoints,
    #[error("not enough keypoints after outlier rejection (found {found}, need {required})")]
    InsufficientKeypoints { found: usize, required: usize },
    #[error("Unable to find initial target")]
    InitialTargetNotFound,
    #[error("board fit supported by {inliers} inliers, {required} required")]
    LowConfidence { inliers: usize, required: usize },
    #[error("recovered board transform is degenerate")]
    DegenerateTransform,
    #[error("keypoint detector failed: {0}")]
    Detector(#[source] Box<dyn std::error::Error + Send + Sync>),
}
