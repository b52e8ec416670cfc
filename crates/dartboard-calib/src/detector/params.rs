use dartboard_core::OutlierStrategy;
use dartboard_registration::{IcpParams, RansacParams, SampleStrategy};
use serde::{Deserialize, Deserializer, Serialize};

/// Configuration for the calibrator.
///
/// Distances are in the normalized frame where the coarse board radius is 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// Seed for RANSAC sampling; `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Known camera roll applied to the template before ICP, degrees.
    ///
    /// ICP only resolves rotations within half a sector (+/- 9 degrees).
    pub initial_rotation_deg: f64,
    /// Filter applied to keypoint distances from the coarse centre.
    pub outlier_strategy: OutlierStrategy,
    /// Minimal number of keypoints surviving the coarse filter.
    pub min_keypoints: usize,
    pub icp: IcpParams,
    /// First RANSAC pass over the ICP correspondences.
    ///
    /// Fields missing from a config keep the coarse-pass defaults.
    #[serde(default = "coarse_defaults", deserialize_with = "coarse_pass")]
    pub ransac_coarse: RansacParams,
    /// Second RANSAC pass over the re-matched correspondences.
    ///
    /// Fields missing from a config keep the fine-pass defaults.
    #[serde(default = "fine_defaults", deserialize_with = "fine_pass")]
    pub ransac_fine: RansacParams,
    /// Matching radius used to re-pair the projected template after pass one.
    pub refine_distance: f64,
    /// Fewest final inliers accepted as a board fit.
    pub min_confidence: usize,
}

fn coarse_defaults() -> RansacParams {
    RansacParams {
        success_probability: 0.98,
        outlier_ratio: 0.6,
        inlier_threshold: 0.05,
        ..RansacParams::default()
    }
}

fn fine_defaults() -> RansacParams {
    RansacParams {
        success_probability: 0.98,
        outlier_ratio: 0.45,
        inlier_threshold: 0.02,
        ..RansacParams::default()
    }
}

/// Partially specified [`RansacParams`], laid over a pass-specific base.
#[derive(Deserialize)]
struct RansacOverrides {
    success_probability: Option<f64>,
    outlier_ratio: Option<f64>,
    inlier_threshold: Option<f64>,
    max_iterations: Option<usize>,
    sampling: Option<SampleStrategy>,
}

impl RansacOverrides {
    fn over(self, base: RansacParams) -> RansacParams {
        RansacParams {
            success_probability: self.success_probability.unwrap_or(base.success_probability),
            outlier_ratio: self.outlier_ratio.unwrap_or(base.outlier_ratio),
            inlier_threshold: self.inlier_threshold.unwrap_or(base.inlier_threshold),
            max_iterations: self.max_iterations.unwrap_or(base.max_iterations),
            sampling: self.sampling.unwrap_or(base.sampling),
        }
    }
}

fn coarse_pass<'de, D: Deserializer<'de>>(d: D) -> Result<RansacParams, D::Error> {
    Ok(RansacOverrides::deserialize(d)?.over(coarse_defaults()))
}

fn fine_pass<'de, D: Deserializer<'de>>(d: D) -> Result<RansacParams, D::Error> {
    Ok(RansacOverrides::deserialize(d)?.over(fine_defaults()))
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            seed: None,
            initial_rotation_deg: 0.0,
            outlier_strategy: OutlierStrategy::Iqr,
            min_keypoints: 4,
            icp: IcpParams::default(),
            ransac_coarse: coarse_defaults(),
            ransac_fine: fine_defaults(),
            refine_distance: 0.05,
            min_confidence: 20,
        }
    }
}

impl CalibrationParams {
    /// Same parameters with a fixed sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
