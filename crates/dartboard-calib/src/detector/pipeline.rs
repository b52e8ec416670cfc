use super::{CalibrateError, CalibrationParams, CalibrationResult};
use crate::board::Board;
use dartboard_core::{
    centroid, distance, estimate_homography, match_within, retain_except, rotation_matrix,
    Correspondence, Homography,
};
use dartboard_registration::{icp, ransac, Model, ProjectiveBoardFit, RansacFit};
use nalgebra::{Matrix3, Point2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Axis-aligned box `[x1, y1, x2, y2]` in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(0.5 * (self.x1 + self.x2), 0.5 * (self.y1 + self.y2))
    }

    fn is_finite(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self::new(x1, y1, x2, y2)
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Keypoints produced by an external detector, in pixels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Detections {
    /// Sector-boundary / ring-edge intersections. Order carries no meaning.
    pub cross_points: Vec<Point2<f64>>,
    pub outer_bull_box: Option<BBox>,
    pub inner_bull_box: Option<BBox>,
}

/// Source of [`Detections`], typically a neural network over a camera frame.
pub trait KeypointDetector {
    type Image: ?Sized;
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(&mut self, image: &Self::Image) -> Result<Detections, Self::Error>;
}

/// Registers the board template against detected keypoints.
#[derive(Clone, Debug)]
pub struct Calibrator {
    board: Board,
    params: CalibrationParams,
}

/// Detections mapped into the normalized frame `(p - center) / radius`.
struct Normalized {
    points: Vec<Point2<f64>>,
    center: Point2<f64>,
    radius: f64,
}

impl Normalized {
    /// Normalized -> pixel.
    fn denormalization(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.radius, 0.0, self.center.x, //
            0.0, self.radius, self.center.y, //
            0.0, 0.0, 1.0,
        )
    }
}

impl Calibrator {
    pub fn new(board: Board, params: CalibrationParams) -> Self {
        Self { board, params }
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    /// Calibrate from detections, seeding the sampler from `params.seed`.
    pub fn calibrate(&self, detections: &Detections) -> Result<CalibrationResult, CalibrateError> {
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.calibrate_with_rng(detections, &mut rng)
    }

    /// Run the detector on `image`, then calibrate.
    pub fn calibrate_with<D: KeypointDetector>(
        &self,
        detector: &mut D,
        image: &D::Image,
    ) -> Result<CalibrationResult, CalibrateError> {
        let detections = detector
            .detect(image)
            .map_err(|e| CalibrateError::Detector(Box::new(e)))?;
        self.calibrate(&detections)
    }

    /// Calibrate with an explicit random source.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip_all,
            fields(cross_points = detections.cross_points.len())
        )
    )]
    pub fn calibrate_with_rng<R: Rng + ?Sized>(
        &self,
        detections: &Detections,
        rng: &mut R,
    ) -> Result<CalibrationResult, CalibrateError> {
        let normalized = self.normalize(detections)?;
        let template = self.board.normalized_cross_points();
        let model = ProjectiveBoardFit::new(&template, &normalized.points);

        // ICP on the rotated template; indices are shared with the unrotated one.
        let rot = rotation_matrix(self.params.initial_rotation_deg);
        let moving: Vec<Point2<f64>> = template
            .iter()
            .map(|p| Point2::from(rot * p.coords))
            .collect();
        let registration = icp(&normalized.points, &moving, &self.params.icp);
        log::debug!(
            "icp: {:?} after {} iterations, {} correspondences",
            registration.termination,
            registration.iterations,
            registration.correspondences.len()
        );

        let coarse_data = registration.correspondences;
        let coarse = ransac(&model, &coarse_data, &self.params.ransac_coarse, rng)
            .ok_or(CalibrateError::InitialTargetNotFound)?;
        log::debug!(
            "coarse ransac: {}/{} inliers",
            coarse.inlier_count(),
            coarse_data.len()
        );

        let fine_data = refine_correspondences(&model, &coarse.fit, self.params.refine_distance);
        let (fit, data) = match ransac(&model, &fine_data, &self.params.ransac_fine, rng) {
            Some(fine) => {
                log::debug!(
                    "fine ransac: {}/{} inliers",
                    fine.inlier_count(),
                    fine_data.len()
                );
                (fine, fine_data)
            }
            None => {
                log::warn!("fine ransac found no model, keeping the coarse one");
                (coarse, coarse_data)
            }
        };

        let confidence = fit.inlier_count();
        if confidence < self.params.min_confidence {
            log::warn!(
                "board fit rejected: {confidence} inliers, {} required",
                self.params.min_confidence
            );
            return Err(CalibrateError::LowConfidence {
                inliers: confidence,
                required: self.params.min_confidence,
            });
        }

        let (h_norm, mean_error) = refit(&model, &fit, &data);
        self.finish(&normalized, &h_norm, confidence, mean_error)
    }

    /// Coarse centre and radius, outlier rejection and normalization.
    fn normalize(&self, detections: &Detections) -> Result<Normalized, CalibrateError> {
        let points = &detections.cross_points;
        if points.is_empty() {
            return Err(CalibrateError::NoKeypoints);
        }

        let center = detections
            .outer_bull_box
            .filter(BBox::is_finite)
            .or(detections.inner_bull_box.filter(BBox::is_finite))
            .map(|b| b.center())
            .or_else(|| centroid(points))
            .ok_or(CalibrateError::NoKeypoints)?;

        let distances: Vec<f64> = points.iter().map(|p| distance(p, &center)).collect();
        let rejected = self.params.outlier_strategy.outlier_indices(&distances);
        let kept = retain_except(points, &rejected);
        let kept_distances = retain_except(&distances, &rejected);
        log::debug!(
            "coarse filter: kept {}/{} keypoints around ({:.1}, {:.1})",
            kept.len(),
            points.len(),
            center.x,
            center.y
        );

        let required = self.params.min_keypoints.max(ProjectiveBoardFit::MIN_SAMPLES);
        if kept.len() < required {
            return Err(CalibrateError::InsufficientKeypoints {
                found: kept.len(),
                required,
            });
        }

        let radius = kept_distances.iter().copied().fold(0.0, f64::max);
        if !radius.is_finite() || radius <= f64::EPSILON {
            return Err(CalibrateError::DegenerateTransform);
        }

        let points = kept
            .iter()
            .map(|p| Point2::from((p - center) / radius))
            .collect();
        Ok(Normalized {
            points,
            center,
            radius,
        })
    }

    /// Map a normalized-template -> normalized-image homography to board -> pixels.
    fn finish(
        &self,
        normalized: &Normalized,
        h_norm: &Homography,
        confidence: usize,
        mean_error: f64,
    ) -> Result<CalibrationResult, CalibrateError> {
        let s = 1.0 / self.board.radii().r_double;
        let board_to_template = Homography::new(Matrix3::new(
            s, 0.0, 0.0, //
            0.0, s, 0.0, //
            0.0, 0.0, 1.0,
        ));
        let transform = Homography::new(normalized.denormalization())
            .compose(h_norm)
            .and_then(|h| h.compose(&board_to_template))
            .filter(Homography::is_regular)
            .ok_or(CalibrateError::DegenerateTransform)?;

        let mut calibration_points = [Point2::origin(); 4];
        for (dst, p) in calibration_points
            .iter_mut()
            .zip(self.board.calibration_points())
        {
            *dst = transform
                .apply(p)
                .ok_or(CalibrateError::DegenerateTransform)?;
        }
        let center = transform
            .apply(&Point2::origin())
            .ok_or(CalibrateError::DegenerateTransform)?;

        log::debug!(
            "calibrated: {confidence} inliers, mean error {mean_error:.4e}, bull at ({:.1}, {:.1})",
            center.x,
            center.y
        );

        Ok(CalibrationResult {
            calibration_points,
            transform,
            confidence,
            mean_error,
            center,
        })
    }
}

/// Re-pair the template with the detections after projecting it through `h`.
fn refine_correspondences(
    model: &ProjectiveBoardFit<'_>,
    h: &Homography,
    max_distance: f64,
) -> Vec<Correspondence> {
    let (index, projected): (Vec<usize>, Vec<Point2<f64>>) = model
        .project(h)
        .into_iter()
        .enumerate()
        .filter_map(|(i, p)| p.map(|p| (i, p)))
        .unzip();
    match_within(&projected, model.destinations, max_distance)
        .into_iter()
        .map(|c| Correspondence::new(index[c.source], c.dest))
        .collect()
}

/// Least-squares refit over the inliers of `fit`.
///
/// Returns the refined homography and its mean inlier residual, or the RANSAC
/// model unchanged if the refit is singular.
fn refit(
    model: &ProjectiveBoardFit<'_>,
    fit: &RansacFit<Homography>,
    data: &[Correspondence],
) -> (Homography, f64) {
    let (src, dst): (Vec<Point2<f64>>, Vec<Point2<f64>>) = fit
        .inliers
        .iter()
        .map(|&i| (model.template[data[i].source], model.destinations[data[i].dest]))
        .unzip();

    let Some(h) = estimate_homography(&src, &dst) else {
        log::warn!("least-squares refit failed, keeping the RANSAC model");
        return (fit.fit, fit.mean_error);
    };

    let residuals: Option<Vec<f64>> = src
        .iter()
        .zip(&dst)
        .map(|(s, d)| h.apply(s).map(|p| distance(&p, d)))
        .collect();
    match residuals {
        Some(r) if !r.is_empty() => (h, r.iter().sum::<f64>() / r.len() as f64),
        _ => (fit.fit, fit.mean_error),
    }
}
