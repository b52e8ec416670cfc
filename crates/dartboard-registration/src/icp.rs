//! Rigid point-to-point ICP.
//!
//! Each iteration matches every moving point to its nearest reference point,
//! keeps pairs closer than `distance_threshold` (optionally pruned by MAD),
//! solves the closed-form 2D Procrustes problem and moves *all* moving points.
//! The loop stops on convergence, on lack of support, or after
//! `max_iterations`.

use dartboard_core::{
    find_nearest_neighbors_into, mad_outlier_indices, retain_except, Correspondence, Neighbor,
    RigidTransform2D,
};
use nalgebra::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// MAD pruning only runs when at least this many pairs pass the hard threshold.
pub const MIN_PAIRS_FOR_MAD: usize = 4;

/// Rejection applied to nearest-neighbour pairs after the distance threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PairRejection {
    /// Distance threshold only.
    #[default]
    Threshold,
    /// Additionally drop pairs farther than `median + k * MAD`.
    Mad { k: f64 },
}

/// ICP parameters. Distances are in the units of the input point sets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpParams {
    pub max_iterations: usize,
    /// Pairs at or beyond this distance are ignored.
    pub distance_threshold: f64,
    /// Stop when both translation components of a step fall below this.
    pub convergence_translation: f64,
    /// Stop when the step rotation (radians) falls below this.
    pub convergence_rotation: f64,
    /// Minimal number of pairs needed to compute a step.
    pub point_pairs_threshold: usize,
    pub pair_rejection: PairRejection,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            distance_threshold: 0.3,
            convergence_translation: 1e-4,
            convergence_rotation: 1e-4,
            point_pairs_threshold: 4,
            pair_rejection: PairRejection::Threshold,
        }
    }
}

/// Why the ICP loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcpTermination {
    Converged,
    InsufficientSupport,
    NoSolution,
    MaxIterations,
}

/// Output of [`icp`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IcpResult {
    /// Moving points after the accumulated motion.
    pub aligned: Vec<Point2<f64>>,
    /// Pairs (moving index, reference index) used by the last applied step.
    pub correspondences: Vec<Correspondence>,
    /// Accumulated motion taking the input moving points onto `aligned`.
    pub transform: RigidTransform2D,
    /// Incremental step of every iteration, in order.
    pub history: Vec<RigidTransform2D>,
    pub iterations: usize,
    pub termination: IcpTermination,
}

impl IcpResult {
    pub fn converged(&self) -> bool {
        self.termination == IcpTermination::Converged
    }
}

/// Least-squares rigid motion taking `source[i]` onto `target[i]`.
///
/// Closed form: with centred coordinates `a = p - p_mean`, `b = q - q_mean`,
/// `theta = atan2(sum(a x b), sum(a . b))` and `t = q_mean - R p_mean`.
/// Returns `None` for empty or mismatched input or a non-finite result.
pub fn best_rigid_transform(
    source: &[Point2<f64>],
    target: &[Point2<f64>],
) -> Option<RigidTransform2D> {
    if source.is_empty() || source.len() != target.len() {
        return None;
    }
    let n = source.len() as f64;
    let (mut px, mut py, mut qx, mut qy) = (0.0, 0.0, 0.0, 0.0);
    for (p, q) in source.iter().zip(target) {
        px += p.x;
        py += p.y;
        qx += q.x;
        qy += q.y;
    }
    px /= n;
    py /= n;
    qx /= n;
    qy /= n;

    let mut dot = 0.0;
    let mut cross = 0.0;
    for (p, q) in source.iter().zip(target) {
        let (ax, ay) = (p.x - px, p.y - py);
        let (bx, by) = (q.x - qx, q.y - qy);
        dot += ax * bx + ay * by;
        cross += ax * by - ay * bx;
    }

    let theta = cross.atan2(dot);
    let (s, c) = theta.sin_cos();
    let tx = qx - (c * px - s * py);
    let ty = qy - (s * px + c * py);

    (theta.is_finite() && tx.is_finite() && ty.is_finite())
        .then_some(RigidTransform2D::new(theta, tx, ty))
}

fn collect_pairs(
    neighbors: &[Option<Neighbor>],
    params: &IcpParams,
    pairs: &mut Vec<Correspondence>,
) {
    pairs.clear();
    let mut distances = Vec::new();
    for (i, n) in neighbors.iter().enumerate() {
        if let Some(n) = n.filter(|n| n.distance < params.distance_threshold) {
            pairs.push(Correspondence::new(i, n.index));
            distances.push(n.distance);
        }
    }

    if let PairRejection::Mad { k } = params.pair_rejection {
        if pairs.len() >= MIN_PAIRS_FOR_MAD {
            let rejected = mad_outlier_indices(&distances, k);
            if !rejected.is_empty() {
                *pairs = retain_except(pairs, &rejected);
            }
        }
    }
}

/// Align `moving` onto `reference`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip_all,
        fields(reference = reference.len(), moving = moving.len())
    )
)]
pub fn icp(reference: &[Point2<f64>], moving: &[Point2<f64>], params: &IcpParams) -> IcpResult {
    let mut aligned = moving.to_vec();
    let mut cumulative = Matrix3::<f64>::identity();
    let mut history = Vec::new();
    let mut correspondences = Vec::new();
    let mut termination = IcpTermination::MaxIterations;

    let mut neighbors = Vec::with_capacity(moving.len());
    let mut pairs = Vec::with_capacity(moving.len());
    let mut src = Vec::with_capacity(moving.len());
    let mut dst = Vec::with_capacity(moving.len());

    for iteration in 0..params.max_iterations {
        find_nearest_neighbors_into(&aligned, reference, &mut neighbors);
        collect_pairs(&neighbors, params, &mut pairs);

        if pairs.len() < params.point_pairs_threshold {
            log::debug!(
                "icp: {} pairs < {} at iteration {iteration}",
                pairs.len(),
                params.point_pairs_threshold
            );
            termination = IcpTermination::InsufficientSupport;
            break;
        }

        src.clear();
        dst.clear();
        for c in &pairs {
            src.push(aligned[c.source]);
            dst.push(reference[c.dest]);
        }
        let Some(step) = best_rigid_transform(&src, &dst) else {
            termination = IcpTermination::NoSolution;
            break;
        };

        for p in aligned.iter_mut() {
            *p = step.apply(p);
        }
        cumulative = step.to_matrix() * cumulative;
        history.push(step);
        std::mem::swap(&mut correspondences, &mut pairs);

        if step.theta.abs() < params.convergence_rotation
            && step.tx.abs() < params.convergence_translation
            && step.ty.abs() < params.convergence_translation
        {
            termination = IcpTermination::Converged;
            break;
        }
        log::trace!(
            "icp step {iteration}: dtheta={:.3e} dt=({:.3e}, {:.3e})",
            step.theta,
            step.tx,
            step.ty
        );
    }

    IcpResult {
        aligned,
        correspondences,
        transform: RigidTransform2D::from_matrix(&cumulative),
        iterations: history.len(),
        history,
        termination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Two concentric rings with different point counts, so no rotation by a
    /// small angle maps the set onto itself.
    fn template() -> Vec<Point2<f64>> {
        let ring = |r: f64, n: usize, phase: f64| {
            (0..n).map(move |k| {
                let a = phase + 2.0 * PI * k as f64 / n as f64;
                Point2::new(r * a.cos(), r * a.sin())
            })
        };
        ring(1.0, 12, 0.0).chain(ring(0.5, 7, 0.2)).collect()
    }

    #[test]
    fn recovers_known_rigid_motion() {
        let truth = RigidTransform2D::new(4f64.to_radians(), 0.03, -0.02);
        let moving = template();
        let reference: Vec<_> = moving.iter().map(|p| truth.apply(p)).collect();

        let res = icp(&reference, &moving, &IcpParams::default());
        assert!(res.converged(), "termination = {:?}", res.termination);
        assert!(res.iterations < IcpParams::default().max_iterations);
        assert_relative_eq!(res.transform.theta, truth.theta, epsilon = 1e-6);
        assert_relative_eq!(res.transform.tx, truth.tx, epsilon = 1e-6);
        assert_relative_eq!(res.transform.ty, truth.ty, epsilon = 1e-6);
        for (a, r) in res.aligned.iter().zip(&reference) {
            assert_relative_eq!(*a, *r, epsilon = 1e-6);
        }
        assert_eq!(res.correspondences.len(), moving.len());
        assert!(res.correspondences.iter().all(|c| c.source == c.dest));
    }

    #[test]
    fn accumulated_transform_matches_history() {
        let truth = RigidTransform2D::new(-3f64.to_radians(), -0.04, 0.01);
        let moving = template();
        let reference: Vec<_> = moving.iter().map(|p| truth.apply(p)).collect();
        let res = icp(&reference, &moving, &IcpParams::default());

        let composed = res
            .history
            .iter()
            .fold(RigidTransform2D::IDENTITY, |acc, step| step.compose(&acc));
        assert_relative_eq!(composed.theta, res.transform.theta, epsilon = 1e-12);
        assert_relative_eq!(composed.tx, res.transform.tx, epsilon = 1e-12);
    }

    #[test]
    fn stops_without_support() {
        let moving = template();
        let reference: Vec<_> = moving
            .iter()
            .map(|p| Point2::new(p.x + 10.0, p.y))
            .collect();

        let res = icp(&reference, &moving, &IcpParams::default());
        assert_eq!(res.termination, IcpTermination::InsufficientSupport);
        assert_eq!(res.iterations, 0);
        assert!(res.correspondences.is_empty());
        assert_eq!(res.aligned, moving);
        assert_eq!(res.transform, RigidTransform2D::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn empty_reference_is_not_a_panic() {
        let res = icp(&[], &template(), &IcpParams::default());
        assert_eq!(res.termination, IcpTermination::InsufficientSupport);

        let params = IcpParams {
            point_pairs_threshold: 0,
            ..IcpParams::default()
        };
        let res = icp(&[], &template(), &params);
        assert_eq!(res.termination, IcpTermination::NoSolution);
    }

    #[test]
    fn mad_rejection_ignores_a_stray_reference_point() {
        let truth = RigidTransform2D::new(2f64.to_radians(), 0.01, 0.02);
        let moving = template();
        let mut reference: Vec<_> = moving.iter().map(|p| truth.apply(p)).collect();
        // Displace one reference point inside the threshold.
        reference[0].x += 0.2;

        let params = IcpParams {
            pair_rejection: PairRejection::Mad { k: 2.5 },
            ..IcpParams::default()
        };
        let res = icp(&reference, &moving, &params);
        assert!(res.converged());
        assert!(res.correspondences.iter().all(|c| c.source != 0));
        assert_relative_eq!(res.transform.theta, truth.theta, epsilon = 1e-6);
    }

    #[test]
    fn mad_rejection_needs_four_pairs() {
        let moving = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let mut reference = moving;
        // Within the hard threshold, but far above median + k * MAD of [0, 0, 0.15].
        reference[2].x += 0.15;

        let params = IcpParams {
            pair_rejection: PairRejection::Mad { k: 2.5 },
            point_pairs_threshold: 3,
            ..IcpParams::default()
        };
        let res = icp(&reference, &moving, &params);
        assert_ne!(res.termination, IcpTermination::InsufficientSupport);
        assert_eq!(res.correspondences.len(), 3);
        assert!(res.correspondences.iter().all(|c| c.source == c.dest));
    }

    #[test]
    fn pair_collection_applies_mad_from_four_pairs() {
        let neighbor = |index, distance| Some(Neighbor { index, distance });
        let params = IcpParams {
            pair_rejection: PairRejection::Mad { k: 2.5 },
            ..IcpParams::default()
        };
        let mut pairs = Vec::new();

        let three = [neighbor(0, 0.0), neighbor(1, 0.0), neighbor(2, 0.15)];
        collect_pairs(&three, &params, &mut pairs);
        assert_eq!(pairs.len(), 3);

        let four = [
            neighbor(0, 0.0),
            neighbor(1, 0.0),
            neighbor(2, 0.0),
            neighbor(3, 0.15),
        ];
        collect_pairs(&four, &params, &mut pairs);
        assert_eq!(MIN_PAIRS_FOR_MAD, 4);
        assert_eq!(
            pairs,
            vec![
                Correspondence::new(0, 0),
                Correspondence::new(1, 1),
                Correspondence::new(2, 2)
            ]
        );
    }

    #[test]
    fn procrustes_rejects_empty_input() {
        assert!(best_rigid_transform(&[], &[]).is_none());
        let one = [Point2::new(1.0, 2.0)];
        let t = best_rigid_transform(&one, &[Point2::new(3.0, 5.0)]).unwrap();
        assert_relative_eq!(t.theta, 0.0);
        assert_relative_eq!(t.tx, 2.0);
        assert_relative_eq!(t.ty, 3.0);
    }
}
