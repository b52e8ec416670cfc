//! Generic, model-agnostic RANSAC.
//!
//! Implement [`Model`] for a geometric model and call [`ransac`] with the data,
//! some [`RansacParams`] and a random-number generator. The number of trials is
//! derived from the requested success probability and the assumed outlier
//! ratio; there is no early exit. Failure to find a consensus is reported as
//! `None`, never as a panic.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A model that can be built from a minimal sample and scored on all data.
pub trait Model {
    /// One datum, e.g. a point or a correspondence.
    type Sample;
    /// Model parameters produced by [`Model::build`].
    type Fit: Clone;

    /// Minimal number of samples needed to build a model.
    const MIN_SAMPLES: usize;

    /// Build a model from `data[sample[0]], data[sample[1]], ...`.
    ///
    /// Return `None` if the sample is degenerate; this is expected to happen on
    /// many trials and must be cheap.
    fn build(&self, data: &[Self::Sample], sample: &[usize]) -> Option<Self::Fit>;

    /// Non-negative residual of every datum under `fit`, written into `out`
    /// (cleared first) in data order.
    fn residuals(&self, fit: &Self::Fit, data: &[Self::Sample], out: &mut Vec<f64>);
}

/// How minimal samples are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SampleStrategy {
    /// Independent uniform indices; a sample may repeat an index.
    WithReplacement,
    /// Distinct indices.
    #[default]
    WithoutReplacement,
}

/// RANSAC parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Probability of drawing at least one all-inlier sample, in `(0, 1)`.
    pub success_probability: f64,
    /// Assumed fraction of outliers in the data, in `[0, 1)`.
    pub outlier_ratio: f64,
    /// A datum is an inlier when `residual^2 < inlier_threshold^2`.
    pub inlier_threshold: f64,
    /// Upper bound on the derived trial count.
    pub max_iterations: usize,
    pub sampling: SampleStrategy,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            success_probability: 0.98,
            outlier_ratio: 0.6,
            inlier_threshold: 0.05,
            max_iterations: 10_000,
            sampling: SampleStrategy::WithoutReplacement,
        }
    }
}

impl RansacParams {
    /// Number of trials these parameters ask for with `min_samples`-sized samples.
    pub fn iterations(&self, min_samples: usize) -> usize {
        iteration_count(
            self.success_probability,
            self.outlier_ratio,
            min_samples,
            self.max_iterations,
        )
    }
}

/// `ceil(ln(1 - p) / ln(1 - (1 - outlier_ratio)^n))`, clamped to `[1, cap]`.
pub fn iteration_count(
    success_probability: f64,
    outlier_ratio: f64,
    min_samples: usize,
    cap: usize,
) -> usize {
    let cap = cap.max(1);
    let all_inliers = (1.0 - outlier_ratio).clamp(0.0, 1.0).powi(min_samples as i32);
    if success_probability <= 0.0 || all_inliers >= 1.0 {
        return 1;
    }
    let n = (1.0 - success_probability).ln() / (1.0 - all_inliers).ln();
    if !n.is_finite() || n >= cap as f64 {
        return cap;
    }
    (n.ceil() as usize).clamp(1, cap)
}

/// Best model found by [`ransac`].
#[derive(Clone, Debug)]
pub struct RansacFit<F> {
    pub fit: F,
    /// The minimal sample the model was built from.
    pub sample: Vec<usize>,
    /// Indices of inlier data.
    pub inliers: Vec<usize>,
    /// Mean residual over the inliers.
    pub mean_error: f64,
    /// Trials performed.
    pub iterations: usize,
}

impl<F> RansacFit<F> {
    #[inline]
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }
}

fn draw_sample<R: Rng + ?Sized>(
    rng: &mut R,
    n: usize,
    strategy: SampleStrategy,
    out: &mut [usize],
) {
    match strategy {
        SampleStrategy::WithReplacement => {
            for slot in out.iter_mut() {
                *slot = rng.random_range(0..n);
            }
        }
        SampleStrategy::WithoutReplacement => {
            let picked = rand::seq::index::sample(rng, n, out.len());
            for (slot, idx) in out.iter_mut().zip(picked.iter()) {
                *slot = idx;
            }
        }
    }
}

/// Run RANSAC for `model` over `data`.
///
/// Returns `None` when `data` holds fewer than `M::MIN_SAMPLES` items or no
/// trial reached `M::MIN_SAMPLES` inliers. Among the other trials the winner
/// has the most inliers, ties going to the lower mean inlier residual.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(n = data.len(), min = M::MIN_SAMPLES))
)]
pub fn ransac<M, R>(
    model: &M,
    data: &[M::Sample],
    params: &RansacParams,
    rng: &mut R,
) -> Option<RansacFit<M::Fit>>
where
    M: Model,
    R: Rng + ?Sized,
{
    let n = data.len();
    if M::MIN_SAMPLES == 0 || n < M::MIN_SAMPLES {
        return None;
    }

    let iterations = params.iterations(M::MIN_SAMPLES);
    let thresh_sq = params.inlier_threshold * params.inlier_threshold;

    let mut sample = vec![0usize; M::MIN_SAMPLES];
    let mut residuals = Vec::with_capacity(n);
    let mut best: Option<(M::Fit, Vec<usize>, usize, f64)> = None;

    for _ in 0..iterations {
        draw_sample(rng, n, params.sampling, &mut sample);

        let Some(fit) = model.build(data, &sample) else {
            continue;
        };
        model.residuals(&fit, data, &mut residuals);

        let mut count = 0usize;
        let mut sum = 0.0;
        for &r in &residuals {
            if r * r < thresh_sq {
                count += 1;
                sum += r;
            }
        }
        if count < M::MIN_SAMPLES {
            continue;
        }
        let mean = sum / count as f64;

        let better = match &best {
            None => true,
            Some((_, _, best_count, best_mean)) => {
                count > *best_count || (count == *best_count && mean < *best_mean)
            }
        };
        if better {
            best = Some((fit, sample.clone(), count, mean));
        }
    }

    let (fit, sample, count, mean_error) = best?;
    model.residuals(&fit, data, &mut residuals);
    let inliers: Vec<usize> = residuals
        .iter()
        .enumerate()
        .filter(|(_, &r)| r * r < thresh_sq)
        .map(|(i, _)| i)
        .collect();
    debug_assert_eq!(inliers.len(), count);

    log::debug!(
        "ransac: {count}/{n} inliers, mean error {mean_error:.4e}, {iterations} trials"
    );

    Some(RansacFit {
        fit,
        sample,
        inliers,
        mean_error,
        iterations,
    })
}
