use dartboard_core::{
    distance, get_perspective_transform, nearest_neighbor, Correspondence, Homography, Neighbor,
};
use nalgebra::Point2;

use crate::ransac::Model;

/// Residual given to pairs whose projection collides with another template
/// point or cannot be computed.
pub const PENALTY: f64 = 10_000.0;

/// Homography between a template point set and a destination point set, fitted
/// from template -> destination correspondences.
///
/// Scoring projects the *whole* template and matches it to the destinations, so
/// a model that folds several template points onto a single destination is
/// punished even when the folded pairs themselves look close.
#[derive(Clone, Copy, Debug)]
pub struct ProjectiveBoardFit<'a> {
    pub template: &'a [Point2<f64>],
    pub destinations: &'a [Point2<f64>],
}

impl<'a> ProjectiveBoardFit<'a> {
    pub fn new(template: &'a [Point2<f64>], destinations: &'a [Point2<f64>]) -> Self {
        Self {
            template,
            destinations,
        }
    }

    /// Template points mapped through `h`; `None` where the projection fails.
    pub fn project(&self, h: &Homography) -> Vec<Option<Point2<f64>>> {
        self.template.iter().map(|p| h.apply(p)).collect()
    }
}

impl Model for ProjectiveBoardFit<'_> {
    type Sample = Correspondence;
    type Fit = Homography;
    const MIN_SAMPLES: usize = 4;

    fn build(&self, data: &[Correspondence], sample: &[usize]) -> Option<Homography> {
        let mut src = [Point2::origin(); 4];
        let mut dst = [Point2::origin(); 4];
        for (k, &idx) in sample.iter().take(4).enumerate() {
            let c = data.get(idx)?;
            src[k] = *self.template.get(c.source)?;
            dst[k] = *self.destinations.get(c.dest)?;
        }
        get_perspective_transform(&src, &dst)
    }

    fn residuals(&self, fit: &Homography, data: &[Correspondence], out: &mut Vec<f64>) {
        out.clear();

        let projected = self.project(fit);
        let nearest: Vec<Option<Neighbor>> = projected
            .iter()
            .map(|p| p.and_then(|p| nearest_neighbor(&p, self.destinations)))
            .collect();

        // How many projected template points claim each destination.
        let mut claims = vec![0usize; self.destinations.len()];
        for n in nearest.iter().flatten() {
            claims[n.index] += 1;
        }

        out.extend(data.iter().map(|c| {
            let Some(Some(p)) = projected.get(c.source) else {
                return PENALTY;
            };
            let Some(dest) = self.destinations.get(c.dest) else {
                return PENALTY;
            };
            match nearest[c.source] {
                Some(n) if claims[n.index] > 1 => PENALTY,
                _ => distance(p, dest),
            }
        }));
    }
}
