use dartboard_core::distance;
use nalgebra::Point2;

use crate::ransac::Model;

/// Radii below this are treated as degenerate.
const MIN_RADIUS: f64 = 1e-12;

/// Circle around a known centre; a single point fixes the radius.
///
/// Used to pick the dominant ring among points scattered around an already
/// located bull.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedCenterCircleModel {
    pub center: Point2<f64>,
}

impl FixedCenterCircleModel {
    pub fn new(center: Point2<f64>) -> Self {
        Self { center }
    }
}

impl Model for FixedCenterCircleModel {
    type Sample = Point2<f64>;
    /// Radius.
    type Fit = f64;
    const MIN_SAMPLES: usize = 1;

    fn build(&self, data: &[Point2<f64>], sample: &[usize]) -> Option<f64> {
        let p = data.get(*sample.first()?)?;
        let r = distance(&self.center, p);
        (r.is_finite() && r > MIN_RADIUS).then_some(r)
    }

    fn residuals(&self, radius: &f64, data: &[Point2<f64>], out: &mut Vec<f64>) {
        out.clear();
        out.extend(data.iter().map(|p| (distance(&self.center, p) - radius).abs()));
    }
}
