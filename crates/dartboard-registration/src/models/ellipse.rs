use dartboard_core::solve_linear_system;
use nalgebra::{Matrix2, Point2, SMatrix, SVector, Vector2};
use serde::{Deserialize, Serialize};

use crate::ransac::Model;

/// Gradients below this make the Sampson distance meaningless.
const GRAD_EPS: f64 = 1e-12;

/// Conic `a x^2 + b x y + c y^2 + d x + e y = 1` in coordinates relative to
/// `origin`.
///
/// Fitting in shifted coordinates keeps the conic away from the origin, where
/// the unit right-hand side could not describe it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub origin: Point2<f64>,
    pub coeffs: [f64; 5],
}

impl Ellipse {
    /// Algebraic value `F(p) = a x^2 + b x y + c y^2 + d x + e y - 1`.
    pub fn algebraic(&self, p: &Point2<f64>) -> f64 {
        let [a, b, c, d, e] = self.coeffs;
        let (x, y) = (p.x - self.origin.x, p.y - self.origin.y);
        a * x * x + b * x * y + c * y * y + d * x + e * y - 1.0
    }

    fn gradient(&self, p: &Point2<f64>) -> Vector2<f64> {
        let [a, b, c, d, e] = self.coeffs;
        let (x, y) = (p.x - self.origin.x, p.y - self.origin.y);
        Vector2::new(2.0 * a * x + b * y + d, b * x + 2.0 * c * y + e)
    }

    /// First-order (Sampson) distance from `p` to the curve.
    pub fn sampson_distance(&self, p: &Point2<f64>) -> f64 {
        let g = self.gradient(p).norm();
        if g < GRAD_EPS {
            return f64::INFINITY;
        }
        self.algebraic(p).abs() / g
    }

    /// Geometric centre, where the gradient vanishes.
    pub fn center(&self) -> Option<Point2<f64>> {
        let [a, b, c, d, e] = self.coeffs;
        let q = Matrix2::new(2.0 * a, b, b, 2.0 * c)
            .try_inverse()?
            * Vector2::new(-d, -e);
        Some(Point2::new(self.origin.x + q.x, self.origin.y + q.y))
    }
}

/// General ellipse through five points.
#[derive(Clone, Copy, Debug, Default)]
pub struct EllipseModel;

impl Model for EllipseModel {
    type Sample = Point2<f64>;
    type Fit = Ellipse;
    const MIN_SAMPLES: usize = 5;

    fn build(&self, data: &[Point2<f64>], sample: &[usize]) -> Option<Ellipse> {
        let mut pts = [Point2::origin(); 5];
        for (slot, &idx) in pts.iter_mut().zip(sample) {
            *slot = *data.get(idx)?;
        }
        let (sx, sy) = pts.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        let origin = Point2::new(sx / 5.0, sy / 5.0);

        let mut a = SMatrix::<f64, 5, 5>::zeros();
        let b = SVector::<f64, 5>::repeat(1.0);
        for (row, p) in pts.iter().enumerate() {
            let (x, y) = (p.x - origin.x, p.y - origin.y);
            a[(row, 0)] = x * x;
            a[(row, 1)] = x * y;
            a[(row, 2)] = y * y;
            a[(row, 3)] = x;
            a[(row, 4)] = y;
        }
        let sol = solve_linear_system(a, b)?;
        let coeffs = [sol[0], sol[1], sol[2], sol[3], sol[4]];
        let [ca, cb, cc, _, _] = coeffs;

        // Positive-definite quadratic part: an ellipse enclosing the origin.
        let is_ellipse = cb * cb - 4.0 * ca * cc < 0.0 && ca > 0.0;
        (is_ellipse && coeffs.iter().all(|v| v.is_finite())).then_some(Ellipse { origin, coeffs })
    }

    fn residuals(&self, fit: &Ellipse, data: &[Point2<f64>], out: &mut Vec<f64>) {
        out.clear();
        out.extend(data.iter().map(|p| fit.sampson_distance(p)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ransac::{ransac, RansacParams};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ellipse_points(n: usize) -> Vec<Point2<f64>> {
        let (cx, cy, ra, rb, rot) = (3.0, -2.0, 4.0, 2.0, 30f64.to_radians());
        let (s, c) = rot.sin_cos();
        (0..n)
            .map(|k| {
                let t = k as f64 * std::f64::consts::TAU / n as f64;
                let (x, y) = (ra * t.cos(), rb * t.sin());
                Point2::new(cx + c * x - s * y, cy + s * x + c * y)
            })
            .collect()
    }

    #[test]
    fn five_points_define_the_ellipse() {
        let pts = ellipse_points(5);
        let e = EllipseModel.build(&pts, &[0, 1, 2, 3, 4]).expect("ellipse");
        let center = e.center().unwrap();
        assert_relative_eq!(center.x, 3.0, epsilon = 1e-9);
        assert_relative_eq!(center.y, -2.0, epsilon = 1e-9);
        for p in ellipse_points(17) {
            assert!(e.sampson_distance(&p) < 1e-9);
        }
    }

    #[test]
    fn hyperbola_and_collinear_samples_are_rejected() {
        let hyperbola: Vec<_> = [1.0, 2.0, 3.0, -1.0, -2.0]
            .iter()
            .map(|&x: &f64| Point2::new(x, 1.0 / x))
            .collect();
        assert!(EllipseModel.build(&hyperbola, &[0, 1, 2, 3, 4]).is_none());

        let line: Vec<_> = (0..5).map(|i| Point2::new(i as f64, 2.0 * i as f64)).collect();
        assert!(EllipseModel.build(&line, &[0, 1, 2, 3, 4]).is_none());
    }

    #[test]
    fn ransac_ignores_clutter() {
        let mut data = ellipse_points(24);
        data.extend([
            Point2::new(3.0, -2.0),
            Point2::new(10.0, 10.0),
            Point2::new(-5.0, 4.0),
            Point2::new(4.0, -1.0),
            Point2::new(0.5, -6.0),
        ]);
        let params = RansacParams {
            inlier_threshold: 1e-6,
            outlier_ratio: 0.4,
            success_probability: 0.999,
            ..RansacParams::default()
        };
        let res = ransac(&EllipseModel, &data, &params, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(res.inliers, (0..24).collect::<Vec<_>>());
        let center = res.fit.center().unwrap();
        assert_relative_eq!(center.x, 3.0, epsilon = 1e-6);
        assert_relative_eq!(center.y, -2.0, epsilon = 1e-6);
    }
}
