use crate::geometry::{solve_linear_system, transform_point};
use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Determinant magnitude below which a homography is considered singular.
const DET_EPS: f64 = 1e-12;

/// Projective map `p' ~ H [x, y, 1]^T`, stored with `h[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Map a point, `None` if it lands at infinity.
    #[inline]
    pub fn apply(&self, p: &Point2<f64>) -> Option<Point2<f64>> {
        transform_point(p, &self.h)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().and_then(normalize_homography).map(Self::new)
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &Homography) -> Option<Self> {
        normalize_homography(self.h * first.h).map(Self::new)
    }

    /// True if the matrix is finite and non-singular relative to its scale.
    pub fn is_regular(&self) -> bool {
        self.h.iter().all(|v| v.is_finite())
            && self.h.determinant().abs() > DET_EPS * self.h.norm().powi(3)
    }
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn normalization_for<'a>(pts: impl Iterator<Item = &'a Point2<f64>> + Clone) -> Matrix3<f64> {
    // Hartley normalization: translate to centroid, scale so mean distance = sqrt(2)
    let mut n = 0usize;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts.clone() {
        cx += p.x;
        cy += p.y;
        n += 1;
    }
    let n = n.max(1) as f64;
    cx /= n;
    cy /= n;

    let mean_dist = pts
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    hartley_normalization(cx, cy, mean_dist)
}

#[inline]
fn apply_affine(t: &Matrix3<f64>, p: &Point2<f64>) -> Point2<f64> {
    let v = t * Vector3::new(p.x, p.y, 1.0);
    Point2::new(v[0], v[1])
}

fn normalize_homography(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if !s.is_finite() || s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

fn denormalize_homography(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * hn * t_src)
}

/// Reject rank-deficient solutions while still in normalized coordinates, where
/// the entries are O(1), then map back to the caller's frames.
fn regular_from_normalized(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Homography> {
    let det = hn.determinant().abs();
    if det.is_nan() || det <= DET_EPS * hn.norm().powi(3) {
        return None;
    }
    let h = normalize_homography(denormalize_homography(hn, t_src, t_dst)?)?;
    h.iter().all(|v| v.is_finite()).then_some(Homography::new(h))
}

/// Solve the homography `dst ~ H * src` from exactly four correspondences.
///
/// Unknowns are `[h11 h12 h13 h21 h22 h23 h31 h32]` with `h33 = 1`; each pair
/// `(x, y) -> (u, v)` contributes
///
/// ```text
/// h11 x + h12 y + h13 - u h31 x - u h32 y = u
/// h21 x + h22 y + h23 - v h31 x - v h32 y = v
/// ```
///
/// Both quadruples are Hartley-normalized before the 8x8 solve. Returns `None`
/// for singular configurations (repeated points, three collinear points) and
/// for singular results.
pub fn get_perspective_transform(
    src: &[Point2<f64>; 4],
    dst: &[Point2<f64>; 4],
) -> Option<Homography> {
    let t_src = normalization_for(src.iter());
    let t_dst = normalization_for(dst.iter());

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let s = apply_affine(&t_src, &src[k]);
        let d = apply_affine(&t_dst, &dst[k]);
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = solve_linear_system(a, b)?;

    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    regular_from_normalized(hn, t_src, t_dst)
}

/// Least-squares homography `dst ~ H * src` over four or more correspondences.
///
/// Normalized DLT solved via SVD. Exactly four pairs use
/// [`get_perspective_transform`].
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    if src.len() == 4 {
        let s: &[Point2<f64>; 4] = src.try_into().ok()?;
        let d: &[Point2<f64>; 4] = dst.try_into().ok()?;
        return get_perspective_transform(s, d);
    }

    let t_src = normalization_for(src.iter());
    let t_dst = normalization_for(dst.iter());

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);

    for k in 0..n {
        let s = apply_affine(&t_src, &src[k]);
        let d = apply_affine(&t_dst, &dst[k]);
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Ah = 0: h is the right singular vector with the smallest singular value.
    let svd = a.svd(false, true);
    let vt = svd.v_t?;
    let (min_row, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = vt.row(min_row);

    let hn =
        Matrix3::<f64>::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    regular_from_normalized(hn, t_src, t_dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ground_truth() -> Homography {
        Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ))
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = Homography::new(Matrix3::new(
            1.2, 0.1, 5.0, //
            -0.05, 0.9, 3.0, //
            0.001, 0.0005, 1.0,
        ));
        let inv = h.inverse().expect("invertible");

        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(50.0, -20.0),
            Point2::new(320.0, 200.0),
        ] {
            let q = h.apply(&p).unwrap();
            let back = inv.apply(&q).unwrap();
            assert_relative_eq!(back, p, epsilon = 1e-9);
        }
    }

    #[test]
    fn four_point_solve_recovers_matrix() {
        let gt = ground_truth();
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(180.0, 0.0),
            Point2::new(180.0, 130.0),
            Point2::new(0.0, 130.0),
        ];
        let dst = src.map(|p| gt.apply(&p).unwrap());

        let recovered = get_perspective_transform(&src, &dst).expect("recoverable");
        assert_relative_eq!(recovered.h, gt.h, epsilon = 1e-6);
    }

    #[test]
    fn repeated_points_are_singular() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
        ];
        let dst = [
            Point2::new(1.0, 1.0),
            Point2::new(11.0, 1.0),
            Point2::new(11.0, 1.0),
            Point2::new(1.0, 11.0),
        ];
        assert!(get_perspective_transform(&src, &dst).is_none());
    }

    #[test]
    fn collinear_source_is_rejected() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 5.0),
        ];
        let dst = [
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 3.0),
            Point2::new(0.0, 3.0),
        ];
        assert!(get_perspective_transform(&src, &dst).is_none());
    }

    #[test]
    fn dlt_handles_overdetermined_case() {
        let gt = ground_truth();
        let src: Vec<Point2<f64>> = (0..3)
            .flat_map(|y| (0..3).map(move |x| Point2::new(x as f64 * 40.0, y as f64 * 50.0)))
            .collect();
        let dst: Vec<Point2<f64>> = src.iter().map(|p| gt.apply(p).unwrap()).collect();

        let estimated = estimate_homography(&src, &dst).expect("estimate");
        assert_relative_eq!(estimated.h, gt.h, epsilon = 1e-6);
    }

    #[test]
    fn mismatched_input_lengths_fail() {
        let src = [Point2::new(0.0, 0.0); 4];
        let dst = [Point2::new(1.0, 1.0); 3];
        assert!(estimate_homography(&src, &dst).is_none());
    }
}
