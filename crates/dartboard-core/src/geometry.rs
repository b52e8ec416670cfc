//! Geometry kernel: distances, rotations, small dense solves and point mapping.
//!
//! Everything here is allocation-free. The linear solver runs once per RANSAC
//! trial, so it works on stack matrices and reports singular systems with
//! `None` instead of an error type.

use nalgebra::{Matrix2, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Pivot magnitude below which a system is treated as singular.
pub const PIVOT_EPS: f64 = 1e-10;

/// Homogeneous scale below which a projected point is rejected.
pub const W_EPS: f64 = 1e-12;

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a - b).norm()
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn distance_sq(a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    (a - b).norm_squared()
}

/// Rotation matrix `[[cos, -sin], [sin, cos]]` for an angle in degrees.
///
/// In a y-up frame this is a counter-clockwise rotation; in the y-down board
/// and image frames used by the calibrator it turns points clockwise on screen.
pub fn rotation_matrix(angle_deg: f64) -> Matrix2<f64> {
    let (s, c) = angle_deg.to_radians().sin_cos();
    Matrix2::new(c, -s, s, c)
}

/// Solve `A x = b` by Gaussian elimination with partial pivoting.
///
/// At every column the row with the largest absolute value in that column is
/// swapped into the pivot position. Returns `None` as soon as a pivot falls
/// below [`PIVOT_EPS`].
pub fn solve_linear_system<const N: usize>(
    mut a: SMatrix<f64, N, N>,
    mut b: SVector<f64, N>,
) -> Option<SVector<f64, N>> {
    for col in 0..N {
        let mut pivot_row = col;
        let mut pivot_abs = a[(col, col)].abs();
        for row in (col + 1)..N {
            let v = a[(row, col)].abs();
            if v > pivot_abs {
                pivot_abs = v;
                pivot_row = row;
            }
        }
        if pivot_abs.is_nan() || pivot_abs < PIVOT_EPS {
            return None;
        }
        if pivot_row != col {
            a.swap_rows(col, pivot_row);
            b.swap_rows(col, pivot_row);
        }

        let pivot = a[(col, col)];
        for row in (col + 1)..N {
            let factor = a[(row, col)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..N {
                a[(row, k)] -= factor * a[(col, k)];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = SVector::<f64, N>::zeros();
    for row in (0..N).rev() {
        let mut acc = b[row];
        for k in (row + 1)..N {
            acc -= a[(row, k)] * x[k];
        }
        x[row] = acc / a[(row, row)];
    }
    Some(x)
}

/// Map a point through a 3x3 projective (or affine) matrix.
///
/// Returns `None` when the homogeneous coordinate vanishes or the result is not
/// finite.
#[inline]
pub fn transform_point(p: &Point2<f64>, m: &Matrix3<f64>) -> Option<Point2<f64>> {
    let v = m * Vector3::new(p.x, p.y, 1.0);
    let w = v[2];
    if w.is_nan() || w.abs() <= W_EPS {
        return None;
    }
    let out = Point2::new(v[0] / w, v[1] / w);
    (out.x.is_finite() && out.y.is_finite()).then_some(out)
}

/// Arithmetic mean of a point set.
pub fn centroid(points: &[Point2<f64>]) -> Option<Point2<f64>> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point2::new(sx / n, sy / n))
}

/// Planar rigid motion `p' = R(theta) p + t`, `theta` in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform2D {
    pub theta: f64,
    pub tx: f64,
    pub ty: f64,
}

impl RigidTransform2D {
    pub const IDENTITY: RigidTransform2D = RigidTransform2D {
        theta: 0.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(theta: f64, tx: f64, ty: f64) -> Self {
        Self { theta, tx, ty }
    }

    /// Apply the motion to a point.
    #[inline]
    pub fn apply(&self, p: &Point2<f64>) -> Point2<f64> {
        let (s, c) = self.theta.sin_cos();
        Point2::new(c * p.x - s * p.y + self.tx, s * p.x + c * p.y + self.ty)
    }

    /// Homogeneous 3x3 form.
    pub fn to_matrix(&self) -> Matrix3<f64> {
        let (s, c) = self.theta.sin_cos();
        Matrix3::new(
            c, -s, self.tx, //
            s, c, self.ty, //
            0.0, 0.0, 1.0,
        )
    }

    /// Recover a rigid motion from a homogeneous matrix whose upper-left block
    /// is a rotation.
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self {
            theta: m[(1, 0)].atan2(m[(0, 0)]),
            tx: m[(0, 2)],
            ty: m[(1, 2)],
        }
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &RigidTransform2D) -> RigidTransform2D {
        Self::from_matrix(&(self.to_matrix() * first.to_matrix()))
    }
}
