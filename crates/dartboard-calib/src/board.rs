//! Dartboard geometry and score lookup.
//!
//! Board coordinates are meters with the origin at the bull, `y` pointing
//! down (image convention) and sector 20 centred on the negative `y` axis.
//! Angles are measured clockwise from the top.

use dartboard_core::{get_perspective_transform, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::score::ScoreZone;

/// Sector numbers clockwise from the top.
pub const SECTOR_ORDER: [u8; 20] = [
    20, 1, 18, 4, 13, 6, 10, 15, 2, 17, 3, 19, 7, 16, 8, 11, 14, 9, 12, 5,
];

/// Angular width of one sector, degrees.
pub const SECTOR_WIDTH_DEG: f64 = 18.0;

/// Ring radii in meters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardRadii {
    /// Outer edge of the double ring.
    pub r_double: f64,
    /// Outer edge of the treble ring.
    pub r_treble: f64,
    pub r_outer_bull: f64,
    pub r_inner_bull: f64,
    /// Width of the double and treble rings.
    pub w_double_treble: f64,
}

impl Default for BoardRadii {
    fn default() -> Self {
        Self {
            r_double: 0.170,
            r_treble: 0.1074,
            r_outer_bull: 0.0159,
            r_inner_bull: 0.00635,
            w_double_treble: 0.01,
        }
    }
}

/// Board validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("board radii must be finite and > 0")]
    InvalidRadius,
    #[error(
        "rings overlap: need inner bull < outer bull < treble - w < treble < double - w < double"
    )]
    RingOrder,
}

/// Validated board with its precomputed registration template.
#[derive(Clone, Debug)]
pub struct Board {
    radii: BoardRadii,
    cross_points: Vec<Point2<f64>>,
    calibration_points: [Point2<f64>; 4],
}

/// Point at `radius` and clockwise angle `angle_deg` from the top.
fn polar_point(radius: f64, angle_deg: f64) -> Point2<f64> {
    let (s, c) = angle_deg.to_radians().sin_cos();
    Point2::new(radius * s, -radius * c)
}

impl Board {
    /// Validate radii and build the template.
    pub fn new(radii: BoardRadii) -> Result<Self, BoardError> {
        let BoardRadii {
            r_double,
            r_treble,
            r_outer_bull,
            r_inner_bull,
            w_double_treble: w,
        } = radii;

        if [r_double, r_treble, r_outer_bull, r_inner_bull, w]
            .iter()
            .any(|v| !v.is_finite() || *v <= 0.0)
        {
            return Err(BoardError::InvalidRadius);
        }
        let ordered = r_inner_bull < r_outer_bull
            && r_outer_bull < r_treble - w
            && r_treble < r_double - w;
        if !ordered {
            return Err(BoardError::RingOrder);
        }

        let rings = [r_double, r_double - w, r_treble, r_treble - w];
        let cross_points = rings
            .iter()
            .flat_map(|&r| {
                (0..SECTOR_ORDER.len()).map(move |k| {
                    polar_point(r, SECTOR_WIDTH_DEG / 2.0 + SECTOR_WIDTH_DEG * k as f64)
                })
            })
            .collect();

        let calibration_points = [0.0, 90.0, 180.0, 270.0].map(|a| polar_point(r_double, a));

        Ok(Self {
            radii,
            cross_points,
            calibration_points,
        })
    }

    #[inline]
    pub fn radii(&self) -> &BoardRadii {
        &self.radii
    }

    /// Sector-boundary intersections with the four ring edges, ring-major:
    /// double outer, double inner, treble outer, treble inner; 20 points each,
    /// starting at the 20/1 boundary and going clockwise.
    #[inline]
    pub fn cross_points(&self) -> &[Point2<f64>] {
        &self.cross_points
    }

    /// Points on the outer double edge at the centres of 20, 6, 3 and 11.
    #[inline]
    pub fn calibration_points(&self) -> &[Point2<f64>; 4] {
        &self.calibration_points
    }

    /// Cross points scaled so the outer double edge has radius 1.
    pub fn normalized_cross_points(&self) -> Vec<Point2<f64>> {
        let s = 1.0 / self.radii.r_double;
        self.cross_points.iter().map(|p| *p * s).collect()
    }

    /// Sector number at a clockwise angle from the top.
    pub fn sector_at(angle_deg: f64) -> u8 {
        let a = (angle_deg + SECTOR_WIDTH_DEG / 2.0).rem_euclid(360.0);
        let idx = ((a / SECTOR_WIDTH_DEG) as usize).min(SECTOR_ORDER.len() - 1);
        SECTOR_ORDER[idx]
    }

    /// Zone at clockwise angle `angle_deg` and distance `distance` from the
    /// bull, with `distance` in units of `r_double`.
    pub fn score_polar(&self, angle_deg: f64, distance: f64) -> ScoreZone {
        let r = &self.radii;
        let d = distance * r.r_double;
        let w = r.w_double_treble;

        if !d.is_finite() || d > r.r_double {
            return ScoreZone::Out;
        }
        if d <= r.r_inner_bull {
            return ScoreZone::DoubleBull;
        }
        if d <= r.r_outer_bull {
            return ScoreZone::Bull;
        }

        let sector = Self::sector_at(angle_deg);
        if d > r.r_double - w {
            ScoreZone::Double(sector)
        } else if d > r.r_treble - w && d <= r.r_treble {
            ScoreZone::Treble(sector)
        } else if d > r.r_treble {
            ScoreZone::SingleOuter(sector)
        } else {
            ScoreZone::SingleInner(sector)
        }
    }

    /// Zone of a point in board coordinates.
    pub fn score_point(&self, p: &Point2<f64>) -> ScoreZone {
        let angle = p.x.atan2(-p.y).to_degrees();
        self.score_polar(angle, p.coords.norm() / self.radii.r_double)
    }

    /// Score dart tips given in the same frame as `calibration_points`.
    ///
    /// `calibration_points` are the images of [`Board::calibration_points`]
    /// (top, right, bottom, left). Returns `None` when they do not define a
    /// projective map; tips that cannot be mapped score [`ScoreZone::Out`].
    pub fn get_dart_scores(
        &self,
        calibration_points: &[Point2<f64>; 4],
        tips: &[Point2<f64>],
    ) -> Option<Vec<ScoreZone>> {
        let to_board: Homography =
            get_perspective_transform(calibration_points, &self.calibration_points)?;
        Some(
            tips.iter()
                .map(|t| {
                    to_board
                        .apply(t)
                        .map_or(ScoreZone::Out, |p| self.score_point(&p))
                })
                .collect(),
        )
    }
}
