//! Core geometry for dartboard calibration.
//!
//! This crate is intentionally small and purely geometric. It knows nothing
//! about dartboards, detectors or images: it provides the numeric kernel the
//! registration and calibration crates are built on.
//!
//! - [`geometry`]: distances, rotations, Gaussian elimination, point mapping,
//!   planar rigid motions.
//! - [`homography`]: the four-point projective solver and a least-squares DLT.
//! - [`nearest`]: brute-force nearest-neighbour matching.
//! - [`outliers`]: IQR and median/MAD rejection.

pub mod geometry;
pub mod homography;
mod logger;
pub mod nearest;
pub mod outliers;

pub use geometry::{
    centroid, distance, distance_sq, rotation_matrix, solve_linear_system, transform_point,
    RigidTransform2D,
};
pub use homography::{estimate_homography, get_perspective_transform, Homography};
pub use nearest::{
    find_nearest_neighbors, find_nearest_neighbors_into, match_within, nearest_neighbor,
    Correspondence, Neighbor,
};
pub use outliers::{
    iqr_outlier_indices, mad_outlier_indices, median_mad, retain_except, OutlierStrategy,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_from_env, init_with_level, LOG_ENV};

pub use nalgebra::Point2;
