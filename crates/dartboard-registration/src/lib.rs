//! Point-set registration for dartboard calibration.
//!
//! - [`icp`]: rigid point-to-point ICP with explicit transform accumulation.
//! - [`ransac`]: a generic RANSAC driver over the [`Model`] trait.
//! - [`models`]: the board homography model plus circle and ellipse fits.
//!
//! All randomness is injected, so results are reproducible with a seeded
//! generator.

pub mod icp;
pub mod models;
pub mod ransac;

pub use icp::{
    best_rigid_transform, icp, IcpParams, IcpResult, IcpTermination, PairRejection,
    MIN_PAIRS_FOR_MAD,
};
pub use models::{Ellipse, EllipseModel, FixedCenterCircleModel, ProjectiveBoardFit, PENALTY};
pub use ransac::{iteration_count, ransac, Model, RansacFit, RansacParams, SampleStrategy};
