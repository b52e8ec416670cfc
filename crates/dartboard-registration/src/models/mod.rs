//! [`Model`](crate::Model) implementations.
//!
//! [`ProjectiveBoardFit`] drives board registration; the circle and ellipse
//! models fit ring-shaped point clouds.

mod circle;
mod ellipse;
mod projective;

pub use circle::FixedCenterCircleModel;
pub use ellipse::{Ellipse, EllipseModel};
pub use projective::{ProjectiveBoardFit, PENALTY};
