//! Nonlinear refinement of linear estimates.
//!
//! A refinement is described by two independent pieces:
//!
//! * A [`ResidualProblem`], which maps a flat parameter vector to a vector of residuals whose sum
//!   of squares is the objective. [`SymmetricTransferError`] and [`SymmetricReprojectionError`]
//!   are the problems used for homographies and projection matrices.
//! * A [`Minimizer`], which searches for the parameters minimizing that objective.
//!   [`LevenbergMarquardtMinimizer`] is the shipped strategy.
//!
//! A refinement never fails because it did not converge. The best parameters seen are returned
//! together with a [`RefineReport`].

mod camera;
mod homography;
mod minimize;
mod settings;

pub use camera::*;
pub use homography::*;
pub use minimize::*;
pub use settings::*;
