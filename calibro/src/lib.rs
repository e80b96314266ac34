//! # `calibro`
//!
//! Camera resectioning and robust homography estimation from point correspondences.
//!
//! The two entry points most users need are [`calibrate_camera`] and [`estimate_homography`]
//! (or its robust variant [`estimate_homography_ransac`]). Each takes a [`Method`] choosing
//! between the linear estimate and a linear estimate refined by nonlinear least squares, and a
//! [`CalibroSettings`] with the tuning knobs of the refinement and of RANSAC.
//!
//! All of the basic types are included in the root of the crate. The algorithms the entry points
//! are built from are re-exported in modules, so they can also be composed by hand.
//!
//! ## Modules
//! * [`consensus`] - finding the best estimated model from data with outliers
//! * [`estimate`] - linear estimation of models from data
//! * [`geom`] - conditioning, decomposition, and projection helpers
//! * [`optimize`] - refining models to fit data

mod calibrate;
mod homography;
mod method;
mod settings;

pub use calibrate::*;
pub use calibro_core::{sample_consensus::*, *};
pub use homography::*;
pub use method::*;
pub use settings::*;

/// Consensus algorithms (RANSAC)
pub mod consensus {
    pub use calibro_ransac::*;
}

/// Computational geometry
pub mod geom {
    pub use calibro_geom::*;
}

/// Linear estimation algorithms
pub mod estimate {
    pub use calibro_dlt::{CameraDlt, HomographyDlt};
}

/// Nonlinear refinement
pub mod optimize {
    pub use calibro_optimize::*;
}
