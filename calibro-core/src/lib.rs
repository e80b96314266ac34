//! # Calibro Core
//!
//! This library provides the common types shared by the `calibro` crates. It holds the
//! correspondence types that feed every estimator, the matrix types the estimators produce,
//! and the [`Error`] type that every fallible operation in the workspace returns.
//!
//! Two kinds of estimation are supported by the crates built on top of this one:
//!
//! * Camera resectioning: from [`WorldImageMatch`] correspondences (a 3d point in the world and
//!   the pixel it was observed at) a [`ProjectionMatrix`] is estimated, which can then be factored
//!   into [`CameraIntrinsics`], a rotation, and a translation.
//! * Planar homography estimation: from [`ImageMatch`] correspondences (a pixel in image A and a
//!   pixel in image B) a [`Homography`] is estimated.
//!
//! Both matrices are only defined up to scale. All estimators in the workspace return them
//! normalized so that their bottom-right entry is `1.0`, which is what makes two estimates
//! comparable entry by entry.
//!
//! This crate re-exports [`nalgebra`] and [`sample_consensus`] so that downstream crates always
//! agree on their versions.

mod camera;
mod error;
mod homography;
mod matches;

pub use camera::*;
pub use error::*;
pub use homography::*;
pub use matches::*;

pub use nalgebra;
pub use sample_consensus;

/// Homogeneous coordinates with an absolute value at or below this are treated as zero when a
/// projective quantity is rescaled.
pub const HOMOGENEOUS_EPSILON: f64 = 1e-12;
