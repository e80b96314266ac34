//! This crate contains the geometric building blocks of `calibro`.
//!
//! ## Conditioning
//!
//! Linear estimators are badly conditioned when pixel coordinates are in the hundreds and world
//! coordinates are near one. Before building a linear system every point set is moved so that its
//! centroid is at the origin and scaled so that its mean distance from the origin is `√2` (2d) or
//! `√3` (3d). See [`normalize`].
//!
//! ## Decomposition
//!
//! A projection matrix `P = [M | p4]` is factored into `K * [R | t]` with an RQ factorization of
//! `M`. See [`decompose`].
//!
//! ## Display
//!
//! A calibrated camera is usually checked by eye by drawing a known object over the image.
//! [`cube`] projects the edges of a reference cube.

pub mod cube;
pub mod decompose;
pub mod normalize;

pub use cube::*;
pub use decompose::*;
pub use normalize::*;
