use crate::{Error, ImageMatch, Result, HOMOGENEOUS_EPSILON};
use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3, Point2};
use sample_consensus::Model;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A planar homography mapping pixels of image A to pixels of image B.
///
/// It is only defined up to scale. Estimators return it normalized so that `H[(2, 2)] == 1.0`.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Homography(pub Matrix3<f64>);

impl Homography {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Rescales the matrix so that its bottom-right entry is `1.0`.
    ///
    /// Fails with [`Error::Numerical`] if that entry is (near) zero.
    pub fn normalized(&self) -> Result<Self> {
        let corner = self.0[(2, 2)];
        if corner.abs() <= HOMOGENEOUS_EPSILON || !corner.is_finite() {
            return Err(Error::Numerical("homography has a zero bottom-right entry"));
        }
        Ok(Self(self.0 / corner))
    }

    /// Maps a point of image A into image B.
    ///
    /// Returns `None` if the point is mapped to infinity.
    pub fn transfer(&self, point: &Point2<f64>) -> Option<Point2<f64>> {
        transfer(&self.0, point)
    }

    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Distance in image B between the transferred point of image A and its match.
    ///
    /// A point mapped to infinity has an infinite error.
    pub fn transfer_error(&self, m: &ImageMatch) -> f64 {
        self.transfer(&m.0)
            .map(|p| (p - m.1).norm())
            .unwrap_or(f64::INFINITY)
    }
}

impl Model<ImageMatch> for Homography {
    fn residual(&self, data: &ImageMatch) -> f64 {
        self.transfer_error(data)
    }
}

/// Applies a 3x3 projective transform to a 2d point.
///
/// Returns `None` if the point is mapped to infinity.
pub fn transfer(matrix: &Matrix3<f64>, point: &Point2<f64>) -> Option<Point2<f64>> {
    Point2::from_homogeneous(matrix * point.to_homogeneous())
        .filter(|p| p.coords.iter().all(|n| n.is_finite()))
}
