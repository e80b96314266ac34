use crate::{Error, Result, HOMOGENEOUS_EPSILON};
use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use nalgebra::{Matrix3, Matrix3x4, Point2, Point3, Rotation3, Vector2, Vector3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// This contains intrinsic camera parameters as per
/// [this Wikipedia page](https://en.wikipedia.org/wiki/Camera_resectioning#Intrinsic_parameters).
///
/// The matrix form is upper triangular with a `1.0` in the bottom-right corner.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    pub focals: Vector2<f64>,
    pub principal_point: Point2<f64>,
    pub skew: f64,
}

impl CameraIntrinsics {
    /// Creates camera intrinsics that would create an identity intrinsic matrix.
    pub fn identity() -> Self {
        Self {
            focals: Vector2::new(1.0, 1.0),
            skew: 0.0,
            principal_point: Point2::new(0.0, 0.0),
        }
    }

    /// Reads the intrinsics out of an upper-triangular matrix whose bottom-right entry is `1.0`.
    ///
    /// The entries below the diagonal are ignored.
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Self {
        Self {
            focals: Vector2::new(matrix[(0, 0)], matrix[(1, 1)]),
            skew: matrix[(0, 1)],
            principal_point: Point2::new(matrix[(0, 2)], matrix[(1, 2)]),
        }
    }

    #[must_use]
    pub fn focals(self, focals: Vector2<f64>) -> Self {
        Self { focals, ..self }
    }

    #[must_use]
    pub fn focal(self, focal: f64) -> Self {
        Self {
            focals: Vector2::new(focal, focal),
            ..self
        }
    }

    #[must_use]
    pub fn principal_point(self, principal_point: Point2<f64>) -> Self {
        Self {
            principal_point,
            ..self
        }
    }

    #[must_use]
    pub fn skew(self, skew: f64) -> Self {
        Self { skew, ..self }
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focals.x,  self.skew,      self.principal_point.x,
            0.0,            self.focals.y,  self.principal_point.y,
            0.0,            0.0,            1.0,
        )
    }
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self::identity()
    }
}

/// A 3x4 camera projection matrix mapping homogeneous world points to homogeneous pixels.
///
/// It is only defined up to scale. Estimators return it normalized (see
/// [`ProjectionMatrix::normalized`]).
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, Deref, DerefMut, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ProjectionMatrix(pub Matrix3x4<f64>);

impl ProjectionMatrix {
    /// Composes `K * [R | t]`.
    pub fn from_parts(
        intrinsics: &CameraIntrinsics,
        rotation: &Rotation3<f64>,
        translation: &Vector3<f64>,
    ) -> Self {
        let mut extrinsics = Matrix3x4::zeros();
        extrinsics
            .fixed_slice_mut::<3, 3>(0, 0)
            .copy_from(rotation.matrix());
        extrinsics.set_column(3, translation);
        Self(intrinsics.matrix() * extrinsics)
    }

    /// The left 3x3 block `M` of `P = [M | p4]`.
    pub fn left_block(&self) -> Matrix3<f64> {
        self.0.fixed_slice::<3, 3>(0, 0).into_owned()
    }

    /// The last column `p4` of `P = [M | p4]`.
    pub fn last_column(&self) -> Vector3<f64> {
        self.0.column(3).into_owned()
    }

    /// Rescales the matrix so that its bottom-right entry is `1.0`.
    ///
    /// Fails with [`Error::Numerical`] if that entry is (near) zero.
    pub fn normalized(&self) -> Result<Self> {
        let corner = self.0[(2, 3)];
        if corner.abs() <= HOMOGENEOUS_EPSILON || !corner.is_finite() {
            return Err(Error::Numerical(
                "projection matrix has a zero bottom-right entry",
            ));
        }
        Ok(Self(self.0 / corner))
    }

    /// Projects a world point to a pixel.
    ///
    /// Fails with [`Error::Numerical`] if the point lands at infinity.
    pub fn project(&self, point: &Point3<f64>) -> Result<Point2<f64>> {
        Point2::from_homogeneous(self.0 * point.to_homogeneous())
            .filter(|p| p.coords.iter().all(|n| n.is_finite()))
            .ok_or(Error::Numerical("point projects to infinity"))
    }
}

/// A projection matrix factored as `P = K * [R | t]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CameraDecomposition {
    pub intrinsics: CameraIntrinsics,
    /// Rotation from world to camera coordinates, always with determinant `+1`.
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl CameraDecomposition {
    /// Recomposes the projection matrix `K * [R | t]`.
    pub fn projection(&self) -> ProjectionMatrix {
        ProjectionMatrix::from_parts(&self.intrinsics, &self.rotation, &self.translation)
    }
}
