use calibro_core::{
    nalgebra::{Matrix3, Rotation3},
    CameraDecomposition, CameraIntrinsics, Error, ProjectionMatrix, Result,
};
use log::trace;

/// `|det(M)|` at or below this times `‖M‖³` is treated as singular.
const SINGULARITY_TOLERANCE: f64 = 1e-12;

#[rustfmt::skip]
fn row_reversal() -> Matrix3<f64> {
    Matrix3::new(
        0.0, 0.0, 1.0,
        0.0, 1.0, 0.0,
        1.0, 0.0, 0.0,
    )
}

/// Factors `matrix` into an upper-triangular matrix and an orthonormal matrix, in that order.
///
/// With `J` the row reversal, the QR factorization `(J * A)ᵀ = Q * R` gives
/// `A = (J * Rᵀ * J) * (J * Qᵀ)`. No sign convention is applied to the diagonal.
pub fn rq(matrix: &Matrix3<f64>) -> (Matrix3<f64>, Matrix3<f64>) {
    let j = row_reversal();
    let qr = (j * matrix).transpose().qr();
    let (q, r) = (qr.q(), qr.r());
    (j * r.transpose() * j, j * q.transpose())
}

/// Factors a projection matrix into `K * [R | t]`.
///
/// The intrinsic matrix is returned with a positive diagonal and its bottom-right entry set to
/// `1.0`, and the rotation always has determinant `+1`. Since `P` is only defined up to scale, the
/// recomposed matrix equals `P` after both are normalized.
///
/// Fails with [`Error::Numerical`] if the left 3x3 block of `P` is singular.
pub fn decompose_projection(projection: &ProjectionMatrix) -> Result<CameraDecomposition> {
    let m = projection.left_block();
    let scale = m.norm();
    if !scale.is_normal() || m.determinant().abs() <= SINGULARITY_TOLERANCE * scale.powi(3) {
        return Err(Error::Numerical(
            "left 3x3 block of the projection matrix is singular",
        ));
    }

    let (upper, orthonormal) = rq(&m);
    let signs = Matrix3::from_diagonal(&upper.diagonal().map(|d| d.signum()));
    let mut intrinsics = upper * signs;
    let mut rotation = signs * orthonormal;

    let mut translation = intrinsics
        .try_inverse()
        .ok_or(Error::Numerical("intrinsic matrix is not invertible"))?
        * projection.last_column();

    // K * [-R | -t] is the same projective camera.
    if rotation.determinant() < 0.0 {
        trace!("negating camera to obtain a proper rotation");
        rotation = -rotation;
        translation = -translation;
    }

    let corner = intrinsics[(2, 2)];
    intrinsics /= corner;

    Ok(CameraDecomposition {
        intrinsics: CameraIntrinsics::from_matrix(&intrinsics),
        rotation: Rotation3::from_matrix_unchecked(rotation),
        translation,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use calibro_core::nalgebra::{Matrix3x4, Point2, Vector2, Vector3};

    fn sample_camera() -> CameraDecomposition {
        CameraDecomposition {
            intrinsics: CameraIntrinsics::identity()
                .focals(Vector2::new(800.0, 780.0))
                .skew(0.5)
                .principal_point(Point2::new(320.0, 240.0)),
            rotation: Rotation3::from_euler_angles(0.1, -0.2, 0.05),
            translation: Vector3::new(0.2, -0.1, 10.0),
        }
    }

    #[test]
    fn rq_factors() {
        #[rustfmt::skip]
        let m = Matrix3::new(
            2.0, -1.0, 0.5,
            0.3, 4.0, 1.0,
            -1.0, 0.2, 3.0,
        );
        let (upper, orthonormal) = rq(&m);
        assert_relative_eq!(upper * orthonormal, m, epsilon = 1e-12);
        assert_relative_eq!(
            orthonormal * orthonormal.transpose(),
            Matrix3::identity(),
            epsilon = 1e-12
        );
        assert_relative_eq!(upper[(1, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(upper[(2, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(upper[(2, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn recovers_known_camera() {
        let camera = sample_camera();
        let decomposed = decompose_projection(&camera.projection()).unwrap();
        assert_relative_eq!(
            decomposed.intrinsics.matrix(),
            camera.intrinsics.matrix(),
            max_relative = 1e-9
        );
        assert_relative_eq!(decomposed.rotation, camera.rotation, epsilon = 1e-9);
        assert_relative_eq!(decomposed.translation, camera.translation, epsilon = 1e-9);
    }

    #[test]
    fn recomposition_matches_after_normalization() {
        let camera = sample_camera();
        // An arbitrary negative scale still describes the same camera.
        let projection = ProjectionMatrix(camera.projection().0 * -0.037);
        let decomposed = decompose_projection(&projection).unwrap();

        assert!(decomposed.intrinsics.focals.x > 0.0);
        assert!(decomposed.intrinsics.focals.y > 0.0);
        assert_relative_eq!(decomposed.rotation.matrix().determinant(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(
            decomposed.projection().normalized().unwrap().0,
            projection.normalized().unwrap().0,
            max_relative = 1e-6
        );
    }

    #[test]
    fn singular_left_block_fails() {
        #[rustfmt::skip]
        let projection = ProjectionMatrix(Matrix3x4::new(
            1.0, 2.0, 3.0, 4.0,
            2.0, 4.0, 6.0, 1.0,
            0.0, 1.0, 0.0, 1.0,
        ));
        assert!(matches!(
            decompose_projection(&projection),
            Err(Error::Numerical(_))
        ));
    }
}
