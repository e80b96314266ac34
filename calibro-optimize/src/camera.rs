use crate::{Minimizer, RefineReport, ResidualProblem};
use calibro_core::{
    nalgebra::{DVector, Matrix3x4, Point2},
    ProjectionMatrix, Result, WorldImageMatch,
};

/// Added to the homogeneous coordinate of a back-projected point before dividing by it.
pub const BACKPROJECTION_EPSILON: f64 = 1e-10;

/// Singular values below this are dropped from the pseudo-inverse.
const PSEUDO_INVERSE_EPSILON: f64 = 1e-12;

/// The symmetric reprojection error of a projection matrix.
///
/// The parameters are the 12 entries of `P` in row-major order. Every match contributes:
///
/// * the forward residual: the world point projected by `P`, minus the observed pixel
/// * the backward residual: the pseudo-inverse of `P` applied to the homogeneous pixel,
///   dehomogenized with [`BACKPROJECTION_EPSILON`], minus the world point
///
/// Both are evaluated in the original pixel and world units.
#[derive(Debug, Clone, Copy)]
pub struct SymmetricReprojectionError<'a> {
    matches: &'a [WorldImageMatch],
}

impl<'a> SymmetricReprojectionError<'a> {
    pub fn new(matches: &'a [WorldImageMatch]) -> Self {
        Self { matches }
    }

    pub fn params(projection: &Matrix3x4<f64>) -> DVector<f64> {
        DVector::from_iterator(12, projection.transpose().iter().copied())
    }

    pub fn projection(params: &DVector<f64>) -> Matrix3x4<f64> {
        Matrix3x4::from_row_slice(params.as_slice())
    }
}

impl<'a> ResidualProblem for SymmetricReprojectionError<'a> {
    fn residuals(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
        if params.len() != 12 {
            return None;
        }
        let projection = Self::projection(params);
        let pseudo_inverse = projection.pseudo_inverse(PSEUDO_INVERSE_EPSILON).ok()?;
        let mut residuals = Vec::with_capacity(5 * self.matches.len());
        for WorldImageMatch(world, image) in self.matches {
            let forward = Point2::from_homogeneous(projection * world.to_homogeneous())? - image;
            let back = pseudo_inverse * image.to_homogeneous();
            let backward = back.xyz() / (back.w + BACKPROJECTION_EPSILON) - world.coords;
            residuals.extend([forward.x, forward.y, backward.x, backward.y, backward.z]);
        }
        Some(DVector::from_vec(residuals))
    }
}

/// Refines `initial` by minimizing the symmetric reprojection error over `matches`.
///
/// The result is normalized so that its bottom-right entry is `1.0`.
pub fn refine_projection<M>(
    minimizer: &M,
    matches: &[WorldImageMatch],
    initial: &ProjectionMatrix,
) -> Result<(ProjectionMatrix, RefineReport)>
where
    M: Minimizer,
{
    let problem = SymmetricReprojectionError::new(matches);
    let (params, report) =
        minimizer.minimize(&problem, SymmetricReprojectionError::params(initial));
    let projection = ProjectionMatrix(SymmetricReprojectionError::projection(&params)).normalized()?;
    Ok((projection, report))
}
