//! The normalized direct linear transform.
//!
//! Both estimators in this crate work the same way. The correspondences are conditioned with
//! [`calibro_geom::normalize`], every correspondence contributes two rows to a homogeneous linear
//! system `A * h = 0`, and the solution is the right singular vector of `A` belonging to its
//! smallest singular value. The solution is then moved back to the original units and rescaled
//! so that its bottom-right entry is `1.0`.

use calibro_core::{
    nalgebra::{DMatrix, DVector, Matrix3, Matrix3x4},
    sample_consensus::Estimator,
    Error, Homography, ImageMatch, ProjectionMatrix, Result, WorldImageMatch,
};
use calibro_geom::{NormalizedMatches, NormalizedWorldMatches};
use float_ord::FloatOrd;
use log::trace;

/// Singular values at or below this times the largest one do not count towards the rank.
const RANK_TOLERANCE: f64 = 1e-10;

/// A conditioned homography with `|det|` at or below this is treated as singular.
///
/// The conditioned homography is a unit vector, so this is an absolute bound.
const SINGULAR_HOMOGRAPHY: f64 = 1e-8;

/// Finds the unit vector spanning the null space of `design`.
///
/// `design` must have at least as many rows as columns. The null space must be one dimensional,
/// otherwise the solution would not be unique.
fn null_vector(design: DMatrix<f64>, epsilon: f64, max_iterations: usize) -> Result<DVector<f64>> {
    let unknowns = design.ncols();
    let svd = design
        .try_svd_unordered(false, true, epsilon, max_iterations)
        .ok_or(Error::Numerical("SVD did not converge"))?;

    let largest = svd
        .singular_values
        .iter()
        .copied()
        .max_by_key(|&s| FloatOrd(s))
        .unwrap_or(0.0);
    let rank = svd
        .singular_values
        .iter()
        .filter(|&&s| s > RANK_TOLERANCE * largest)
        .count();
    if rank + 1 < unknowns {
        return Err(Error::RankDeficient {
            rank,
            required: unknowns - 1,
        });
    }

    let smallest = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by_key(|&(_, &s)| FloatOrd(s))
        .map(|(ix, _)| ix)
        .ok_or(Error::Numerical("SVD produced no singular values"))?;
    let v_t = svd
        .v_t
        .ok_or(Error::Numerical("SVD did not produce right singular vectors"))?;
    Ok(v_t.row(smallest).transpose())
}

/// Allocates a design matrix with two rows per correspondence, padded with zero rows up to a
/// square matrix so that the full right singular basis is always produced.
fn design_matrix(correspondences: usize, unknowns: usize) -> DMatrix<f64> {
    DMatrix::zeros((2 * correspondences).max(unknowns), unknowns)
}

/// Estimates a [`ProjectionMatrix`] from world to image matches.
///
/// At least 6 matches that do not all lie on a plane are required.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraDlt {
    pub epsilon: f64,
    pub max_iterations: usize,
}

impl CameraDlt {
    pub const MIN_MATCHES: usize = 6;

    pub fn new() -> Self {
        Default::default()
    }

    /// Set the epsilon used in the SVD.
    ///
    /// Default is `1e-12`.
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Set the maximum number of iterations of the SVD.
    ///
    /// Default is `1000`.
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    pub fn from_matches(&self, matches: &[WorldImageMatch]) -> Result<ProjectionMatrix> {
        if matches.len() < Self::MIN_MATCHES {
            return Err(Error::InsufficientCorrespondences {
                required: Self::MIN_MATCHES,
                actual: matches.len(),
            });
        }
        let normalized = NormalizedWorldMatches::new(matches)?;
        let projection = self.from_normalized(&normalized)?;
        normalized.denormalize(&projection)
    }

    /// Solves for the projection matrix between the conditioned frames.
    pub fn from_normalized(&self, normalized: &NormalizedWorldMatches) -> Result<Matrix3x4<f64>> {
        let mut design = design_matrix(normalized.matches.len(), 12);
        for (i, WorldImageMatch(world, image)) in normalized.matches.iter().enumerate() {
            let (wx, wy, wz) = (world.x, world.y, world.z);
            let (x, y) = (image.x, image.y);
            design.row_mut(2 * i).copy_from_slice(&[
                wx, wy, wz, 1.0, 0.0, 0.0, 0.0, 0.0, -x * wx, -x * wy, -x * wz, -x,
            ]);
            design.row_mut(2 * i + 1).copy_from_slice(&[
                0.0, 0.0, 0.0, 0.0, wx, wy, wz, 1.0, -y * wx, -y * wy, -y * wz, -y,
            ]);
        }
        let solution = null_vector(design, self.epsilon, self.max_iterations)?;
        Ok(Matrix3x4::from_row_slice(solution.as_slice()))
    }
}

impl Default for CameraDlt {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            max_iterations: 1000,
        }
    }
}

/// Estimates a [`Homography`] from image to image matches.
///
/// At least 4 matches, no three of them collinear, are required.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HomographyDlt {
    pub epsilon: f64,
    pub max_iterations: usize,
}

impl HomographyDlt {
    pub const MIN_MATCHES: usize = 4;

    pub fn new() -> Self {
        Default::default()
    }

    /// Set the epsilon used in the SVD.
    ///
    /// Default is `1e-12`.
    #[must_use]
    pub fn epsilon(self, epsilon: f64) -> Self {
        Self { epsilon, ..self }
    }

    /// Set the maximum number of iterations of the SVD.
    ///
    /// Default is `1000`.
    #[must_use]
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    pub fn from_matches(&self, matches: &[ImageMatch]) -> Result<Homography> {
        if matches.len() < Self::MIN_MATCHES {
            return Err(Error::InsufficientCorrespondences {
                required: Self::MIN_MATCHES,
                actual: matches.len(),
            });
        }
        let normalized = NormalizedMatches::new(matches)?;
        let homography = self.from_normalized(&normalized)?;
        normalized.denormalize(&homography)
    }

    /// Solves for the homography between the conditioned frames.
    ///
    /// The result has unit Frobenius norm.
    pub fn from_normalized(&self, normalized: &NormalizedMatches) -> Result<Matrix3<f64>> {
        let mut design = design_matrix(normalized.matches.len(), 9);
        for (i, ImageMatch(a, b)) in normalized.matches.iter().enumerate() {
            let (x, y) = (a.x, a.y);
            let (u, v) = (b.x, b.y);
            design.row_mut(2 * i).copy_from_slice(&[
                -x, -y, -1.0, 0.0, 0.0, 0.0, x * u, y * u, u,
            ]);
            design.row_mut(2 * i + 1).copy_from_slice(&[
                0.0, 0.0, 0.0, -x, -y, -1.0, x * v, y * v, v,
            ]);
        }
        let solution = null_vector(design, self.epsilon, self.max_iterations)?;
        let homography = Matrix3::from_row_slice(solution.as_slice());
        if homography.determinant().abs() <= SINGULAR_HOMOGRAPHY {
            return Err(Error::DegenerateConfiguration("homography is singular"));
        }
        Ok(homography)
    }
}

impl Default for HomographyDlt {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            max_iterations: 1000,
        }
    }
}

impl Estimator<ImageMatch> for HomographyDlt {
    type Model = Homography;
    type ModelIter = Option<Homography>;
    const MIN_SAMPLES: usize = 4;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = ImageMatch> + Clone,
    {
        let matches: Vec<ImageMatch> = data.collect();
        self.from_matches(&matches)
            .map_err(|e| trace!("homography sample rejected: {}", e))
            .ok()
    }
}
