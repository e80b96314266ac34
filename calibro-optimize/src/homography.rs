use crate::{LevenbergMarquardtMinimizer, Minimizer, RefineReport, ResidualProblem};
use calibro_core::{
    nalgebra::{DVector, Matrix3},
    sample_consensus::Estimator,
    transfer, Error, Homography, ImageMatch, Result,
};
use calibro_dlt::HomographyDlt;
use calibro_geom::NormalizedMatches;
use log::trace;

/// The symmetric transfer error of a homography.
///
/// The parameters are the 9 entries of the homography in row-major order. Every match
/// contributes the forward residual `H * a - b` and the backward residual `H⁻¹ * b - a`, so the
/// objective is the sum of squared forward and backward transfer distances.
#[derive(Debug, Clone, Copy)]
pub struct SymmetricTransferError<'a> {
    matches: &'a [ImageMatch],
}

impl<'a> SymmetricTransferError<'a> {
    pub fn new(matches: &'a [ImageMatch]) -> Self {
        Self { matches }
    }

    pub fn params(homography: &Matrix3<f64>) -> DVector<f64> {
        DVector::from_iterator(9, homography.transpose().iter().copied())
    }

    pub fn homography(params: &DVector<f64>) -> Matrix3<f64> {
        Matrix3::from_row_slice(params.as_slice())
    }
}

impl<'a> ResidualProblem for SymmetricTransferError<'a> {
    fn residuals(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
        if params.len() != 9 {
            return None;
        }
        let homography = Self::homography(params);
        let inverse = homography.try_inverse()?;
        let mut residuals = Vec::with_capacity(4 * self.matches.len());
        for ImageMatch(a, b) in self.matches {
            let forward = transfer(&homography, a)? - b;
            let backward = transfer(&inverse, b)? - a;
            residuals.extend([forward.x, forward.y, backward.x, backward.y]);
        }
        Some(DVector::from_vec(residuals))
    }
}

/// Refines `initial` by minimizing the symmetric transfer error over `matches`.
///
/// The minimization happens between the conditioned frames of the matches.
pub fn refine_homography<M>(
    minimizer: &M,
    matches: &[ImageMatch],
    initial: &Homography,
) -> Result<(Homography, RefineReport)>
where
    M: Minimizer,
{
    let normalized = NormalizedMatches::new(matches)?;
    refine_normalized_homography(minimizer, &normalized, &normalized.normalize(initial))
}

/// Refines a homography expressed between the conditioned frames of `normalized`, then moves
/// it back to pixels with the same conditioning transforms.
pub fn refine_normalized_homography<M>(
    minimizer: &M,
    normalized: &NormalizedMatches,
    initial: &Matrix3<f64>,
) -> Result<(Homography, RefineReport)>
where
    M: Minimizer,
{
    let problem = SymmetricTransferError::new(&normalized.matches);
    let (params, report) = minimizer.minimize(&problem, SymmetricTransferError::params(initial));
    let homography = normalized.denormalize(&SymmetricTransferError::homography(&params))?;
    Ok((homography, report))
}

/// Estimates a homography with the linear solve followed by a symmetric transfer error
/// refinement.
///
/// The conditioning transforms of the linear solve are reused by the refinement.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometricHomography<M = LevenbergMarquardtMinimizer> {
    pub dlt: HomographyDlt,
    pub minimizer: M,
}

impl<M> GeometricHomography<M>
where
    M: Minimizer,
{
    pub fn new(dlt: HomographyDlt, minimizer: M) -> Self {
        Self { dlt, minimizer }
    }

    pub fn from_matches(&self, matches: &[ImageMatch]) -> Result<Homography> {
        if matches.len() < HomographyDlt::MIN_MATCHES {
            return Err(Error::InsufficientCorrespondences {
                required: HomographyDlt::MIN_MATCHES,
                actual: matches.len(),
            });
        }
        let normalized = NormalizedMatches::new(matches)?;
        let initial = self.dlt.from_normalized(&normalized)?;
        let (homography, report) =
            refine_normalized_homography(&self.minimizer, &normalized, &initial)?;
        trace!(
            "refined homography cost {} -> {}",
            report.initial_cost,
            report.final_cost
        );
        Ok(homography)
    }
}

impl<M> Estimator<ImageMatch> for GeometricHomography<M>
where
    M: Minimizer,
{
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
