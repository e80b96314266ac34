use crate::{CalibroSettings, Method};
use calibro_core::{nalgebra::Point2, Homography, ImageMatch, Result};
use calibro_dlt::HomographyDlt;
use calibro_optimize::{GeometricHomography, LevenbergMarquardtMinimizer};
use calibro_ransac::{Ransac, RansacOutcome};
use rand::Rng;

/// A homography together with the indices of the matches it explains.
pub type RobustHomography = RansacOutcome<Homography>;

fn geometric(settings: &CalibroSettings) -> GeometricHomography {
    GeometricHomography::new(
        HomographyDlt::new(),
        LevenbergMarquardtMinimizer::new(settings.refine),
    )
}

/// Estimates the homography taking each point of `a` to the point of `b` at the same index.
///
/// Every match is trusted. Use [`estimate_homography_ransac`] when some of them may be wrong.
pub fn estimate_homography(
    a: &[Point2<f64>],
    b: &[Point2<f64>],
    method: Method,
    settings: &CalibroSettings,
) -> Result<Homography> {
    let matches = ImageMatch::pair(a, b)?;
    match method {
        Method::Linear => HomographyDlt::new().from_matches(&matches),
        Method::Geometric => geometric(settings).from_matches(&matches),
    }
}

/// Estimates the homography taking `a` to `b` while ignoring matches that disagree with it.
///
/// Every RANSAC sample is fit with `method`, so [`Method::Geometric`] refines each candidate.
/// The returned homography is the best candidate itself; it is not refit to its inliers.
pub fn estimate_homography_ransac<R>(
    a: &[Point2<f64>],
    b: &[Point2<f64>],
    method: Method,
    settings: &CalibroSettings,
    rng: R,
) -> Result<RobustHomography>
where
    R: Rng,
{
    let matches = ImageMatch::pair(a, b)?;
    let mut ransac = Ransac::new(settings.ransac, rng);
    match method {
        Method::Linear => ransac.estimate(&HomographyDlt::new(), &matches),
        Method::Geometric => ransac.estimate(&geometric(settings), &matches),
    }
}
