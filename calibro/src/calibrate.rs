use crate::{CalibroSettings, Method};
use calibro_core::{
    nalgebra::{Point2, Point3},
    CameraDecomposition, ProjectionMatrix, Result, WorldImageMatch,
};
use calibro_dlt::CameraDlt;
use calibro_geom::{cube_lines, decompose_projection, Line};
use calibro_optimize::{refine_projection, LevenbergMarquardtMinimizer, RefineReport};
use log::debug;

/// A calibrated camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCalibration {
    /// The estimated projection, normalized so that its bottom-right entry is `1.0`.
    pub projection: ProjectionMatrix,
    /// The projection factored into intrinsics, rotation, and translation.
    pub camera: CameraDecomposition,
    /// The edges of the reference cube projected into the image.
    pub lines: [Line; 12],
    /// Present when the linear estimate was refined.
    pub refinement: Option<RefineReport>,
}

/// Estimates the camera that took `image` points of the `world` points.
///
/// `world[i]` must be seen at `image[i]`. At least six correspondences are needed, and the world
/// points must not all lie on one plane.
pub fn calibrate_camera(
    world: &[Point3<f64>],
    image: &[Point2<f64>],
    method: Method,
    settings: &CalibroSettings,
) -> Result<CameraCalibration> {
    let matches = WorldImageMatch::pair(world, image)?;
    let linear = CameraDlt::new().from_matches(&matches)?;
    debug!("linear projection estimate {:?}", linear);

    let (projection, refinement) = match method {
        Method::Linear => (linear, None),
        Method::Geometric => {
            let minimizer = LevenbergMarquardtMinimizer::new(settings.refine);
            let (projection, report) = refine_projection(&minimizer, &matches, &linear)?;
            debug!(
                "refined projection cost {} -> {} after {} evaluations",
                report.initial_cost, report.final_cost, report.evaluations
            );
            (projection, Some(report))
        }
    };

    let camera = decompose_projection(&projection)?;
    let lines = cube_lines(&projection)?;
    Ok(CameraCalibration {
        projection,
        camera,
        lines,
        refinement,
    })
}
