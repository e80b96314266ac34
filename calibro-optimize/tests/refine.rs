use approx::assert_relative_eq;
use calibro_core::{
    nalgebra::{Matrix3, Point2, Point3, Rotation3, Vector2, Vector3},
    sample_consensus::{Estimator, Model},
    CameraIntrinsics, Homography, ImageMatch, ProjectionMatrix, WorldImageMatch,
};
use calibro_dlt::{CameraDlt, HomographyDlt};
use calibro_optimize::{
    refine_homography, refine_projection, GeometricHomography, LevenbergMarquardtMinimizer,
    ResidualProblem, SymmetricReprojectionError, SymmetricTransferError,
};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use rand_distr::Normal;

const SAMPLE_POINTS: usize = 30;
const PIXEL_NOISE: f64 = 0.5;

fn known_camera() -> ProjectionMatrix {
    ProjectionMatrix::from_parts(
        &CameraIntrinsics::identity()
            .focals(Vector2::new(800.0, 780.0))
            .principal_point(Point2::new(320.0, 240.0)),
        &Rotation3::from_euler_angles(-0.1, 0.15, 0.3),
        &Vector3::new(-0.3, 0.2, 8.0),
    )
}

#[rustfmt::skip]
fn known_homography() -> Homography {
    Homography(Matrix3::new(
        0.9,   -0.1,  30.0,
        0.08,  1.05,  -12.0,
        -2e-4, 1e-4,  1.0,
    ))
}

fn noisy(rng: &mut SmallRng, point: Point2<f64>, sigma: f64) -> Point2<f64> {
    let normal = Normal::new(0.0, sigma).unwrap();
    point + Vector2::new(rng.sample(normal), rng.sample(normal))
}

fn image_matches(rng: &mut SmallRng, sigma: f64) -> Vec<ImageMatch> {
    let homography = known_homography();
    (0..SAMPLE_POINTS)
        .map(|_| {
            let a = Point2::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0));
            let b = homography.transfer(&a).unwrap();
            ImageMatch(a, noisy(rng, b, sigma))
        })
        .collect()
}

fn world_matches(rng: &mut SmallRng, sigma: f64) -> Vec<WorldImageMatch> {
    let projection = known_camera();
    (0..SAMPLE_POINTS)
        .map(|_| {
            let world = Point3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            let image = projection.project(&world).unwrap();
            WorldImageMatch(world, noisy(rng, image, sigma))
        })
        .collect()
}

#[test]
fn geometric_homography_on_noise_free_points() {
    let mut rng = SmallRng::seed_from_u64(0);
    let matches = image_matches(&mut rng, 0.0);
    let estimate = GeometricHomography::<LevenbergMarquardtMinimizer>::default()
        .from_matches(&matches)
        .unwrap();
    assert_relative_eq!(
        estimate.0,
        known_homography().0,
        epsilon = 1e-6,
        max_relative = 1e-6
    );
}

#[test]
fn geometric_homography_estimator_on_minimal_sample() {
    let mut rng = SmallRng::seed_from_u64(1);
    let matches = image_matches(&mut rng, 0.0);
    let estimate = GeometricHomography::<LevenbergMarquardtMinimizer>::default()
        .estimate(matches.iter().copied().take(4))
        .expect("didn't get a homography");
    for m in &matches {
        assert!(estimate.residual(m) < 1e-5);
    }
}

#[test]
fn homography_refinement_never_increases_cost() {
    let mut rng = SmallRng::seed_from_u64(2);
    let matches = image_matches(&mut rng, PIXEL_NOISE);
    let linear = HomographyDlt::new().from_matches(&matches).unwrap();
    let (refined, report) =
        refine_homography(&LevenbergMarquardtMinimizer::default(), &matches, &linear).unwrap();
    assert!(report.final_cost <= report.initial_cost);
    assert_relative_eq!(refined[(2, 2)], 1.0);

    // The refined homography still explains the noisy matches.
    let total_error = matches.iter().map(|m| refined.residual(m)).sum::<f64>();
    let mean_error = total_error / matches.len() as f64;
    assert!(mean_error < 4.0 * PIXEL_NOISE);
}

#[test]
fn transfer_residuals_are_symmetric() {
    let matches = [ImageMatch(Point2::new(1.0, 2.0), Point2::new(4.0, 6.0))];
    let problem = SymmetricTransferError::new(&matches);
    let residuals = problem
        .residuals(&SymmetricTransferError::params(&Matrix3::identity()))
        .unwrap();
    assert_eq!(residuals.as_slice(), &[-3.0, -4.0, 3.0, 4.0]);
    assert_relative_eq!(
        problem
            .cost(&SymmetricTransferError::params(&Matrix3::identity()))
            .unwrap(),
        50.0
    );
}

#[test]
fn homography_refinement_recovers_from_a_perturbed_start() {
    let mut rng = SmallRng::seed_from_u64(3);
    let matches = image_matches(&mut rng, 0.0);
    let mut start = known_homography();
    start[(0, 2)] += 4.0;
    start[(1, 0)] -= 0.02;
    let (refined, report) =
        refine_homography(&LevenbergMarquardtMinimizer::default(), &matches, &start).unwrap();
    assert!(report.final_cost < report.initial_cost);
    for m in &matches {
        assert!(refined.residual(m) < 1e-4);
    }
}

#[test]
fn camera_refinement_never_increases_cost() {
    let mut rng = SmallRng::seed_from_u64(4);
    let matches = world_matches(&mut rng, PIXEL_NOISE);
    let linear = CameraDlt::new().from_matches(&matches).unwrap();
    let (refined, report) =
        refine_projection(&LevenbergMarquardtMinimizer::default(), &matches, &linear).unwrap();
    assert!(report.final_cost <= report.initial_cost);
    assert_relative_eq!(refined[(2, 3)], 1.0);

    let problem = SymmetricReprojectionError::new(&matches);
    let after = problem
        .cost(&SymmetricReprojectionError::params(&refined))
        .unwrap();
    assert!(after <= report.initial_cost * (1.0 + 1e-6));
}

#[test]
fn camera_residuals_vanish_forward_for_the_true_camera() {
    let mut rng = SmallRng::seed_from_u64(5);
    let matches = world_matches(&mut rng, 0.0);
    let problem = SymmetricReprojectionError::new(&matches);
    let residuals = problem
        .residuals(&SymmetricReprojectionError::params(&known_camera()))
        .unwrap();
    assert_eq!(residuals.len(), 5 * SAMPLE_POINTS);
    for chunk in residuals.as_slice().chunks(5) {
        assert!(chunk[0].abs() < 1e-9);
        assert!(chunk[1].abs() < 1e-9);
    }
}
