use calibro_core::{
    nalgebra::{Matrix3, Matrix3x4, Matrix4, Point2, Point3, Vector2, Vector3},
    Error, Homography, ImageMatch, ProjectionMatrix, Result, WorldImageMatch,
};
use core::f64::consts::SQRT_2;

// `core::f64::consts::SQRT_3` is not stable yet.
const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// A translation followed by a uniform scale of the plane: `p ↦ scale * (p - centroid)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Similarity2 {
    pub scale: f64,
    pub centroid: Point2<f64>,
}

impl Similarity2 {
    /// Computes the transform that moves the centroid of `points` to the origin and makes their
    /// mean distance from it `√2`.
    pub fn conditioning(points: &[Point2<f64>]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InsufficientCorrespondences {
                required: 1,
                actual: 0,
            });
        }
        let n = points.len() as f64;
        let centroid = Point2::from(points.iter().map(|p| p.coords).sum::<Vector2<f64>>() / n);
        let mean_distance = points.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n;
        if !mean_distance.is_normal() {
            return Err(Error::DegenerateConfiguration(
                "image points are coincident",
            ));
        }
        Ok(Self {
            scale: SQRT_2 / mean_distance,
            centroid,
        })
    }

    pub fn apply(&self, point: &Point2<f64>) -> Point2<f64> {
        Point2::from((point - self.centroid) * self.scale)
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        let s = self.scale;
        let c = self.centroid;
        Matrix3::new(
            s,   0.0, -s * c.x,
            0.0, s,   -s * c.y,
            0.0, 0.0, 1.0,
        )
    }

    #[rustfmt::skip]
    pub fn inverse_matrix(&self) -> Matrix3<f64> {
        let r = self.scale.recip();
        let c = self.centroid;
        Matrix3::new(
            r,   0.0, c.x,
            0.0, r,   c.y,
            0.0, 0.0, 1.0,
        )
    }
}

/// A translation followed by a uniform scale of space: `p ↦ scale * (p - centroid)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Similarity3 {
    pub scale: f64,
    pub centroid: Point3<f64>,
}

impl Similarity3 {
    /// Computes the transform that moves the centroid of `points` to the origin and makes their
    /// mean distance from it `√3`.
    pub fn conditioning(points: &[Point3<f64>]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InsufficientCorrespondences {
                required: 1,
                actual: 0,
            });
        }
        let n = points.len() as f64;
        let centroid = Point3::from(points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / n);
        let mean_distance = points.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n;
        if !mean_distance.is_normal() {
            return Err(Error::DegenerateConfiguration(
                "world points are coincident",
            ));
        }
        Ok(Self {
            scale: SQRT_3 / mean_distance,
            centroid,
        })
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from((point - self.centroid) * self.scale)
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix4<f64> {
        let s = self.scale;
        let c = self.centroid;
        Matrix4::new(
            s,   0.0, 0.0, -s * c.x,
            0.0, s,   0.0, -s * c.y,
            0.0, 0.0, s,   -s * c.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    #[rustfmt::skip]
    pub fn inverse_matrix(&self) -> Matrix4<f64> {
        let r = self.scale.recip();
        let c = self.centroid;
        Matrix4::new(
            r,   0.0, 0.0, c.x,
            0.0, r,   0.0, c.y,
            0.0, 0.0, r,   c.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

/// Conditions a 2d point set, returning the moved points and the transform that moved them.
pub fn normalize_points2(points: &[Point2<f64>]) -> Result<(Vec<Point2<f64>>, Similarity2)> {
    let transform = Similarity2::conditioning(points)?;
    Ok((points.iter().map(|p| transform.apply(p)).collect(), transform))
}

/// Conditions a 3d point set, returning the moved points and the transform that moved them.
pub fn normalize_points3(points: &[Point3<f64>]) -> Result<(Vec<Point3<f64>>, Similarity3)> {
    let transform = Similarity3::conditioning(points)?;
    Ok((points.iter().map(|p| transform.apply(p)).collect(), transform))
}

/// Image matches with both sides conditioned independently.
///
/// The transforms are kept so that a homography estimated between the conditioned point sets
/// can be mapped back to pixel coordinates, and so that an existing homography can be moved into
/// the conditioned frames for refinement.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedMatches {
    /// Conditions image A.
    pub from: Similarity2,
    /// Conditions image B.
    pub to: Similarity2,
    pub matches: Vec<ImageMatch>,
}

impl NormalizedMatches {
    pub fn new(matches: &[ImageMatch]) -> Result<Self> {
        let a: Vec<Point2<f64>> = matches.iter().map(|m| m.0).collect();
        let b: Vec<Point2<f64>> = matches.iter().map(|m| m.1).collect();
        let (a, from) = normalize_points2(&a)?;
        let (b, to) = normalize_points2(&b)?;
        Ok(Self {
            from,
            to,
            matches: a.into_iter().zip(b).map(|(a, b)| ImageMatch(a, b)).collect(),
        })
    }

    /// Moves a pixel homography into the conditioned frames: `T2 * H * T1⁻¹`.
    pub fn normalize(&self, homography: &Homography) -> Matrix3<f64> {
        self.to.matrix() * homography.0 * self.from.inverse_matrix()
    }

    /// Moves a conditioned homography back to pixels, `T2⁻¹ * Ĥ * T1`, normalized so that its
    /// bottom-right entry is `1.0`.
    pub fn denormalize(&self, normalized: &Matrix3<f64>) -> Result<Homography> {
        Homography(self.to.inverse_matrix() * normalized * self.from.matrix()).normalized()
    }
}

/// World to image matches with the world points and image points conditioned independently.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedWorldMatches {
    pub world: Similarity3,
    pub image: Similarity2,
    pub matches: Vec<WorldImageMatch>,
}

impl NormalizedWorldMatches {
    pub fn new(matches: &[WorldImageMatch]) -> Result<Self> {
        let world: Vec<Point3<f64>> = matches.iter().map(|m| m.0).collect();
        let image: Vec<Point2<f64>> = matches.iter().map(|m| m.1).collect();
        let (world_points, world) = normalize_points3(&world)?;
        let (image_points, image) = normalize_points2(&image)?;
        Ok(Self {
            world,
            image,
            matches: world_points
                .into_iter()
                .zip(image_points)
                .map(|(w, i)| WorldImageMatch(w, i))
                .collect(),
        })
    }

    /// Moves a conditioned projection matrix back to world and pixel units, `T2d⁻¹ * P̂ * T3d`,
    /// normalized so that its bottom-right entry is `1.0`.
    pub fn denormalize(&self, normalized: &Matrix3x4<f64>) -> Result<ProjectionMatrix> {
        ProjectionMatrix(self.image.inverse_matrix() * normalized * self.world.matrix()).normalized()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    fn mean_distance2(points: &[Point2<f64>]) -> f64 {
        points.iter().map(|p| p.coords.norm()).sum::<f64>() / points.len() as f64
    }

    fn random_pixels(rng: &mut SmallRng, count: usize) -> Vec<Point2<f64>> {
        (0..count)
            .map(|_| Point2::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0)))
            .collect()
    }

    #[test]
    fn conditioned_2d_points_are_centered_and_scaled() {
        let mut rng = SmallRng::seed_from_u64(0);
        let (points, transform) = normalize_points2(&random_pixels(&mut rng, 50)).unwrap();
        let centroid = points.iter().map(|p| p.coords).sum::<Vector2<f64>>() / points.len() as f64;
        assert!(centroid.norm() < 1e-9);
        assert_relative_eq!(mean_distance2(&points), SQRT_2, epsilon = 1e-9);
        assert_relative_eq!(
            transform.matrix() * transform.inverse_matrix(),
            Matrix3::identity(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn conditioned_3d_points_are_centered_and_scaled() {
        let mut rng = SmallRng::seed_from_u64(1);
        let world: Vec<Point3<f64>> = (0..30)
            .map(|_| Point3::new(rng.gen(), rng.gen::<f64>() * 4.0, rng.gen::<f64>() - 7.0))
            .collect();
        let (points, transform) = normalize_points3(&world).unwrap();
        let centroid = points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / points.len() as f64;
        assert!(centroid.norm() < 1e-9);
        let mean = points.iter().map(|p| p.coords.norm()).sum::<f64>() / points.len() as f64;
        assert_relative_eq!(mean, SQRT_3, epsilon = 1e-9);
        let homogeneous = transform.matrix() * world[3].to_homogeneous();
        assert_relative_eq!(
            Point3::from_homogeneous(homogeneous).unwrap(),
            points[3],
            epsilon = 1e-12
        );
    }

    #[test]
    fn conditioning_twice_is_near_identity() {
        let mut rng = SmallRng::seed_from_u64(2);
        let (points, _) = normalize_points2(&random_pixels(&mut rng, 20)).unwrap();
        let again = Similarity2::conditioning(&points).unwrap();
        assert_relative_eq!(again.matrix(), Matrix3::identity(), epsilon = 1e-9);
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let points = [Point2::new(3.0, 4.0); 5];
        assert!(matches!(
            Similarity2::conditioning(&points),
            Err(Error::DegenerateConfiguration(_))
        ));
        assert!(matches!(
            Similarity3::conditioning(&[]),
            Err(Error::InsufficientCorrespondences { .. })
        ));
    }

    #[test]
    fn homography_survives_the_conditioned_frames() {
        let mut rng = SmallRng::seed_from_u64(3);
        let a = random_pixels(&mut rng, 10);
        let b = random_pixels(&mut rng, 10);
        let matches = NormalizedMatches::new(&ImageMatch::pair(&a, &b).unwrap()).unwrap();
        #[rustfmt::skip]
        let h = Homography(Matrix3::new(
            1.1,  0.02, 5.0,
            -0.01, 0.9, -3.0,
            1e-4, 2e-4, 1.0,
        ));
        let back = matches.denormalize(&matches.normalize(&h)).unwrap();
        assert_relative_eq!(back.0, h.0, epsilon = 1e-9);
    }
}
