use crate::{Error, Result};
use nalgebra::{Point2, Point3};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A pixel in image A matched to a pixel in image B.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct ImageMatch(pub Point2<f64>, pub Point2<f64>);

/// A point in the world matched to the pixel it was observed at.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct WorldImageMatch(pub Point3<f64>, pub Point2<f64>);

impl ImageMatch {
    /// Pairs two point lists by index.
    ///
    /// Returns [`Error::MismatchedLengths`] if the lists differ in length.
    pub fn pair(a: &[Point2<f64>], b: &[Point2<f64>]) -> Result<Vec<Self>> {
        check_lengths(a.len(), b.len())?;
        Ok(a.iter().zip(b).map(|(&a, &b)| Self(a, b)).collect())
    }
}

impl WorldImageMatch {
    /// Pairs world points with their image observations by index.
    ///
    /// Returns [`Error::MismatchedLengths`] if the lists differ in length.
    pub fn pair(world: &[Point3<f64>], image: &[Point2<f64>]) -> Result<Vec<Self>> {
        check_lengths(world.len(), image.len())?;
        Ok(world
            .iter()
            .zip(image)
            .map(|(&world, &image)| Self(world, image))
            .collect())
    }
}

fn check_lengths(left: usize, right: usize) -> Result<()> {
    if left == right {
        Ok(())
    } else {
        Err(Error::MismatchedLengths { left, right })
    }
}
