use calibro_core::{
    nalgebra::{Point2, Point3},
    ProjectionMatrix, Result,
};

/// Side length of the reference cube, in world units.
pub const CUBE_SIDE: f64 = 3.0;

/// Corners of the axis-aligned reference cube anchored at the world origin.
///
/// The first four corners form the face on the `z = 0` plane, the last four the opposite face.
pub const CUBE_CORNERS: [[f64; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [CUBE_SIDE, 0.0, 0.0],
    [CUBE_SIDE, CUBE_SIDE, 0.0],
    [0.0, CUBE_SIDE, 0.0],
    [0.0, 0.0, CUBE_SIDE],
    [CUBE_SIDE, 0.0, CUBE_SIDE],
    [CUBE_SIDE, CUBE_SIDE, CUBE_SIDE],
    [0.0, CUBE_SIDE, CUBE_SIDE],
];

/// Edges of the reference cube as pairs of indices into [`CUBE_CORNERS`].
pub const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// A line segment in the image.
pub type Line = [Point2<f64>; 2];

/// Projects the edges of the reference cube through `projection`.
///
/// The edges are returned in the order of [`CUBE_EDGES`]. Fails if a corner projects to infinity.
pub fn cube_lines(projection: &ProjectionMatrix) -> Result<[Line; 12]> {
    let mut corners = [Point2::origin(); 8];
    for (corner, &[x, y, z]) in corners.iter_mut().zip(CUBE_CORNERS.iter()) {
        *corner = projection.project(&Point3::new(x, y, z))?;
    }
    Ok(CUBE_EDGES.map(|(a, b)| [corners[a], corners[b]]))
}
