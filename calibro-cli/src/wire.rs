//! The JSON requests and responses of the command line.

use calibro::{
    nalgebra::{Point2, Point3, SMatrix},
    CameraCalibration, Homography, Method, ParseMethodError, RobustHomography,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CalibrateRequest {
    #[serde(rename = "points3D")]
    pub world: Vec<[f64; 3]>,
    #[serde(rename = "points2D")]
    pub image: Vec<[f64; 2]>,
    #[serde(default)]
    pub method: Option<String>,
}

impl CalibrateRequest {
    pub fn world(&self) -> Vec<Point3<f64>> {
        self.world.iter().map(|&p| Point3::from(p)).collect()
    }

    pub fn image(&self) -> Vec<Point2<f64>> {
        points2(&self.image)
    }

    pub fn method(&self) -> Result<Method, ParseMethodError> {
        parse_method(self.method.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HomographyRequest {
    #[serde(rename = "imageA")]
    pub a: Vec<[f64; 2]>,
    #[serde(rename = "imageB")]
    pub b: Vec<[f64; 2]>,
    #[serde(default)]
    pub method: Option<String>,
}

impl HomographyRequest {
    pub fn a(&self) -> Vec<Point2<f64>> {
        points2(&self.a)
    }

    pub fn b(&self) -> Vec<Point2<f64>> {
        points2(&self.b)
    }

    pub fn method(&self) -> Result<Method, ParseMethodError> {
        parse_method(self.method.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrateResponse {
    #[serde(rename = "P")]
    pub projection: [[f64; 4]; 3],
    #[serde(rename = "K")]
    pub intrinsics: [[f64; 3]; 3],
    #[serde(rename = "R")]
    pub rotation: [[f64; 3]; 3],
    pub t: [f64; 3],
    pub lines: Vec<[[f64; 2]; 2]>,
}

impl From<&CameraCalibration> for CalibrateResponse {
    fn from(calibration: &CameraCalibration) -> Self {
        let camera = &calibration.camera;
        Self {
            projection: rows(&calibration.projection.0),
            intrinsics: rows(&camera.intrinsics.matrix()),
            rotation: rows(camera.rotation.matrix()),
            t: camera.translation.into(),
            lines: calibration
                .lines
                .iter()
                .map(|[from, to]| [[from.x, from.y], [to.x, to.y]])
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomographyResponse {
    #[serde(rename = "H")]
    pub homography: [[f64; 3]; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inliers: Option<Vec<usize>>,
    #[serde(rename = "inlierCount", skip_serializing_if = "Option::is_none")]
    pub inlier_count: Option<usize>,
}

impl From<&Homography> for HomographyResponse {
    fn from(homography: &Homography) -> Self {
        Self {
            homography: rows(&homography.0),
            inliers: None,
            inlier_count: None,
        }
    }
}

impl From<&RobustHomography> for HomographyResponse {
    fn from(outcome: &RobustHomography) -> Self {
        Self {
            homography: rows(&outcome.model.0),
            inliers: Some(outcome.inliers.clone()),
            inlier_count: Some(outcome.inlier_count()),
        }
    }
}

fn parse_method(method: Option<&str>) -> Result<Method, ParseMethodError> {
    method.map_or(Ok(Method::default()), str::parse)
}

fn points2(points: &[[f64; 2]]) -> Vec<Point2<f64>> {
    points.iter().map(|&p| Point2::from(p)).collect()
}

fn rows<const R: usize, const C: usize>(matrix: &SMatrix<f64, R, C>) -> [[f64; C]; R] {
    let mut rows = [[0.0; C]; R];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, entry) in row.iter_mut().enumerate() {
            *entry = matrix[(r, c)];
        }
    }
    rows
}

#[cfg(test)]
mod test {
    use super::*;
    use calibro::{
        calibrate_camera,
        nalgebra::{Matrix3, Rotation3, Vector3},
        CalibroSettings, CameraIntrinsics, ProjectionMatrix,
    };
    use serde_json::json;

    #[test]
    fn method_names_are_case_insensitive() {
        let request: HomographyRequest = serde_json::from_value(json!({
            "imageA": [[0.0, 0.0]],
            "imageB": [[1.0, 1.0]],
            "method": "Linear",
        }))
        .unwrap();
        assert_eq!(request.method(), Ok(Method::Linear));
        assert_eq!(request.a(), vec![Point2::new(0.0, 0.0)]);

        let request: HomographyRequest =
            serde_json::from_value(json!({"imageA": [], "imageB": []})).unwrap();
        assert_eq!(request.method(), Ok(Method::Geometric));

        let request: HomographyRequest = serde_json::from_value(json!({
            "imageA": [],
            "imageB": [],
            "method": "bundle",
        }))
        .unwrap();
        assert!(request.method().is_err());
    }

    #[test]
    #[rustfmt::skip]
    fn homography_rows_are_row_major() {
        let homography = Homography(Matrix3::new(
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 1.0,
        ));
        let response = HomographyResponse::from(&homography);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"H": [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 1.0]]})
        );

        let robust = RobustHomography { model: homography, inliers: vec![0, 2, 3] };
        assert_eq!(
            serde_json::to_value(HomographyResponse::from(&robust)).unwrap(),
            json!({
                "H": [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 1.0]],
                "inliers": [0, 2, 3],
                "inlierCount": 3,
            })
        );
    }

    #[test]
    fn calibration_response() {
        let camera = ProjectionMatrix::from_parts(
            &CameraIntrinsics::identity()
                .focal(500.0)
                .principal_point(Point2::new(320.0, 240.0)),
            &Rotation3::identity(),
            &Vector3::new(-1.5, -1.5, 10.0),
        );
        let world: Vec<Point3<f64>> = (0..10)
            .map(|i| {
                let i = i as f64;
                Point3::new(i.sin(), (1.7 * i).cos(), 0.3 * i - 1.0)
            })
            .collect();
        let image: Vec<Point2<f64>> = world.iter().map(|p| camera.project(p).unwrap()).collect();
        let calibration =
            calibrate_camera(&world, &image, Method::Linear, &CalibroSettings::default()).unwrap();

        let response = CalibrateResponse::from(&calibration);
        approx::assert_relative_eq!(response.intrinsics[0][0], 500.0, max_relative = 1e-6);
        approx::assert_relative_eq!(response.projection[2][3], 1.0);
        approx::assert_relative_eq!(response.t[2], 10.0, max_relative = 1e-6);
        assert_eq!(response.lines.len(), 12);
        approx::assert_relative_eq!(response.lines[0][0][0], 245.0, epsilon = 1e-6);
        approx::assert_relative_eq!(response.lines[0][1][0], 395.0, epsilon = 1e-6);

        let value = serde_json::to_value(&response).unwrap();
        for key in ["P", "K", "R", "t", "lines"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }
}
