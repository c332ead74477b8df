use nalgebra::{Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Pinhole camera intrinsics.
///
/// Only `fx` is consumed by the metrology formulas; the full parameter set is
/// kept because calibration estimates it and callers may want to serialize
/// the whole model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    /// Horizontal focal length, pixels.
    pub fx: f64,
    /// Vertical focal length, pixels.
    pub fy: f64,
    /// Principal point, pixels.
    pub cx: f64,
    pub cy: f64,
    /// Axis skew (usually ~0).
    pub skew: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
        }
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    pub fn from_matrix(k: &Matrix3<f64>) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            skew: k[(0, 1)],
        }
    }

    /// Project a camera-frame point onto the image plane.
    ///
    /// Returns `None` for points at or behind the camera plane.
    pub fn project(&self, p: &Vector3<f64>) -> Option<Point2<f64>> {
        if p.z <= 0.0 {
            return None;
        }
        let xn = p.x / p.z;
        let yn = p.y / p.z;
        Some(Point2::new(
            self.fx * xn + self.skew * yn + self.cx,
            self.fy * yn + self.cy,
        ))
    }
}

/// Two-term radial distortion (Brown model, k1/k2 only).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RadialDistortion {
    pub k1: f64,
    pub k2: f64,
}

impl RadialDistortion {
    /// Apply distortion to ideal normalized coordinates.
    #[inline]
    pub fn distort(&self, xn: f64, yn: f64) -> (f64, f64) {
        let r2 = xn * xn + yn * yn;
        let f = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
        (xn * f, yn * f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_matches_matrix_form() {
        let k = CameraIntrinsics::new(500.0, 480.0, 320.0, 240.0);
        let p = Vector3::new(0.1, -0.05, 2.0);
        let proj = k.project(&p).expect("in front of camera");
        assert!((proj.x - (500.0 * 0.05 + 320.0)).abs() < 1e-9);
        assert!((proj.y - (480.0 * -0.025 + 240.0)).abs() < 1e-9);
    }

    #[test]
    fn points_behind_camera_do_not_project() {
        let k = CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0);
        assert!(k.project(&Vector3::new(0.0, 0.0, -1.0)).is_none());
    }

    #[test]
    fn zero_distortion_is_identity() {
        let d = RadialDistortion::default();
        let (x, y) = d.distort(0.3, -0.2);
        assert!((x - 0.3).abs() < 1e-12 && (y + 0.2).abs() < 1e-12);
    }
}
