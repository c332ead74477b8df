//! Closed-form planar calibration (Zhang's method).
//!
//! Per view: a board-to-image homography by DLT. Across views: the image of
//! the absolute conic from the homography constraints, solved by SVD, then
//! intrinsics in closed form, per-view extrinsics from the homography
//! columns, and a linear least-squares fit of two radial distortion terms.

use nalgebra::{DMatrix, DVector, Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};
use vision_gauge_core::{estimate_homography, CameraIntrinsics, Homography, RadialDistortion};

use crate::CornerGrid;

/// Errors from the calibration pipeline.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    #[error("no usable calibration views")]
    NoViews,
    #[error("need at least 2 usable views, got {got}")]
    NotEnoughViews { got: usize },
    #[error("homography estimation failed for view {view}")]
    HomographyFailed { view: usize },
    #[error("conic constraints are degenerate (coplanar or near-identical views?)")]
    DegenerateViews,
    #[error("linear solve failed: {what}")]
    NumericalFailure { what: &'static str },
}

/// Calibration output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub intrinsics: CameraIntrinsics,
    pub distortion: RadialDistortion,
    /// Root-mean-square reprojection error over all corners, pixels.
    pub rms_reprojection_px: f64,
    pub views_used: usize,
}

/// One view's board-plane pose.
#[derive(Clone, Debug)]
struct ViewPose {
    r: Matrix3<f64>,
    t: Vector3<f64>,
}

/// Board-plane model points for a grid, row-major, in physical units.
fn model_points(grid: &CornerGrid, square_size: f64) -> Vec<Point2<f32>> {
    let mut pts = Vec::with_capacity(grid.cols * grid.rows);
    for j in 0..grid.rows {
        for i in 0..grid.cols {
            pts.push(Point2::new(
                (i as f64 * square_size) as f32,
                (j as f64 * square_size) as f32,
            ));
        }
    }
    pts
}

/// `v_ij` constraint row from homography columns `i`, `j` (Zhang eq. 7/8).
fn conic_row(h: &Homography, i: usize, j: usize) -> [f64; 6] {
    let hi = h.column(i);
    let hj = h.column(j);
    [
        hi.x * hj.x,
        hi.x * hj.y + hi.y * hj.x,
        hi.y * hj.y,
        hi.z * hj.x + hi.x * hj.z,
        hi.z * hj.y + hi.y * hj.z,
        hi.z * hj.z,
    ]
}

fn intrinsics_from_conic(b: &[f64; 6]) -> Result<CameraIntrinsics, CalibrationError> {
    let (b11, b12, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4], b[5]);
    let denom = b11 * b22 - b12 * b12;
    if denom.abs() < 1e-18 || b11.abs() < 1e-18 {
        return Err(CalibrationError::DegenerateViews);
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;
    let alpha2 = lambda / b11;
    let beta2 = lambda * b11 / denom;
    if alpha2 <= 0.0 || beta2 <= 0.0 {
        return Err(CalibrationError::DegenerateViews);
    }

    let alpha = alpha2.sqrt();
    let beta = beta2.sqrt();
    let gamma = -b12 * alpha2 * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha2 / lambda;

    Ok(CameraIntrinsics {
        fx: alpha,
        fy: beta,
        cx: u0,
        cy: v0,
        skew: gamma,
    })
}

fn pose_from_homography(
    k_inv: &Matrix3<f64>,
    h: &Homography,
) -> Result<ViewPose, CalibrationError> {
    let h1 = k_inv * h.column(0);
    let h2 = k_inv * h.column(1);
    let h3 = k_inv * h.column(2);

    let norm = h1.norm();
    if norm < 1e-12 {
        return Err(CalibrationError::NumericalFailure {
            what: "homography column collapsed",
        });
    }
    let scale = 1.0 / norm;
    let mut r1 = h1 * scale;
    let mut r2 = h2 * scale;
    let mut t = h3 * scale;

    // board must sit in front of the camera
    if t.z < 0.0 {
        r1 = -r1;
        r2 = -r2;
        t = -t;
    }
    let r3 = r1.cross(&r2);
    let r = Matrix3::from_columns(&[r1, r2, r3]);

    // snap to the closest rotation
    let svd = r.svd(true, true);
    let (u, vt) = match (svd.u, svd.v_t) {
        (Some(u), Some(vt)) => (u, vt),
        _ => {
            return Err(CalibrationError::NumericalFailure {
                what: "rotation orthogonalization",
            })
        }
    };
    Ok(ViewPose { r: u * vt, t })
}

/// Project a board point through a pose, intrinsics, and distortion.
fn project(
    k: &CameraIntrinsics,
    dist: &RadialDistortion,
    pose: &ViewPose,
    board: Point2<f32>,
) -> Point2<f64> {
    let p = pose.r * Vector3::new(board.x as f64, board.y as f64, 0.0) + pose.t;
    let xn = p.x / p.z;
    let yn = p.y / p.z;
    let (xd, yd) = dist.distort(xn, yn);
    Point2::new(
        k.fx * xd + k.skew * yd + k.cx,
        k.fy * yd + k.cy,
    )
}

/// Calibrate from ordered corner grids.
pub fn calibrate(
    views: &[CornerGrid],
    square_size: f64,
) -> Result<CalibrationResult, CalibrationError> {
    if views.is_empty() {
        return Err(CalibrationError::NoViews);
    }
    if views.len() < 2 {
        return Err(CalibrationError::NotEnoughViews { got: views.len() });
    }

    let mut homographies = Vec::with_capacity(views.len());
    for (idx, grid) in views.iter().enumerate() {
        let model = model_points(grid, square_size);
        let h = estimate_homography(&model, &grid.points)
            .ok_or(CalibrationError::HomographyFailed { view: idx })?;
        homographies.push(h);
    }

    // Stack v12 and (v11 - v22) rows per view, solve Vb = 0.
    let mut v = DMatrix::<f64>::zeros(2 * homographies.len(), 6);
    for (idx, h) in homographies.iter().enumerate() {
        let v12 = conic_row(h, 0, 1);
        let v11 = conic_row(h, 0, 0);
        let v22 = conic_row(h, 1, 1);
        for c in 0..6 {
            v[(2 * idx, c)] = v12[c];
            v[(2 * idx + 1, c)] = v11[c] - v22[c];
        }
    }
    let svd = v.svd(true, true);
    let vt = svd.v_t.ok_or(CalibrationError::NumericalFailure {
        what: "conic SVD",
    })?;
    let last = vt.nrows() - 1;
    let mut b = [0.0f64; 6];
    for c in 0..6 {
        b[c] = vt[(last, c)];
    }
    if b[0] < 0.0 {
        for x in &mut b {
            *x = -*x;
        }
    }

    let intrinsics = intrinsics_from_conic(&b)?;
    let k_inv = intrinsics
        .matrix()
        .try_inverse()
        .ok_or(CalibrationError::NumericalFailure {
            what: "intrinsic matrix inverse",
        })?;

    let mut poses = Vec::with_capacity(homographies.len());
    for h in &homographies {
        poses.push(pose_from_homography(&k_inv, h)?);
    }

    let distortion = fit_radial_distortion(&intrinsics, views, &poses, square_size)?;

    // RMS over all corners with the final model
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for (grid, pose) in views.iter().zip(&poses) {
        let model = model_points(grid, square_size);
        for (board, observed) in model.iter().zip(&grid.points) {
            let p = project(&intrinsics, &distortion, pose, *board);
            let dx = p.x - observed.x as f64;
            let dy = p.y - observed.y as f64;
            sum_sq += dx * dx + dy * dy;
            count += 1;
        }
    }
    let rms = (sum_sq / count.max(1) as f64).sqrt();
    log::info!(
        "calibrated over {} views: fx={:.2} fy={:.2} cx={:.2} cy={:.2} rms={:.4}px",
        views.len(),
        intrinsics.fx,
        intrinsics.fy,
        intrinsics.cx,
        intrinsics.cy,
        rms
    );

    Ok(CalibrationResult {
        intrinsics,
        distortion,
        rms_reprojection_px: rms,
        views_used: views.len(),
    })
}

/// Linear least-squares fit of `k1`, `k2` (Zhang §3.3).
fn fit_radial_distortion(
    k: &CameraIntrinsics,
    views: &[CornerGrid],
    poses: &[ViewPose],
    square_size: f64,
) -> Result<RadialDistortion, CalibrationError> {
    let total: usize = views.iter().map(|g| g.points.len()).sum();
    let mut d = DMatrix::<f64>::zeros(2 * total, 2);
    let mut rhs = DVector::<f64>::zeros(2 * total);

    let mut row = 0usize;
    for (grid, pose) in views.iter().zip(poses) {
        let model = model_points(grid, square_size);
        for (board, observed) in model.iter().zip(&grid.points) {
            let p = pose.r * Vector3::new(board.x as f64, board.y as f64, 0.0) + pose.t;
            let xn = p.x / p.z;
            let yn = p.y / p.z;
            let r2 = xn * xn + yn * yn;
            let u = k.fx * xn + k.skew * yn + k.cx;
            let v = k.fy * yn + k.cy;

            d[(row, 0)] = (u - k.cx) * r2;
            d[(row, 1)] = (u - k.cx) * r2 * r2;
            rhs[row] = observed.x as f64 - u;
            d[(row + 1, 0)] = (v - k.cy) * r2;
            d[(row + 1, 1)] = (v - k.cy) * r2 * r2;
            rhs[row + 1] = observed.y as f64 - v;
            row += 2;
        }
    }

    let solution = d
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(|_| CalibrationError::NumericalFailure {
            what: "distortion least squares",
        })?;
    Ok(RadialDistortion {
        k1: solution[0],
        k2: solution[1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    fn synthetic_view(
        k: &CameraIntrinsics,
        rot: (f64, f64, f64),
        t: Vector3<f64>,
        cols: usize,
        rows: usize,
        square: f64,
    ) -> CornerGrid {
        let r = Rotation3::from_euler_angles(rot.0, rot.1, rot.2);
        let mut points = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let board = Vector3::new(i as f64 * square, j as f64 * square, 0.0);
                let cam = r * board + t;
                let u = k.fx * (cam.x / cam.z) + k.cx;
                let v = k.fy * (cam.y / cam.z) + k.cy;
                points.push(Point2::new(u as f32, v as f32));
            }
        }
        CornerGrid { cols, rows, points }
    }

    fn ground_truth() -> CameraIntrinsics {
        CameraIntrinsics::new(520.0, 510.0, 320.0, 240.0)
    }

    fn three_views() -> Vec<CornerGrid> {
        let k = ground_truth();
        vec![
            synthetic_view(&k, (0.15, 0.1, 0.02), Vector3::new(-90.0, -70.0, 400.0), 8, 6, 25.0),
            synthetic_view(&k, (-0.2, 0.25, -0.05), Vector3::new(-60.0, -90.0, 450.0), 8, 6, 25.0),
            synthetic_view(&k, (0.1, -0.3, 0.1), Vector3::new(-110.0, -50.0, 380.0), 8, 6, 25.0),
        ]
    }

    #[test]
    fn recovers_ground_truth_intrinsics() {
        let result = calibrate(&three_views(), 25.0).expect("calibration");
        let k = ground_truth();
        assert_relative_eq!(result.intrinsics.fx, k.fx, max_relative = 0.02);
        assert_relative_eq!(result.intrinsics.fy, k.fy, max_relative = 0.02);
        assert!((result.intrinsics.cx - k.cx).abs() < 10.0);
        assert!((result.intrinsics.cy - k.cy).abs() < 10.0);
        assert!(result.rms_reprojection_px < 1.0);
        assert!(result.distortion.k1.abs() < 0.05);
    }

    #[test]
    fn no_views_is_an_explicit_error() {
        assert!(matches!(
            calibrate(&[], 25.0),
            Err(CalibrationError::NoViews)
        ));
    }

    #[test]
    fn one_view_is_not_enough() {
        let views = three_views();
        assert!(matches!(
            calibrate(&views[..1], 25.0),
            Err(CalibrationError::NotEnoughViews { got: 1 })
        ));
    }
}
