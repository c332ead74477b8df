use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Planar projective transform, `p_dst ~ H * p_src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self {
            h: Matrix3::identity(),
        }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Column of the 3x3 matrix as a vector (used by calibration).
    #[inline]
    pub fn column(&self, i: usize) -> Vector3<f64> {
        Vector3::new(self.h[(0, i)], self.h[(1, i)], self.h[(2, i)])
    }
}

/// Hartley conditioning transform: translate to `(cx, cy)`, scale so the
/// mean distance from the origin becomes sqrt(2).
fn conditioning_transform(pts: &[Point2<f32>]) -> Matrix3<f64> {
    let n = pts.len() as f64;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;

    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn apply_conditioning(t: &Matrix3<f64>, pts: &[Point2<f32>]) -> Vec<Point2<f64>> {
    pts.iter()
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect()
}

fn decondition(hn: Matrix3<f64>, t_src: Matrix3<f64>, t_dst: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

/// Minimal 4-point solve for `dst ~ H * src` with `h33 = 1`.
///
/// Corner order must be consistent between `src` and `dst`.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let t_src = conditioning_transform(src);
    let t_dst = conditioning_transform(dst);
    let src_n = apply_conditioning(&t_src, src);
    let dst_n = apply_conditioning(&t_dst, dst);

    // For (x,y) -> (u,v):
    //   h11 x + h12 y + h13 - u h31 x - u h32 y = u
    //   h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y) = (src_n[k].x, src_n[k].y);
        let (u, v) = (dst_n[k].x, dst_n[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );
    decondition(hn, t_src, t_dst).map(Homography::new)
}

/// Overdetermined DLT estimate of `dst ~ H * src` from ≥4 correspondences.
pub fn estimate_homography(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    if src.len() == 4 {
        let s: &[Point2<f32>; 4] = src.try_into().ok()?;
        let d: &[Point2<f32>; 4] = dst.try_into().ok()?;
        return homography_from_4pt(s, d);
    }

    let t_src = conditioning_transform(src);
    let t_dst = conditioning_transform(dst);
    let sn = apply_conditioning(&t_src, src);
    let dn = apply_conditioning(&t_dst, dst);

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let (x, y) = (sn[k].x, sn[k].y);
        let (u, v) = (dn[k].x, dn[k].y);

        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // Ah = 0: h is the right singular vector with the smallest singular value.
    let svd = a.svd(true, true);
    let vt = svd.v_t?;
    let last = vt.nrows().checked_sub(1)?;
    let h = vt.row(last);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    decondition(hn, t_src, t_dst).map(Homography::new)
}

/// Warp `src` so that output pixel `(x, y)` samples `h_src_from_dst * (x, y)`.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_src_from_dst: Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::new(out_w, out_h);
    for y in 0..out_h {
        for x in 0..out_w {
            // sample at pixel center
            let p = h_src_from_dst.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            out.set(x, y, sample_bilinear_u8(src, p.x, p.y));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected ({:.5},{:.5}) ~ ({:.5},{:.5})",
            a.x,
            a.y,
            b.x,
            b.y
        );
    }

    #[test]
    fn four_point_solve_recovers_ground_truth() {
        let truth = Homography::new(Matrix3::new(
            0.9, 0.04, 60.0, //
            -0.03, 1.05, 40.0, //
            0.0008, -0.0003, 1.0,
        ));
        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(120.0, 0.0),
            Point2::new(120.0, 90.0),
            Point2::new(0.0, 90.0),
        ];
        let dst = src.map(|p| truth.apply(p));
        let h = homography_from_4pt(&src, &dst).expect("solvable");

        for p in [Point2::new(30.0, 20.0), Point2::new(100.0, 75.0)] {
            assert_close(h.apply(p), truth.apply(p), 1e-3);
        }
    }

    #[test]
    fn dlt_handles_overdetermined_case() {
        let truth = Homography::new(Matrix3::new(
            1.1, 0.12, 8.0, //
            -0.08, 0.95, 4.0, //
            0.0005, 0.0003, 1.0,
        ));
        let src: Vec<Point2<f32>> = (0..4)
            .flat_map(|j| (0..4).map(move |i| Point2::new(i as f32 * 30.0, j as f32 * 25.0)))
            .collect();
        let dst: Vec<Point2<f32>> = src.iter().map(|&p| truth.apply(p)).collect();

        let h = estimate_homography(&src, &dst).expect("estimate");
        for p in [Point2::new(15.0, 10.0), Point2::new(70.0, 60.0)] {
            assert_close(h.apply(p), truth.apply(p), 1e-3);
        }
    }

    #[test]
    fn inverse_round_trips() {
        let h = Homography::new(Matrix3::new(
            1.2, 0.1, 5.0, //
            -0.05, 0.9, 3.0, //
            0.001, 0.0005, 1.0,
        ));
        let inv = h.inverse().expect("invertible");
        let p = Point2::new(42.0_f32, 17.0);
        assert_close(inv.apply(h.apply(p)), p, 1e-3);
    }

    #[test]
    fn warp_by_translation_shifts_pixels() {
        let src = GrayImage::from_fn(16, 16, |x, y| (x * 16 + y) as u8);
        // sampling happens at output pixel centers (x + 0.5, y + 0.5), so a
        // translation of (2.5, 1.5) reads source pixel (x + 3, y + 2) exactly
        let h = Homography::new(Matrix3::new(
            1.0, 0.0, 2.5, //
            0.0, 1.0, 1.5, //
            0.0, 0.0, 1.0,
        ));
        let out = warp_perspective_gray(&src.view(), h, 10, 10);
        for y in 0..10 {
            for x in 0..10 {
                assert_eq!(out.get(x, y), src.get(x + 3, y + 2), "at ({x},{y})");
            }
        }
    }

    #[test]
    fn mismatched_lengths_fail() {
        let src = [Point2::new(0.0_f32, 0.0); 5];
        let dst = [Point2::new(1.0_f32, 1.0); 4];
        assert!(estimate_homography(&src, &dst).is_none());
    }
}
