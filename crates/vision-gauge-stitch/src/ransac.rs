//! RANSAC homography estimation over matched point pairs.

use nalgebra::Point2;
use rand::Rng;
use vision_gauge_core::{estimate_homography, homography_from_4pt, Homography};

/// Estimate `dst ~ H * src` from noisy correspondences.
///
/// Samples 4-point minimal sets, scores by forward transfer error, then
/// refits on the best consensus set with the full DLT. Returns
/// the refit homography and the inlier indices, or `None` when no sample
/// reaches 4 inliers.
pub fn ransac_homography(
    src: &[Point2<f32>],
    dst: &[Point2<f32>],
    iterations: usize,
    inlier_threshold_px: f32,
    rng: &mut impl Rng,
) -> Option<(Homography, Vec<usize>)> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return None;
    }
    let thresh_sq = inlier_threshold_px * inlier_threshold_px;

    let mut best_inliers: Vec<usize> = Vec::new();
    for _ in 0..iterations {
        let mut idx = [0usize; 4];
        let mut k = 0;
        while k < 4 {
            let i = rng.gen_range(0..n);
            if !idx[..k].contains(&i) {
                idx[k] = i;
                k += 1;
            }
        }
        let s = [src[idx[0]], src[idx[1]], src[idx[2]], src[idx[3]]];
        let d = [dst[idx[0]], dst[idx[1]], dst[idx[2]], dst[idx[3]]];
        let Some(h) = homography_from_4pt(&s, &d) else {
            continue;
        };

        let inliers: Vec<usize> = (0..n)
            .filter(|&i| {
                let p = h.apply(src[i]);
                let (dx, dy) = (p.x - dst[i].x, p.y - dst[i].y);
                let err = dx * dx + dy * dy;
                err.is_finite() && err <= thresh_sq
            })
            .collect();
        if inliers.len() > best_inliers.len() {
            best_inliers = inliers;
            if best_inliers.len() == n {
                break;
            }
        }
    }
    if best_inliers.len() < 4 {
        return None;
    }

    let src_in: Vec<Point2<f32>> = best_inliers.iter().map(|&i| src[i]).collect();
    let dst_in: Vec<Point2<f32>> = best_inliers.iter().map(|&i| dst[i]).collect();
    let h = estimate_homography(&src_in, &dst_in)?;
    Some((h, best_inliers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn recovers_a_translation_despite_outliers() {
        let src: Vec<Point2<f32>> = (0..20)
            .map(|i| Point2::new((i % 5) as f32 * 30.0 + 10.0, (i / 5) as f32 * 25.0 + 10.0))
            .collect();
        let mut dst: Vec<Point2<f32>> =
            src.iter().map(|p| Point2::new(p.x + 40.0, p.y - 5.0)).collect();
        // corrupt a quarter of the correspondences
        dst[3] = Point2::new(0.0, 0.0);
        dst[8] = Point2::new(200.0, 200.0);
        dst[12] = Point2::new(7.0, 150.0);
        dst[17] = Point2::new(90.0, 1.0);

        let mut rng = StdRng::seed_from_u64(7);
        let (h, inliers) =
            ransac_homography(&src, &dst, 300, 2.0, &mut rng).expect("consensus found");
        assert_eq!(inliers.len(), 16);
        let p = h.apply(Point2::new(55.0, 42.0));
        assert_relative_eq!(p.x, 95.0, epsilon = 0.1);
        assert_relative_eq!(p.y, 37.0, epsilon = 0.1);
    }

    #[test]
    fn too_few_points_is_rejected() {
        let pts = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)];
        let mut rng = StdRng::seed_from_u64(1);
        assert!(ransac_homography(&pts, &pts, 50, 2.0, &mut rng).is_none());
    }
}
