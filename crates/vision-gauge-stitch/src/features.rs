//! Harris corners and intensity-patch descriptors.

use nalgebra::Point2;
use vision_gauge_core::{sample_bilinear, GrayImageView};

/// A corner with its Harris response.
#[derive(Clone, Copy, Debug)]
pub struct Feature {
    pub point: Point2<f32>,
    pub response: f32,
}

/// A feature with its normalized patch, mean zero and unit norm.
#[derive(Clone, Debug)]
pub struct Descriptor {
    pub point: Point2<f32>,
    pub data: Vec<f32>,
}

/// Harris corner detection with non-maximum suppression.
///
/// Responses use a 3x3 box window over the gradient products,
/// `R = det(M) - k * trace(M)^2`. Corners below `threshold_rel` of the
/// strongest response are dropped; the survivors are sorted strongest-first
/// and capped at `max_features`.
pub fn harris_corners(
    img: &GrayImageView<'_>,
    k: f32,
    threshold_rel: f32,
    nms_radius: usize,
    max_features: usize,
) -> Vec<Feature> {
    let (w, h) = (img.width, img.height);
    if w < 5 || h < 5 {
        return Vec::new();
    }
    let px = |x: usize, y: usize| -> f32 { img.data[y * w + x] as f32 };

    let mut ixx = vec![0.0f32; w * h];
    let mut ixy = vec![0.0f32; w * h];
    let mut iyy = vec![0.0f32; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (px(x + 1, y) - px(x - 1, y)) * 0.5;
            let gy = (px(x, y + 1) - px(x, y - 1)) * 0.5;
            let i = y * w + x;
            ixx[i] = gx * gx;
            ixy[i] = gx * gy;
            iyy[i] = gy * gy;
        }
    }

    let mut resp = vec![0.0f32; w * h];
    let mut max_resp = 0.0f32;
    for y in 2..h - 2 {
        for x in 2..w - 2 {
            let mut sxx = 0.0;
            let mut sxy = 0.0;
            let mut syy = 0.0;
            for dy in 0..3 {
                for dx in 0..3 {
                    let i = (y + dy - 1) * w + (x + dx - 1);
                    sxx += ixx[i];
                    sxy += ixy[i];
                    syy += iyy[i];
                }
            }
            let det = sxx * syy - sxy * sxy;
            let tr = sxx + syy;
            let r = det - k * tr * tr;
            resp[y * w + x] = r;
            max_resp = max_resp.max(r);
        }
    }
    if max_resp <= 0.0 {
        return Vec::new();
    }

    let thresh = threshold_rel * max_resp;
    let nms = nms_radius as i64;
    let mut out = Vec::new();
    for y in 2..h - 2 {
        'pixel: for x in 2..w - 2 {
            let r = resp[y * w + x];
            if r < thresh {
                continue;
            }
            for dy in -nms..=nms {
                for dx in -nms..=nms {
                    let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let nr = resp[ny as usize * w + nx as usize];
                    // strict-on-one-side tie break so plateaus keep one corner
                    if nr > r || (nr == r && (ny, nx) < (y as i64, x as i64)) {
                        continue 'pixel;
                    }
                }
            }
            out.push(Feature {
                point: Point2::new(x as f32, y as f32),
                response: r,
            });
        }
    }
    out.sort_by(|a, b| b.response.total_cmp(&a.response));
    out.truncate(max_features);
    out
}

/// Extract a `(2r)x(2r)` bilinear patch per feature, normalized to zero mean
/// and unit norm. Features too close to the border or on flat patches are
/// skipped.
pub fn describe(
    img: &GrayImageView<'_>,
    features: &[Feature],
    patch_radius: usize,
) -> Vec<Descriptor> {
    let r = patch_radius as f32;
    let side = 2 * patch_radius;
    let mut out = Vec::with_capacity(features.len());
    for f in features {
        let (cx, cy) = (f.point.x, f.point.y);
        if cx < r + 1.0
            || cy < r + 1.0
            || cx + r + 1.0 >= img.width as f32
            || cy + r + 1.0 >= img.height as f32
        {
            continue;
        }
        let mut data = Vec::with_capacity(side * side);
        for iy in 0..side {
            for ix in 0..side {
                let dx = ix as f32 - r + 0.5;
                let dy = iy as f32 - r + 0.5;
                data.push(sample_bilinear(img, cx + dx, cy + dy));
            }
        }
        let mean = data.iter().sum::<f32>() / data.len() as f32;
        for v in &mut data {
            *v -= mean;
        }
        let norm = data.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm < 1e-6 {
            continue;
        }
        for v in &mut data {
            *v /= norm;
        }
        out.push(Descriptor {
            point: f.point,
            data,
        });
    }
    out
}

fn ssd(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Nearest-neighbor matching with Lowe's ratio test.
///
/// Returns `(index_a, index_b)` pairs. Distances are squared L2, so the test
/// compares against `ratio^2`.
pub fn match_descriptors(a: &[Descriptor], b: &[Descriptor], ratio: f32) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for (ia, da) in a.iter().enumerate() {
        let mut best = f32::INFINITY;
        let mut second = f32::INFINITY;
        let mut best_ib = usize::MAX;
        for (ib, db) in b.iter().enumerate() {
            let d = ssd(&da.data, &db.data);
            if d < best {
                second = best;
                best = d;
                best_ib = ib;
            } else if d < second {
                second = d;
            }
        }
        if best_ib != usize::MAX && best < ratio * ratio * second {
            out.push((ia, best_ib));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vision_gauge_core::GrayImage;

    fn checker_corner() -> GrayImage {
        // single L-shaped corner at (20, 20)
        GrayImage::from_fn(40, 40, |x, y| if x < 20 && y < 20 { 0 } else { 255 })
    }

    #[test]
    fn harris_finds_the_checker_corner() {
        let img = checker_corner();
        let corners = harris_corners(&img.view(), 0.04, 0.01, 3, 50);
        assert!(!corners.is_empty());
        let best = &corners[0];
        assert!((best.point.x - 20.0).abs() <= 2.0, "x = {}", best.point.x);
        assert!((best.point.y - 20.0).abs() <= 2.0, "y = {}", best.point.y);
    }

    #[test]
    fn flat_image_has_no_corners() {
        let img = GrayImage::from_fn(40, 40, |_, _| 128);
        assert!(harris_corners(&img.view(), 0.04, 0.01, 3, 50).is_empty());
    }

    #[test]
    fn identical_patches_pass_the_ratio_test() {
        let img = checker_corner();
        let corners = harris_corners(&img.view(), 0.04, 0.01, 3, 50);
        let desc = describe(&img.view(), &corners, 4);
        assert!(!desc.is_empty());
        let matches = match_descriptors(&desc, &desc, 0.8);
        // self-matching: surviving pairs must map each descriptor to itself
        assert!(!matches.is_empty());
        for (ia, ib) in matches {
            assert_eq!(ia, ib);
        }
    }
}
