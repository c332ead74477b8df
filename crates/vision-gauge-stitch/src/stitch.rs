//! Pair alignment, warp + composite, and sequential multi-image stitching.

use crate::{describe, harris_corners, match_descriptors, ransac_homography};
use image::RgbImage;
use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use vision_gauge_core::{GrayImageView, Homography};

/// Tuning knobs for the whole stitching pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchParams {
    pub harris_k: f32,
    pub harris_threshold_rel: f32,
    pub nms_radius: usize,
    pub max_features: usize,
    pub patch_radius: usize,
    pub match_ratio: f32,
    pub ransac_iterations: usize,
    pub inlier_threshold_px: f32,
    pub min_matches: usize,
    pub min_inliers: usize,
    /// RANSAC seed; fixed so a rerun reproduces the same panorama.
    pub seed: u64,
}

impl Default for StitchParams {
    fn default() -> Self {
        Self {
            harris_k: 0.04,
            harris_threshold_rel: 0.01,
            nms_radius: 3,
            max_features: 800,
            patch_radius: 4,
            match_ratio: 0.8,
            ransac_iterations: 500,
            inlier_threshold_px: 3.0,
            min_matches: 8,
            min_inliers: 8,
            seed: 7,
        }
    }
}

/// Why one consecutive pair could not be stitched.
#[derive(thiserror::Error, Clone, Debug, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PairFailure {
    #[error("too few features ({base} in base, {next} in next)")]
    TooFewFeatures { base: usize, next: usize },
    #[error("too few descriptor matches ({got})")]
    TooFewMatches { got: usize },
    #[error("no consensus homography")]
    NoHomography,
    #[error("too few RANSAC inliers ({got})")]
    TooFewInliers { got: usize },
    #[error("warp bounds are implausible")]
    ImplausibleWarp,
}

/// Outcome of one consecutive pair inside [`stitch_all`].
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PairOutcome {
    Stitched { inliers: usize },
    Failed { error: PairFailure },
}

/// Whole-sequence failures.
#[derive(thiserror::Error, Debug)]
pub enum StitchError {
    #[error("need at least two images, got {got}")]
    NotEnoughImages { got: usize },
    #[error("no image pair could be stitched")]
    NoPairStitched,
}

/// Panorama plus the per-pair ledger.
pub struct StitchReport {
    pub panorama: RgbImage,
    pub pair_results: Vec<PairOutcome>,
}

fn gray_view(img: &image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Estimate the homography mapping `next` coordinates into `base` coordinates.
pub fn align_pair(
    base: &RgbImage,
    next: &RgbImage,
    params: &StitchParams,
) -> Result<(Homography, usize), PairFailure> {
    let base_gray = image::imageops::grayscale(base);
    let next_gray = image::imageops::grayscale(next);
    let bv = gray_view(&base_gray);
    let nv = gray_view(&next_gray);

    let fb = harris_corners(
        &bv,
        params.harris_k,
        params.harris_threshold_rel,
        params.nms_radius,
        params.max_features,
    );
    let fn_ = harris_corners(
        &nv,
        params.harris_k,
        params.harris_threshold_rel,
        params.nms_radius,
        params.max_features,
    );
    let db = describe(&bv, &fb, params.patch_radius);
    let dn = describe(&nv, &fn_, params.patch_radius);
    if db.len() < 4 || dn.len() < 4 {
        return Err(PairFailure::TooFewFeatures {
            base: db.len(),
            next: dn.len(),
        });
    }

    let matches = match_descriptors(&dn, &db, params.match_ratio);
    log::debug!(
        "{} base / {} next descriptors, {} ratio-test matches",
        db.len(),
        dn.len(),
        matches.len()
    );
    if matches.len() < params.min_matches {
        return Err(PairFailure::TooFewMatches { got: matches.len() });
    }

    let src: Vec<Point2<f32>> = matches.iter().map(|&(i, _)| dn[i].point).collect();
    let dst: Vec<Point2<f32>> = matches.iter().map(|&(_, j)| db[j].point).collect();
    let mut rng = StdRng::seed_from_u64(params.seed);
    let (h, inliers) = ransac_homography(
        &src,
        &dst,
        params.ransac_iterations,
        params.inlier_threshold_px,
        &mut rng,
    )
    .ok_or(PairFailure::NoHomography)?;
    if inliers.len() < params.min_inliers {
        return Err(PairFailure::TooFewInliers { got: inliers.len() });
    }
    Ok((h, inliers.len()))
}

fn sample_rgb(img: &RgbImage, x: f32, y: f32) -> Option<[f32; 3]> {
    let (w, h) = (img.width() as f32, img.height() as f32);
    if x < 0.0 || y < 0.0 || x > w - 1.0 || y > h - 1.0 {
        return None;
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as u32, y0 as u32);
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);
    let p = |xi: u32, yi: u32, c: usize| img.get_pixel(xi, yi).0[c] as f32;
    let mut out = [0.0f32; 3];
    for (c, v) in out.iter_mut().enumerate() {
        let top = p(x0, y0, c) * (1.0 - fx) + p(x1, y0, c) * fx;
        let bot = p(x0, y1, c) * (1.0 - fx) + p(x1, y1, c) * fx;
        *v = top * (1.0 - fy) + bot * fy;
    }
    Some(out)
}

const MAX_CANVAS_SIDE: i64 = 16_384;
const MAX_CANVAS_PIXELS: i64 = 64_000_000;

fn composite(base: &RgbImage, next: &RgbImage, h: Homography) -> Result<RgbImage, PairFailure> {
    let (nw, nh) = (next.width() as f32, next.height() as f32);
    let corners = [
        Point2::new(0.0, 0.0),
        Point2::new(nw, 0.0),
        Point2::new(nw, nh),
        Point2::new(0.0, nh),
    ];
    let mut min_x = 0.0f32;
    let mut min_y = 0.0f32;
    let mut max_x = base.width() as f32;
    let mut max_y = base.height() as f32;
    for c in corners {
        let p = h.apply(c);
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(PairFailure::ImplausibleWarp);
        }
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let off_x = -(min_x.floor() as i64);
    let off_y = -(min_y.floor() as i64);
    let out_w = max_x.ceil() as i64 + off_x;
    let out_h = max_y.ceil() as i64 + off_y;
    if out_w > MAX_CANVAS_SIDE || out_h > MAX_CANVAS_SIDE || out_w * out_h > MAX_CANVAS_PIXELS {
        return Err(PairFailure::ImplausibleWarp);
    }
    let h_inv = h.inverse().ok_or(PairFailure::ImplausibleWarp)?;

    let mut canvas = RgbImage::new(out_w as u32, out_h as u32);
    for y in 0..out_h {
        for x in 0..out_w {
            let bx = x - off_x;
            let by = y - off_y;
            let mut px = [0.0f32; 3];
            if bx >= 0 && by >= 0 && bx < base.width() as i64 && by < base.height() as i64 {
                let p = base.get_pixel(bx as u32, by as u32).0;
                px = [p[0] as f32, p[1] as f32, p[2] as f32];
            }
            let np = h_inv.apply(Point2::new(bx as f32, by as f32));
            if let Some(warped) = sample_rgb(next, np.x, np.y) {
                for c in 0..3 {
                    px[c] = px[c].max(warped[c]);
                }
            }
            let out = image::Rgb([px[0] as u8, px[1] as u8, px[2] as u8]);
            canvas.put_pixel(x as u32, y as u32, out);
        }
    }
    Ok(canvas)
}

/// Stitch `next` into `base`'s frame. Returns the composite and the RANSAC
/// inlier count.
pub fn stitch_pair(
    base: &RgbImage,
    next: &RgbImage,
    params: &StitchParams,
) -> Result<(RgbImage, usize), PairFailure> {
    let (h, inliers) = align_pair(base, next, params)?;
    let pano = composite(base, next, h)?;
    Ok((pano, inliers))
}

/// Fold a sequence of images into one panorama, left to right.
///
/// A failed pair leaves the running panorama unchanged but is recorded in
/// the report. The whole call only errors when fewer than two images are
/// given or when no pair at all could be stitched.
pub fn stitch_all(images: &[RgbImage], params: &StitchParams) -> Result<StitchReport, StitchError> {
    if images.len() < 2 {
        return Err(StitchError::NotEnoughImages { got: images.len() });
    }
    let mut panorama = images[0].clone();
    let mut pair_results = Vec::with_capacity(images.len() - 1);
    for (i, next) in images[1..].iter().enumerate() {
        match stitch_pair(&panorama, next, params) {
            Ok((pano, inliers)) => {
                log::info!("pair {i}: stitched with {inliers} inliers");
                panorama = pano;
                pair_results.push(PairOutcome::Stitched { inliers });
            }
            Err(error) => {
                log::warn!("pair {i}: {error}");
                pair_results.push(PairOutcome::Failed { error });
            }
        }
    }
    if !pair_results
        .iter()
        .any(|o| matches!(o, PairOutcome::Stitched { .. }))
    {
        return Err(StitchError::NoPairStitched);
    }
    Ok(StitchReport {
        panorama,
        pair_results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // deterministic white-noise texture shared by the synthetic crops
    fn tex(x: u32, y: u32) -> u8 {
        let h = x
            .wrapping_mul(2_654_435_761)
            .wrapping_add(y.wrapping_mul(40_503));
        let h = h ^ (h >> 13);
        (h & 0xff) as u8
    }

    fn crop(offset_x: u32, w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            let v = tex(x + offset_x, y);
            image::Rgb([v, v, v])
        })
    }

    fn flat(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, image::Rgb([128, 128, 128]))
    }

    #[test]
    fn align_recovers_a_pure_translation() {
        let left = crop(0, 200, 160);
        let right = crop(40, 200, 160);
        let (h, inliers) =
            align_pair(&left, &right, &StitchParams::default()).expect("aligned");
        assert!(inliers >= 8);
        let p = h.apply(Point2::new(50.0, 80.0));
        assert_relative_eq!(p.x, 90.0, epsilon = 1.0);
        assert_relative_eq!(p.y, 80.0, epsilon = 1.0);
    }

    #[test]
    fn panorama_covers_both_crops() {
        let left = crop(0, 200, 160);
        let right = crop(40, 200, 160);
        let report = stitch_all(&[left, right], &StitchParams::default()).expect("stitched");
        assert_eq!(report.pair_results.len(), 1);
        assert!(matches!(report.pair_results[0], PairOutcome::Stitched { .. }));
        let w = report.panorama.width();
        assert!((238..=242).contains(&w), "panorama width {w}");
        // a pixel only the warped image can supply
        let v = report.panorama.get_pixel(225, 80).0[0] as i32;
        assert!((v - tex(225, 80) as i32).abs() <= 6, "warped pixel {v}");
    }

    #[test]
    fn featureless_pair_is_reported_not_swallowed() {
        let images = [crop(0, 200, 160), flat(200, 160), crop(40, 200, 160)];
        let report = stitch_all(&images, &StitchParams::default()).expect("one pair stitched");
        assert!(matches!(
            report.pair_results[0],
            PairOutcome::Failed {
                error: PairFailure::TooFewFeatures { .. }
            }
        ));
        assert!(matches!(report.pair_results[1], PairOutcome::Stitched { .. }));
    }

    #[test]
    fn too_few_images_is_an_error() {
        let one = [flat(50, 50)];
        assert!(matches!(
            stitch_all(&one, &StitchParams::default()),
            Err(StitchError::NotEnoughImages { got: 1 })
        ));
    }

    #[test]
    fn all_pairs_failing_is_an_error() {
        let images = [flat(80, 80), flat(80, 80)];
        assert!(matches!(
            stitch_all(&images, &StitchParams::default()),
            Err(StitchError::NoPairStitched)
        ));
    }
}
