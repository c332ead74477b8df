//! Full-frame marker detection.
//!
//! The pipeline: global Otsu binarization, connected-component labeling of
//! dark regions, quad corners from the diagonal extremes of each component,
//! then bit sampling through a 4-point homography and dictionary matching.
//! Quads nested inside an accepted quad are suppressed, so the dark inner
//! bits of a marker never produce a second detection.

use crate::threshold::otsu_threshold;
use crate::{CodeMatch, Matcher};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use vision_gauge_core::{homography_from_4pt, sample_bilinear, GrayImageView};

/// One detected marker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkerDetection {
    /// Dictionary id.
    pub id: u32,
    /// Quad corners in image coordinates, TL TR BR BL as seen in the frame.
    pub corners: [Point2<f32>; 4],
    /// Quarter turns between the observed code and its dictionary entry.
    pub rotation: u8,
    /// Hamming distance of the dictionary match.
    pub hamming: u8,
    /// Fraction of border-ring cells read as black.
    pub border_score: f32,
}

impl MarkerDetection {
    pub fn centroid(&self) -> Point2<f32> {
        let mut x = 0.0;
        let mut y = 0.0;
        for c in &self.corners {
            x += c.x;
            y += c.y;
        }
        Point2::new(x / 4.0, y / 4.0)
    }

    /// Pixel length of the top edge (TL → TR).
    pub fn top_edge_px(&self) -> f32 {
        let dx = self.corners[1].x - self.corners[0].x;
        let dy = self.corners[1].y - self.corners[0].y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Quad extraction and decoding settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuadDetectParams {
    /// Reject quads with any side shorter than this (pixels).
    pub min_side_px: f32,
    /// Reject components smaller than this (pixels).
    pub min_area_px: usize,
    /// Require this fraction of border-ring cells to read black.
    pub min_border_score: f32,
    /// Require at least this spread between the darkest and lightest cell.
    pub min_cell_contrast: f32,
    /// Hamming tolerance for dictionary matching.
    pub max_hamming: u8,
}

impl Default for QuadDetectParams {
    fn default() -> Self {
        Self {
            min_side_px: 20.0,
            min_area_px: 64,
            min_border_score: 0.85,
            min_cell_contrast: 30.0,
            max_hamming: 0,
        }
    }
}

/// Detect markers in a grayscale frame.
///
/// At most one detection per id survives (the one with the better match).
pub fn detect_markers(
    frame: &GrayImageView<'_>,
    matcher: &Matcher,
    params: &QuadDetectParams,
) -> Vec<MarkerDetection> {
    let thresh = otsu_threshold(frame.data);
    let components = dark_components(frame, thresh, params.min_area_px);
    log::debug!(
        "binarized at {thresh}, {} candidate components",
        components.len()
    );

    let mut detections = Vec::new();
    for comp in &components {
        let Some(quad) = quad_from_extremes(comp) else {
            continue;
        };
        if !quad_is_plausible(&quad, params) {
            continue;
        }
        if let Some(det) = decode_quad(frame, &quad, matcher, params) {
            detections.push(det);
        }
    }

    suppress_nested(&mut detections);
    dedup_by_id(detections)
}

/// 4-connected components of pixels darker than `thresh`.
fn dark_components(
    frame: &GrayImageView<'_>,
    thresh: u8,
    min_area: usize,
) -> Vec<Vec<(i32, i32)>> {
    let (w, h) = (frame.width, frame.height);
    let mut visited = vec![false; w * h];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in 0..w * h {
        if visited[start] || frame.data[start] >= thresh {
            continue;
        }
        let mut pixels = Vec::new();
        visited[start] = true;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            let (x, y) = ((idx % w) as i32, (idx / w) as i32);
            pixels.push((x, y));
            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                    continue;
                }
                let nidx = ny as usize * w + nx as usize;
                if !visited[nidx] && frame.data[nidx] < thresh {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            }
        }
        if pixels.len() >= min_area {
            components.push(pixels);
        }
    }

    components
}

/// Quad corners from the component's diagonal extremes, expanded half a pixel
/// so they sit on the geometric outline rather than pixel centers.
fn quad_from_extremes(pixels: &[(i32, i32)]) -> Option<[Point2<f32>; 4]> {
    let first = *pixels.first()?;
    let mut tl = first;
    let mut br = first;
    let mut tr = first;
    let mut bl = first;
    for &(x, y) in pixels {
        if x + y < tl.0 + tl.1 {
            tl = (x, y);
        }
        if x + y > br.0 + br.1 {
            br = (x, y);
        }
        if x - y > tr.0 - tr.1 {
            tr = (x, y);
        }
        if x - y < bl.0 - bl.1 {
            bl = (x, y);
        }
    }
    Some([
        Point2::new(tl.0 as f32 - 0.5, tl.1 as f32 - 0.5),
        Point2::new(tr.0 as f32 + 0.5, tr.1 as f32 - 0.5),
        Point2::new(br.0 as f32 + 0.5, br.1 as f32 + 0.5),
        Point2::new(bl.0 as f32 - 0.5, bl.1 as f32 + 0.5),
    ])
}

fn quad_is_plausible(quad: &[Point2<f32>; 4], params: &QuadDetectParams) -> bool {
    let mut min_side = f32::MAX;
    let mut crosses = [0.0f32; 4];
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let c = quad[(i + 2) % 4];
        let e1 = (b.x - a.x, b.y - a.y);
        let e2 = (c.x - b.x, c.y - b.y);
        min_side = min_side.min((e1.0 * e1.0 + e1.1 * e1.1).sqrt());
        crosses[i] = e1.0 * e2.1 - e1.1 * e2.0;
    }
    if min_side < params.min_side_px {
        return false;
    }
    // convex: all turns wind the same way
    crosses.iter().all(|&c| c > 0.0) || crosses.iter().all(|&c| c < 0.0)
}

/// Mean intensity of cell `(cx, cy)` in marker cell units (border included;
/// -1 and `n_total` address the quiet zone).
fn cell_mean(
    frame: &GrayImageView<'_>,
    h: &vision_gauge_core::Homography,
    n_total: usize,
    cx: i32,
    cy: i32,
) -> f32 {
    let step = 1.0 / n_total as f32;
    let u0 = (cx as f32 + 0.5) * step;
    let v0 = (cy as f32 + 0.5) * step;
    let mut sum = 0.0;
    let mut count = 0.0;
    for dv in [-0.25f32, 0.0, 0.25] {
        for du in [-0.25f32, 0.0, 0.25] {
            let p = h.apply(Point2::new(u0 + du * step, v0 + dv * step));
            sum += sample_bilinear(frame, p.x, p.y);
            count += 1.0;
        }
    }
    sum / count
}

fn decode_quad(
    frame: &GrayImageView<'_>,
    quad: &[Point2<f32>; 4],
    matcher: &Matcher,
    params: &QuadDetectParams,
) -> Option<MarkerDetection> {
    let dict = matcher.dictionary();
    let n = dict.marker_size;
    let n_total = n + 2;

    let unit = [
        Point2::new(0.0f32, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    let h = homography_from_4pt(&unit, quad)?;

    // Sample every cell plus the quiet-zone ring for the contrast estimate.
    let mut means = Vec::with_capacity((n_total + 2) * (n_total + 2));
    for cy in -1..=(n_total as i32) {
        for cx in -1..=(n_total as i32) {
            means.push(cell_mean(frame, &h, n_total, cx, cy));
        }
    }
    let lo = means.iter().cloned().fold(f32::MAX, f32::min);
    let hi = means.iter().cloned().fold(f32::MIN, f32::max);
    if hi - lo < params.min_cell_contrast {
        return None;
    }

    let quantized: Vec<u8> = means.iter().map(|&m| m.clamp(0.0, 255.0) as u8).collect();
    let split = otsu_threshold(&quantized) as f32;
    let row = n_total + 2;
    let at = |cx: i32, cy: i32| means[(cy + 1) as usize * row + (cx + 1) as usize];

    let mut border_dark = 0usize;
    let mut border_total = 0usize;
    for c in 0..n_total as i32 {
        for (cx, cy) in [
            (c, 0),
            (c, n_total as i32 - 1),
            (0, c),
            (n_total as i32 - 1, c),
        ] {
            border_total += 1;
            if at(cx, cy) < split {
                border_dark += 1;
            }
        }
    }
    let border_score = border_dark as f32 / border_total as f32;
    if border_score < params.min_border_score {
        return None;
    }

    let mut code = 0u64;
    for by in 0..n {
        for bx in 0..n {
            if at(bx as i32 + 1, by as i32 + 1) < split {
                code |= 1 << (by * n + bx);
            }
        }
    }

    let CodeMatch {
        id,
        rotation,
        hamming,
    } = matcher.match_code(code)?;
    if hamming > params.max_hamming {
        return None;
    }

    Some(MarkerDetection {
        id,
        corners: *quad,
        rotation,
        hamming,
        border_score,
    })
}

/// Drop detections whose centroid falls inside a larger detection's quad.
fn suppress_nested(detections: &mut Vec<MarkerDetection>) {
    let areas: Vec<f32> = detections.iter().map(|d| quad_area(&d.corners)).collect();
    let keep: Vec<bool> = detections
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let c = d.centroid();
            !detections.iter().enumerate().any(|(j, other)| {
                i != j && areas[j] > areas[i] && point_in_quad(c, &other.corners)
            })
        })
        .collect();
    let mut it = keep.iter();
    detections.retain(|_| *it.next().unwrap_or(&true));
}

fn quad_area(quad: &[Point2<f32>; 4]) -> f32 {
    let mut acc = 0.0;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        acc += a.x * b.y - b.x * a.y;
    }
    acc.abs() * 0.5
}

fn point_in_quad(p: Point2<f32>, quad: &[Point2<f32>; 4]) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Keep the best detection per id (lowest Hamming, then best border score).
fn dedup_by_id(mut detections: Vec<MarkerDetection>) -> Vec<MarkerDetection> {
    detections.sort_by(|a, b| {
        a.id.cmp(&b.id)
            .then(a.hamming.cmp(&b.hamming))
            .then(b.border_score.total_cmp(&a.border_score))
    });
    detections.dedup_by_key(|d| d.id);
    detections
}
