//! Per-marker distance and size from stereo detections.

use crate::StereoRig;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vision_gauge_aruco::MarkerDetection;

/// A distance measurement that may be unresolvable.
///
/// Non-positive disparity carries no depth information; it becomes `Unknown`
/// instead of an infinite or negative distance that would silently poison
/// later arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RangeEstimate {
    /// Distance from the rig, centimeters.
    Known(f32),
    Unknown,
}

impl RangeEstimate {
    pub fn known(self) -> Option<f32> {
        match self {
            RangeEstimate::Known(d) => Some(d),
            RangeEstimate::Unknown => None,
        }
    }
}

/// One marker's measurement for a frame triplet.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MarkerMeasurement {
    pub id: u32,
    /// Marker centroid in the RGB frame when seen there, else in the left frame.
    pub centroid: Point2<f32>,
    pub range: RangeEstimate,
    /// Physical side length, centimeters; needs a known range and an RGB
    /// detection of the same id.
    pub size_cm: Option<f32>,
}

fn mean_corner_x(det: &MarkerDetection) -> f32 {
    det.corners.iter().map(|c| c.x).sum::<f32>() / 4.0
}

/// Measure every marker seen in *both* stereo frames.
///
/// Pairing is by dictionary id. The RGB detections contribute the centroid
/// and the pixel edge length used for sizing; ids absent from the RGB frame
/// still get a range but no size.
pub fn measure_markers(
    rig: &StereoRig,
    left: &[MarkerDetection],
    right: &[MarkerDetection],
    rgb: &[MarkerDetection],
) -> Vec<MarkerMeasurement> {
    let right_by_id: HashMap<u32, &MarkerDetection> = right.iter().map(|d| (d.id, d)).collect();
    let rgb_by_id: HashMap<u32, &MarkerDetection> = rgb.iter().map(|d| (d.id, d)).collect();

    let mut out = Vec::new();
    for det_l in left {
        let Some(det_r) = right_by_id.get(&det_l.id) else {
            log::debug!("marker {} seen only in the left frame", det_l.id);
            continue;
        };

        // a marker paired by id must sit further left in the right frame;
        // anything else is a degenerate or misdetected pair
        let disparity = mean_corner_x(det_l) - mean_corner_x(det_r);
        let range = if disparity <= 0.0 {
            RangeEstimate::Unknown
        } else {
            RangeEstimate::Known(rig.distance_cm(disparity))
        };

        let det_rgb = rgb_by_id.get(&det_l.id);
        let size_cm = match (range, det_rgb) {
            (RangeEstimate::Known(dist), Some(rgb_det)) => {
                Some(rgb_det.top_edge_px() * dist / rig.focal_px)
            }
            _ => None,
        };

        out.push(MarkerMeasurement {
            id: det_l.id,
            centroid: det_rgb.map_or_else(|| det_l.centroid(), |d| d.centroid()),
            range,
            size_cm,
        });
    }
    out
}
