//! End-to-end helpers over `image` buffers.

use crate::aruco::{detect_markers, Matcher, MarkerDetection, QuadDetectParams};
use crate::stereo::{annotate_frame, measure_markers, MarkerMeasurement, StereoRig};

pub use vision_gauge_stereo::gray_view;

/// Detect markers in an `image::GrayImage`.
pub fn detect_markers_image(
    img: &::image::GrayImage,
    matcher: &Matcher,
    params: &QuadDetectParams,
) -> Vec<MarkerDetection> {
    detect_markers(&gray_view(img), matcher, params)
}

/// Run the stereo measurement flow over one synchronized frame triplet.
pub fn measure_frames(
    rig: &StereoRig,
    left: &::image::GrayImage,
    right: &::image::GrayImage,
    rgb: &::image::RgbImage,
    matcher: &Matcher,
    params: &QuadDetectParams,
) -> Vec<MarkerMeasurement> {
    let rgb_gray = ::image::imageops::grayscale(rgb);
    let det_l = detect_markers_image(left, matcher, params);
    let det_r = detect_markers_image(right, matcher, params);
    let det_rgb = detect_markers_image(&rgb_gray, matcher, params);
    measure_markers(rig, &det_l, &det_r, &det_rgb)
}

/// Measure one triplet and draw the results onto the RGB frame in place.
///
/// Returns the measurements so callers can also report them.
pub fn annotate_rgb_frame(
    rig: &StereoRig,
    left: &::image::GrayImage,
    right: &::image::GrayImage,
    rgb: &mut ::image::RgbImage,
    matcher: &Matcher,
    params: &QuadDetectParams,
) -> Vec<MarkerMeasurement> {
    let rgb_gray = ::image::imageops::grayscale(rgb);
    let det_l = detect_markers_image(left, matcher, params);
    let det_r = detect_markers_image(right, matcher, params);
    let det_rgb = detect_markers(&gray_view(&rgb_gray), matcher, params);
    let measurements = measure_markers(rig, &det_l, &det_r, &det_rgb);
    annotate_frame(rgb, &det_rgb, &measurements);
    measurements
}
