//! End-to-end stereo measurement over synthetic frame triplets.

use approx::assert_relative_eq;
use vision_gauge::aruco::{render_marker, Matcher, QuadDetectParams, DICT_4X4_16};
use vision_gauge::detect::{annotate_rgb_frame, measure_frames};
use vision_gauge::{RangeEstimate, StereoRig};

const CELL_PX: usize = 10;

/// White 320x200 frame with marker `id` pasted at `(x, y)`.
fn gray_frame(id: u32, x: usize, y: usize) -> image::GrayImage {
    let marker = render_marker(&DICT_4X4_16, id, CELL_PX, 0);
    let mut frame = vision_gauge::core::GrayImage::from_fn(320, 200, |_, _| 255);
    for my in 0..marker.height {
        for mx in 0..marker.width {
            frame.set(x + mx, y + my, marker.get(mx, my));
        }
    }
    image::GrayImage::from_raw(320, 200, frame.data).expect("frame buffer")
}

fn rgb_frame(id: u32, x: usize, y: usize) -> image::RgbImage {
    let gray = gray_frame(id, x, y);
    image::RgbImage::from_fn(320, 200, |px, py| {
        let v = gray.get_pixel(px, py).0[0];
        image::Rgb([v, v, v])
    })
}

fn test_rig() -> StereoRig {
    StereoRig {
        focal_px: 400.0,
        baseline_cm: 8.0,
        marker_size_cm: 12.0,
    }
}

#[test]
fn known_disparity_gives_the_expected_range_and_size() {
    let rig = test_rig();
    let left = gray_frame(3, 120, 60);
    let right = gray_frame(3, 100, 60);
    let rgb = rgb_frame(3, 110, 60);
    let matcher = Matcher::new(DICT_4X4_16, 0);
    let params = QuadDetectParams::default();

    let measurements = measure_frames(&rig, &left, &right, &rgb, &matcher, &params);
    assert_eq!(measurements.len(), 1);
    let m = &measurements[0];
    assert_eq!(m.id, 3);

    // disparity 20 px: distance = 400 * 8 / 20 = 160 cm
    let dist = m.range.known().expect("known range");
    assert_relative_eq!(dist, 160.0, epsilon = 5.0);

    // marker spans ~60 px in the RGB frame: size = 60 * 160 / 400 = 24 cm
    let size = m.size_cm.expect("sized marker");
    assert_relative_eq!(size, 24.0, epsilon = 1.5);
}

#[test]
fn marker_missing_from_one_stereo_frame_is_not_measured() {
    let rig = test_rig();
    let left = gray_frame(3, 120, 60);
    let right = gray_frame(5, 100, 60);
    let rgb = rgb_frame(3, 110, 60);
    let matcher = Matcher::new(DICT_4X4_16, 0);
    let params = QuadDetectParams::default();

    let measurements = measure_frames(&rig, &left, &right, &rgb, &matcher, &params);
    assert!(measurements.is_empty());
}

#[test]
fn zero_disparity_reports_an_unknown_range() {
    let rig = test_rig();
    let left = gray_frame(3, 120, 60);
    let right = gray_frame(3, 120, 60);
    let rgb = rgb_frame(3, 120, 60);
    let matcher = Matcher::new(DICT_4X4_16, 0);
    let params = QuadDetectParams::default();

    let measurements = measure_frames(&rig, &left, &right, &rgb, &matcher, &params);
    assert_eq!(measurements.len(), 1);
    assert_eq!(measurements[0].range, RangeEstimate::Unknown);
    assert!(measurements[0].size_cm.is_none());
}

#[test]
fn annotation_draws_onto_the_rgb_frame() {
    let rig = test_rig();
    let left = gray_frame(3, 120, 60);
    let right = gray_frame(3, 100, 60);
    let mut rgb = rgb_frame(3, 110, 60);
    let matcher = Matcher::new(DICT_4X4_16, 0);
    let params = QuadDetectParams::default();

    let before = rgb.clone();
    let measurements = annotate_rgb_frame(&rig, &left, &right, &mut rgb, &matcher, &params);
    assert_eq!(measurements.len(), 1);

    let changed = rgb
        .pixels()
        .zip(before.pixels())
        .filter(|(a, b)| a != b)
        .count();
    assert!(changed > 50, "only {changed} pixels changed");
}
