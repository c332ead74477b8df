//! High-level facade crate for the `vision-gauge-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying metrology crates
//! - (feature-gated) end-to-end helpers that run marker detection and the
//!   stereo measurement flow on `image` buffers.
//!
//! ## Quickstart
//!
//! ```no_run
//! use vision_gauge::detect;
//! use vision_gauge::aruco::{Matcher, QuadDetectParams, DICT_4X4_16};
//! use image::ImageReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = ImageReader::open("frame.png")?.decode()?.to_luma8();
//! let matcher = Matcher::new(DICT_4X4_16, 0);
//! let markers = detect::detect_markers_image(&img, &matcher, &QuadDetectParams::default());
//! println!("found {} markers", markers.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `vision_gauge::core`: homographies, images, integral tables, the
//!   two-point dimension formula, intrinsics.
//! - `vision_gauge::calib`: chessboard grid ordering and Zhang calibration.
//! - `vision_gauge::aruco`: marker dictionaries, decoding, rendering.
//! - `vision_gauge::stereo`: disparity ranging, sizing, frame annotation.
//! - `vision_gauge::stitch`: feature matching and panorama composition.
//! - `vision_gauge::detect` (feature `image`): end-to-end helpers from
//!   `image::GrayImage` / `image::RgbImage`.

pub use vision_gauge_aruco as aruco;
pub use vision_gauge_calib as calib;
pub use vision_gauge_core as core;
pub use vision_gauge_stereo as stereo;
pub use vision_gauge_stitch as stitch;

pub use vision_gauge_core::{object_dimension, CameraIntrinsics, MeasureError, PixelPoint};
pub use vision_gauge_stereo::{MarkerMeasurement, RangeEstimate, StereoRig};

#[cfg(feature = "image")]
pub mod detect;
