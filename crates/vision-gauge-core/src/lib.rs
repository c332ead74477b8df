//! Core types and utilities for the `vision-gauge` workspace.
//!
//! This crate is intentionally small and purely geometric/numeric. It does
//! *not* depend on any concrete detector or image container; callers adapt
//! their buffers into [`GrayImageView`].

mod homography;
mod image;
mod integral;
mod intrinsics;
mod logger;
mod measure;
mod point;

pub use homography::{
    estimate_homography, homography_from_4pt, warp_perspective_gray, Homography,
};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use integral::{integral_image, normalize_integral};
pub use intrinsics::{CameraIntrinsics, RadialDistortion};
pub use measure::{object_dimension, MeasureError};
pub use point::{PixelPoint, PointParseError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
