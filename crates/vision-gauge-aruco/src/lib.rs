//! Marker dictionary and full-frame detection for square fiducial markers.
//!
//! This crate covers the whole detection path: binarization, quad candidate
//! extraction, bit sampling through a 4-point homography, and dictionary
//! matching. [`render_marker`] draws markers for demos and synthetic tests.

mod builtins;
mod detect;
mod dictionary;
mod matcher;
mod render;
mod threshold;

pub use builtins::DICT_4X4_16;
pub use detect::{detect_markers, MarkerDetection, QuadDetectParams};
pub use dictionary::{rotate_code, Dictionary};
pub use matcher::{CodeMatch, Matcher};
pub use render::render_marker;
pub use threshold::otsu_threshold;
