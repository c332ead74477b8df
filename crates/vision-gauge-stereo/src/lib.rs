//! Stereo marker metrology: disparity ranging, physical sizing, and
//! annotated frame streaming.
//!
//! Markers are paired across the left/right feeds by dictionary id, never by
//! detection order. A marker seen in only one stereo frame yields no
//! measurement, and a non-positive disparity yields
//! [`RangeEstimate::Unknown`] rather than an infinite or negative distance.

mod annotate;
mod measure;
mod rig;
mod stream;

pub use annotate::annotate_frame;
pub use measure::{measure_markers, MarkerMeasurement, RangeEstimate};
pub use rig::StereoRig;
pub use stream::{
    gray_view, AnnotatedFrames, DirFrameSource, FrameSource, FrameTriplet, StreamError,
};
