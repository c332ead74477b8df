//! Single-photo dimension estimation from two clicked points.
//!
//! A pinhole camera maps an object of width `W` at distance `d` to a pixel
//! span of `W * fx / d`, so `W = span_px * d / fx`. The horizontal span is
//! used, matching how the measurement UI places its two points.

use crate::PixelPoint;

/// Errors from [`object_dimension`].
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MeasureError {
    #[error("focal length must be finite and non-zero (got {got})")]
    BadFocalLength { got: f64 },
    #[error("distance to object must be finite and positive (got {got})")]
    BadDistance { got: f64 },
}

/// Estimate the physical dimension spanned by two clicked pixel points.
///
/// Symmetric in `p1`/`p2` and linear in `distance`. Units follow `distance`:
/// a distance in millimeters yields a dimension in millimeters.
pub fn object_dimension(
    fx: f64,
    distance: f64,
    p1: PixelPoint,
    p2: PixelPoint,
) -> Result<f64, MeasureError> {
    if fx == 0.0 || !fx.is_finite() {
        return Err(MeasureError::BadFocalLength { got: fx });
    }
    if distance <= 0.0 || !distance.is_finite() {
        return Err(MeasureError::BadDistance { got: distance });
    }

    let span_px = (p1.x as f64 - p2.x as f64).abs();
    Ok(span_px * distance / fx)
}
