use serde::{Deserialize, Serialize};

/// Stereo rig geometry.
///
/// Defaults describe the OAK-D-style rig the original demo ran on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct StereoRig {
    /// Horizontal focal length of the stereo pair, pixels.
    pub focal_px: f32,
    /// Distance between the stereo cameras, centimeters.
    pub baseline_cm: f32,
    /// Physical side length of the markers in the scene, centimeters.
    pub marker_size_cm: f32,
}

impl Default for StereoRig {
    fn default() -> Self {
        Self {
            focal_px: 443.0,
            baseline_cm: 7.5,
            marker_size_cm: 15.0,
        }
    }
}

impl StereoRig {
    /// Distance implied by a pixel disparity, centimeters.
    #[inline]
    pub fn distance_cm(&self, disparity_px: f32) -> f32 {
        self.focal_px * self.baseline_cm / disparity_px
    }
}
