//! Feature-based image stitching.
//!
//! Pipeline: Harris corners with non-maximum suppression, normalized
//! intensity-patch descriptors, ratio-test matching, RANSAC over a 4-point
//! homography with an inlier refit, then a perspective warp and max-intensity
//! composite. [`stitch_all`] folds a sequence of images into one panorama and
//! records every pair's outcome instead of silently dropping failures.

mod features;
mod ransac;
mod stitch;

pub use features::{describe, harris_corners, match_descriptors, Descriptor, Feature};
pub use ransac::ransac_homography;
pub use stitch::{
    align_pair, stitch_all, stitch_pair, PairFailure, PairOutcome, StitchError, StitchParams,
    StitchReport,
};
