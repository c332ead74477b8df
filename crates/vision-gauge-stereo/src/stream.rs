//! Frame sources and the annotated JPEG stream.
//!
//! The hardware pipeline is out of scope; anything that can hand over
//! synchronized left/right/RGB triplets implements [`FrameSource`].
//! [`DirFrameSource`] replays triplets from three directories of images.

use crate::{annotate_frame, measure_markers, StereoRig};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::path::{Path, PathBuf};
use vision_gauge_aruco::{detect_markers, Matcher, QuadDetectParams};
use vision_gauge_core::GrayImageView;

/// Errors from frame acquisition and encoding.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("frame source I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("image decode/encode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// One synchronized set of frames.
pub struct FrameTriplet {
    pub left: image::GrayImage,
    pub right: image::GrayImage,
    pub rgb: RgbImage,
}

/// Anything that yields synchronized frame triplets.
pub trait FrameSource {
    /// Next triplet; `Ok(None)` when the source is exhausted.
    fn next_triplet(&mut self) -> Result<Option<FrameTriplet>, StreamError>;
}

/// Borrow an `image::GrayImage` as the core view type.
pub fn gray_view(img: &image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Replays frames from three directories, pairing files in sorted order.
pub struct DirFrameSource {
    frames: std::vec::IntoIter<(PathBuf, PathBuf, PathBuf)>,
}

impl DirFrameSource {
    pub fn new(left_dir: &Path, right_dir: &Path, rgb_dir: &Path) -> Result<Self, StreamError> {
        let mut lists = Vec::with_capacity(3);
        for dir in [left_dir, right_dir, rgb_dir] {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            paths.sort();
            lists.push(paths);
        }
        let n = lists.iter().map(Vec::len).min().unwrap_or(0);
        let mut rgb = lists.pop().unwrap_or_default();
        let mut right = lists.pop().unwrap_or_default();
        let mut left = lists.pop().unwrap_or_default();
        left.truncate(n);
        right.truncate(n);
        rgb.truncate(n);

        let frames: Vec<_> = left
            .into_iter()
            .zip(right)
            .zip(rgb)
            .map(|((l, r), c)| (l, r, c))
            .collect();
        Ok(Self {
            frames: frames.into_iter(),
        })
    }
}

impl FrameSource for DirFrameSource {
    fn next_triplet(&mut self) -> Result<Option<FrameTriplet>, StreamError> {
        let Some((l, r, c)) = self.frames.next() else {
            return Ok(None);
        };
        let open = |p: &Path| -> Result<image::DynamicImage, StreamError> {
            Ok(image::ImageReader::open(p)?.decode()?)
        };
        Ok(Some(FrameTriplet {
            left: open(&l)?.to_luma8(),
            right: open(&r)?.to_luma8(),
            rgb: open(&c)?.to_rgb8(),
        }))
    }
}

/// Pull-based annotated stream: detect, measure, annotate, JPEG-encode.
///
/// Frames without markers pass through unannotated; a source or encode error
/// surfaces as an `Err` item and ends the stream.
pub struct AnnotatedFrames<S> {
    source: S,
    rig: StereoRig,
    matcher: Matcher,
    params: QuadDetectParams,
    jpeg_quality: u8,
    failed: bool,
}

impl<S: FrameSource> AnnotatedFrames<S> {
    pub fn new(source: S, rig: StereoRig, matcher: Matcher, params: QuadDetectParams) -> Self {
        Self {
            source,
            rig,
            matcher,
            params,
            jpeg_quality: 85,
            failed: false,
        }
    }

    fn annotate_one(&self, triplet: FrameTriplet) -> Result<Vec<u8>, StreamError> {
        let FrameTriplet { left, right, rgb } = triplet;
        let rgb_gray = image::imageops::grayscale(&rgb);

        let det_l = detect_markers(&gray_view(&left), &self.matcher, &self.params);
        let det_r = detect_markers(&gray_view(&right), &self.matcher, &self.params);
        let det_rgb = detect_markers(&gray_view(&rgb_gray), &self.matcher, &self.params);

        let measurements = measure_markers(&self.rig, &det_l, &det_r, &det_rgb);
        log::debug!(
            "frame: {} left / {} right / {} rgb detections, {} measured",
            det_l.len(),
            det_r.len(),
            det_rgb.len(),
            measurements.len()
        );

        let mut annotated = rgb;
        annotate_frame(&mut annotated, &det_rgb, &measurements);

        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality);
        encoder.encode_image(&annotated)?;
        Ok(buf)
    }
}

impl<S: FrameSource> Iterator for AnnotatedFrames<S> {
    type Item = Result<Vec<u8>, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.source.next_triplet() {
            Ok(Some(triplet)) => match self.annotate_one(triplet) {
                Ok(bytes) => Some(Ok(bytes)),
                Err(err) => {
                    self.failed = true;
                    Some(Err(err))
                }
            },
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
