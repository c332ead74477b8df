//! Chessboard calibration for the `vision-gauge` workspace.
//!
//! [`order_grid`] turns raw ChESS corner detections into a complete
//! row-major grid; [`calibrate`] runs Zhang's closed-form method over a set
//! of ordered grids. With the `image` feature, [`calibrate_from_dir`] covers
//! the whole flow from a directory of board photos.

mod grid;
mod zhang;

pub use grid::{order_grid, ChessboardGridParams, CornerGrid};
pub use zhang::{calibrate, CalibrationError, CalibrationResult};

#[cfg(feature = "image")]
mod from_images {
    use super::*;
    use chess_corners::{find_chess_corners_image, ChessConfig, ThresholdMode};
    use nalgebra::Point2;
    use std::path::Path;

    /// ChESS detector settings that work for ordinary calibration photos.
    pub fn default_chess_config() -> ChessConfig {
        let mut cfg = ChessConfig::single_scale();
        cfg.threshold_mode = ThresholdMode::Relative;
        cfg.threshold_value = 0.2;
        cfg.nms_radius = 2;
        cfg
    }

    /// Detect and order a board in a single grayscale image.
    pub fn detect_board(
        img: &image::GrayImage,
        chess_cfg: &ChessConfig,
        params: &ChessboardGridParams,
    ) -> Option<CornerGrid> {
        let corners: Vec<Point2<f32>> = find_chess_corners_image(img, chess_cfg)
            .ok()?
            .iter()
            .map(|c| Point2::new(c.x, c.y))
            .collect();
        order_grid(&corners, params)
    }

    /// Calibrate from every readable image in a directory.
    ///
    /// Views where no complete board is found are skipped with a warning,
    /// mirroring how the measurement flow has always treated bad photos; a
    /// summary warning fires when fewer than 3 views survive.
    pub fn calibrate_from_dir(
        dir: &Path,
        params: &ChessboardGridParams,
        square_size: f64,
    ) -> Result<CalibrationResult, CalibrationError> {
        let chess_cfg = default_chess_config();
        let mut views = Vec::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::error!("cannot read calibration directory {dir:?}: {err}");
                return Err(CalibrationError::NoViews);
            }
        };
        let mut paths: Vec<_> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
        paths.sort();

        for path in paths {
            let img = match image::ImageReader::open(&path).and_then(|r| {
                r.decode()
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }) {
                Ok(img) => img.to_luma8(),
                Err(err) => {
                    log::warn!("skipping {path:?}: {err}");
                    continue;
                }
            };
            match detect_board(&img, &chess_cfg, params) {
                Some(grid) => views.push(grid),
                None => log::warn!("skipping {path:?}: no complete {}x{} board", params.cols, params.rows),
            }
        }

        if views.len() < 3 {
            log::warn!(
                "only {} usable calibration views; intrinsics may be poor",
                views.len()
            );
        }
        calibrate(&views, square_size)
    }
}

#[cfg(feature = "image")]
pub use from_images::{calibrate_from_dir, default_chess_config, detect_board};
