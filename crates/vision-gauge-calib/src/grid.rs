//! Ordering raw chessboard corners into a complete grid.
//!
//! The four diagonal-extreme corners anchor a 4-point homography from grid
//! coordinates to the image; every other corner is mapped back through it and
//! snapped to integer grid coordinates. A view is accepted only when every
//! slot of the expected pattern is filled.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use vision_gauge_core::{homography_from_4pt, Homography};

/// Expected inner-corner pattern and snapping tolerance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ChessboardGridParams {
    /// Inner corners across.
    pub cols: usize,
    /// Inner corners down.
    pub rows: usize,
    /// Max distance from an integer grid coordinate, in grid units.
    pub snap_tolerance: f32,
}

impl Default for ChessboardGridParams {
    fn default() -> Self {
        // the classic 9x7-square board
        Self {
            cols: 8,
            rows: 6,
            snap_tolerance: 0.3,
        }
    }
}

/// A complete, row-major ordered corner grid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CornerGrid {
    pub cols: usize,
    pub rows: usize,
    /// `points[j * cols + i]` is the corner at grid coordinate `(i, j)`.
    pub points: Vec<Point2<f32>>,
}

/// Order detected corners into the expected pattern.
///
/// Both the given orientation and its transpose are tried, so a rotated board
/// still resolves; `None` when no complete grid can be formed.
pub fn order_grid(corners: &[Point2<f32>], params: &ChessboardGridParams) -> Option<CornerGrid> {
    if corners.len() < params.cols * params.rows {
        return None;
    }
    let anchors = diagonal_extremes(corners)?;
    try_assignment(corners, &anchors, params.cols, params.rows, params)
        .or_else(|| try_assignment(corners, &anchors, params.rows, params.cols, params))
}

fn diagonal_extremes(corners: &[Point2<f32>]) -> Option<[Point2<f32>; 4]> {
    let first = *corners.first()?;
    let mut tl = first;
    let mut tr = first;
    let mut br = first;
    let mut bl = first;
    for &p in corners {
        if p.x + p.y < tl.x + tl.y {
            tl = p;
        }
        if p.x + p.y > br.x + br.y {
            br = p;
        }
        if p.x - p.y > tr.x - tr.y {
            tr = p;
        }
        if p.x - p.y < bl.x - bl.y {
            bl = p;
        }
    }
    Some([tl, tr, br, bl])
}

fn try_assignment(
    corners: &[Point2<f32>],
    anchors: &[Point2<f32>; 4],
    cols: usize,
    rows: usize,
    params: &ChessboardGridParams,
) -> Option<CornerGrid> {
    let grid_corners = [
        Point2::new(0.0f32, 0.0),
        Point2::new(cols as f32 - 1.0, 0.0),
        Point2::new(cols as f32 - 1.0, rows as f32 - 1.0),
        Point2::new(0.0, rows as f32 - 1.0),
    ];
    let h: Homography = homography_from_4pt(&grid_corners, anchors)?;
    let h_inv = h.inverse()?;

    let mut slots: Vec<Option<(Point2<f32>, f32)>> = vec![None; cols * rows];
    for &p in corners {
        let g = h_inv.apply(p);
        let gi = g.x.round();
        let gj = g.y.round();
        let residual = ((g.x - gi).powi(2) + (g.y - gj).powi(2)).sqrt();
        if residual > params.snap_tolerance {
            continue;
        }
        if gi < 0.0 || gj < 0.0 || gi >= cols as f32 || gj >= rows as f32 {
            continue;
        }
        let idx = gj as usize * cols + gi as usize;
        // keep the best-snapping corner per slot
        if slots[idx].is_none_or(|(_, r)| residual < r) {
            slots[idx] = Some((p, residual));
        }
    }

    let points: Option<Vec<Point2<f32>>> = slots.iter().map(|s| s.map(|(p, _)| p)).collect();
    points.map(|points| CornerGrid { cols, rows, points })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_grid(cols: usize, rows: usize, shuffle: bool) -> Vec<Point2<f32>> {
        let mut pts = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                pts.push(Point2::new(
                    100.0 + i as f32 * 40.0 + j as f32 * 2.0,
                    80.0 + j as f32 * 40.0 - i as f32 * 1.5,
                ));
            }
        }
        if shuffle {
            pts.reverse();
            let mid = pts.len() / 2;
            pts.swap(0, mid);
        }
        pts
    }

    #[test]
    fn orders_a_complete_grid_row_major() {
        let params = ChessboardGridParams::default();
        let pts = synthetic_grid(params.cols, params.rows, true);
        let grid = order_grid(&pts, &params).expect("complete grid");
        assert_eq!(grid.points.len(), params.cols * params.rows);

        // (0,0) must be the top-left corner of the sheared lattice
        let tl = grid.points[0];
        assert!((tl.x - 100.0).abs() < 1e-3 && (tl.y - 80.0).abs() < 1e-3);

        // neighbors along a row step by the column spacing
        let step = grid.points[1] - grid.points[0];
        assert!((step.x - 40.0).abs() < 1e-3);
    }

    #[test]
    fn incomplete_grids_are_rejected() {
        let params = ChessboardGridParams::default();
        let mut pts = synthetic_grid(params.cols, params.rows, false);
        pts.truncate(pts.len() - 3);
        assert!(order_grid(&pts, &params).is_none());
    }

    #[test]
    fn interior_stray_corners_do_not_break_ordering() {
        let params = ChessboardGridParams::default();
        let mut pts = synthetic_grid(params.cols, params.rows, false);
        // off-lattice points inside the board hull; exact corners out-snap them
        pts.push(Point2::new(291.0, 172.0));
        pts.push(Point2::new(137.0, 119.0));
        let grid = order_grid(&pts, &params).expect("complete grid despite strays");
        let tl = grid.points[0];
        assert!((tl.x - 100.0).abs() < 1e-3 && (tl.y - 80.0).abs() < 1e-3);
    }
}
