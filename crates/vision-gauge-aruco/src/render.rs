//! Marker rasterization for demos and synthetic tests.

use crate::Dictionary;
use vision_gauge_core::GrayImage;

/// Render marker `id` with a one-cell black border and a white quiet zone.
///
/// Cell `(x, y)` of the inner code reads bit `y * n + x` of the packed code
/// (black = 1), matching the decoder's sampling geometry.
pub fn render_marker(dict: &Dictionary, id: u32, cell_px: usize, quiet_px: usize) -> GrayImage {
    let n = dict.marker_size;
    let total_cells = n + 2;
    let side = total_cells * cell_px + 2 * quiet_px;
    let code = dict.codes[id as usize];

    GrayImage::from_fn(side, side, |px, py| {
        let x = px as i64 - quiet_px as i64;
        let y = py as i64 - quiet_px as i64;
        if x < 0 || y < 0 {
            return 255;
        }
        let cx = (x / cell_px as i64) as usize;
        let cy = (y / cell_px as i64) as usize;
        if cx >= total_cells || cy >= total_cells {
            return 255;
        }
        // border ring
        if cx == 0 || cy == 0 || cx == total_cells - 1 || cy == total_cells - 1 {
            return 0;
        }
        let bit = (code >> ((cy - 1) * n + (cx - 1))) & 1;
        if bit == 1 {
            0
        } else {
            255
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DICT_4X4_16;

    #[test]
    fn border_ring_is_black_and_quiet_zone_white() {
        let img = render_marker(&DICT_4X4_16, 3, 8, 16);
        // quiet zone
        assert_eq!(img.get(0, 0), 255);
        assert_eq!(img.get(4, 4), 255);
        // border ring corners
        assert_eq!(img.get(16, 16), 0);
        let far = 16 + 6 * 8 - 1;
        assert_eq!(img.get(far, far), 0);
    }

    #[test]
    fn inner_cells_follow_the_code() {
        let id = 0u32;
        let code = DICT_4X4_16.codes[id as usize];
        let img = render_marker(&DICT_4X4_16, id, 8, 0);
        for cy in 0..4usize {
            for cx in 0..4usize {
                let bit = (code >> (cy * 4 + cx)) & 1;
                let px = (cx + 1) * 8 + 4;
                let py = (cy + 1) * 8 + 4;
                let expected = if bit == 1 { 0 } else { 255 };
                assert_eq!(img.get(px, py), expected, "cell ({cx},{cy})");
            }
        }
    }
}
