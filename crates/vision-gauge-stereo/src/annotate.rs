//! Overlay drawing on RGB frames.

use crate::{MarkerMeasurement, RangeEstimate};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use vision_gauge_aruco::MarkerDetection;

const OVERLAY_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const GLYPH_SCALE: u32 = 2;

/// Draw one 8x8 glyph, scaled, clipping at the frame edges.
fn draw_glyph(frame: &mut RgbImage, glyph: &[u8; 8], x0: i32, y0: i32) {
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..8u32 {
            if bits & (1 << col) == 0 {
                continue;
            }
            for dy in 0..GLYPH_SCALE {
                for dx in 0..GLYPH_SCALE {
                    let x = x0 + (col * GLYPH_SCALE + dx) as i32;
                    let y = y0 + (row as u32 * GLYPH_SCALE + dy) as i32;
                    if x >= 0 && y >= 0 && (x as u32) < frame.width() && (y as u32) < frame.height()
                    {
                        frame.put_pixel(x as u32, y as u32, OVERLAY_COLOR);
                    }
                }
            }
        }
    }
}

fn draw_text(frame: &mut RgbImage, text: &str, x0: i32, y0: i32) {
    let advance = (8 * GLYPH_SCALE) as i32;
    for (i, ch) in text.chars().enumerate() {
        let idx = ch as usize;
        if idx >= font8x8::legacy::BASIC_LEGACY.len() {
            continue;
        }
        let glyph = &font8x8::legacy::BASIC_LEGACY[idx];
        draw_glyph(frame, glyph, x0 + i as i32 * advance, y0);
    }
}

fn draw_quad(frame: &mut RgbImage, det: &MarkerDetection) {
    for i in 0..4 {
        let a = det.corners[i];
        let b = det.corners[(i + 1) % 4];
        draw_line_segment_mut(frame, (a.x, a.y), (b.x, b.y), OVERLAY_COLOR);
    }
}

/// Annotate the RGB frame with each measured marker's distance and size.
///
/// The quad outline and labels come from the RGB detections; measurements
/// for ids the RGB frame never saw have nothing to anchor to and are skipped.
/// Unknown ranges get a `Dist: ?` label and no size line.
pub fn annotate_frame(
    frame: &mut RgbImage,
    rgb_detections: &[MarkerDetection],
    measurements: &[MarkerMeasurement],
) {
    for m in measurements {
        let Some(det) = rgb_detections.iter().find(|d| d.id == m.id) else {
            continue;
        };
        draw_quad(frame, det);

        let c = det.centroid();
        let (cx, cy) = (c.x as i32, c.y as i32);
        let dist_label = match m.range {
            RangeEstimate::Known(d) => format!("Dist: {d:.2} cm"),
            RangeEstimate::Unknown => "Dist: ?".to_owned(),
        };
        draw_text(frame, &dist_label, cx, cy - 20);
        if let Some(size) = m.size_cm {
            draw_text(frame, &format!("Size: {size:.2} cm"), cx, cy + 4);
        }
    }
}
