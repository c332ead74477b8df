//! Summed-area tables.

use crate::{GrayImage, GrayImageView};

/// Compute the integral image of `src`.
///
/// The value at `(r, c)` is the sum of all source pixels in the rectangle
/// `(0..=r, 0..=c)`, so `(0, 0)` equals the source pixel itself. Output is
/// row-major `u64`, same dimensions as the input.
pub fn integral_image(src: &GrayImageView<'_>) -> Vec<u64> {
    let (w, h) = (src.width, src.height);
    let mut out = vec![0u64; w * h];

    for row in 0..h {
        for col in 0..w {
            let mut v = src.data[row * w + col] as u64;
            if row > 0 {
                v += out[(row - 1) * w + col];
            }
            if col > 0 {
                v += out[row * w + col - 1];
            }
            if row > 0 && col > 0 {
                v -= out[(row - 1) * w + col - 1];
            }
            out[row * w + col] = v;
        }
    }

    out
}

/// Min-max normalize an integral image back to `u8` for display.
pub fn normalize_integral(integral: &[u64], width: usize, height: usize) -> GrayImage {
    let mut out = GrayImage::new(width, height);
    let Some(&max) = integral.iter().max() else {
        return out;
    };
    let Some(&min) = integral.iter().min() else {
        return out;
    };
    let range = (max - min).max(1) as f64;

    for (i, &v) in integral.iter().enumerate() {
        out.data[i] = (((v - min) as f64 / range) * 255.0).round() as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_sum(img: &GrayImage, r: usize, c: usize) -> u64 {
        let mut sum = 0u64;
        for y in 0..=r {
            for x in 0..=c {
                sum += img.get(x, y) as u64;
            }
        }
        sum
    }

    #[test]
    fn origin_equals_source_pixel() {
        let img = GrayImage::from_fn(4, 3, |x, y| (x * 10 + y) as u8);
        let integral = integral_image(&img.view());
        assert_eq!(integral[0], img.get(0, 0) as u64);
    }

    #[test]
    fn matches_brute_force_rectangle_sums() {
        let img = GrayImage::from_fn(7, 5, |x, y| ((x * 31 + y * 17) % 251) as u8);
        let integral = integral_image(&img.view());

        for r in 0..5 {
            for c in 0..7 {
                assert_eq!(
                    integral[r * 7 + c],
                    brute_force_sum(&img, r, c),
                    "mismatch at ({r},{c})"
                );
            }
        }
    }

    #[test]
    fn normalization_spans_full_range() {
        let img = GrayImage::from_fn(8, 8, |_, _| 3);
        let integral = integral_image(&img.view());
        let norm = normalize_integral(&integral, 8, 8);
        assert_eq!(norm.get(0, 0), 0);
        assert_eq!(norm.get(7, 7), 255);
    }
}
