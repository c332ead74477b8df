//! Intensity thresholding.

/// Otsu threshold over a set of sample intensities.
///
/// Falls back to the midpoint of the observed range when the samples are
/// (nearly) degenerate, and to 127 when empty.
pub fn otsu_threshold(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut hist = [0u32; 256];
    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        hist[v as usize] += 1;
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }
    if hist.iter().filter(|&&h| h > 0).count() <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best = (127u8, -1f64);

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }
        sum_b += t as f64 * h as f64;

        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;
        let between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if between > best.1 {
            best = (t as u8, between);
        }
    }

    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bimodal_samples_split_between_modes() {
        let mut samples = vec![10u8; 50];
        samples.extend(vec![200u8; 50]);
        let t = otsu_threshold(&samples);
        assert!((10..200).contains(&t), "threshold {t} outside the modes");
    }

    #[test]
    fn uniform_samples_return_their_value() {
        assert_eq!(otsu_threshold(&[42u8; 16]), 42);
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(otsu_threshold(&[]), 127);
    }
}
