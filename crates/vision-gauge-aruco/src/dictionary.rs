//! Dictionary metadata and packed marker codes.

/// A fixed square-marker dictionary.
///
/// Codes pack the inner `marker_size × marker_size` bits of each marker into
/// one `u64`, row-major, with **black = 1**.
#[derive(Clone, Copy, Debug)]
pub struct Dictionary {
    /// Human-readable name (for logging).
    pub name: &'static str,
    /// Marker side length in inner bits.
    pub marker_size: usize,
    /// One packed code per marker id.
    pub codes: &'static [u64],
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Rotate a row-major packed code (`idx = y * n + x`) by `rot` quarter turns.
pub fn rotate_code(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            let bit = (code >> (sy * n + sx)) & 1;
            out |= bit << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_quarter_turns_are_identity() {
        let code = 0x5e71_u64;
        let n = 4;
        let mut r = code;
        for _ in 0..4 {
            r = rotate_code(r, n, 1);
        }
        assert_eq!(code, r);
    }

    #[test]
    fn rotation_preserves_popcount() {
        let code = 0x0f27_u64;
        for rot in 0..4u8 {
            assert_eq!(rotate_code(code, 4, rot).count_ones(), code.count_ones());
        }
    }
}
