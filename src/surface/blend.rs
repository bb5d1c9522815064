use serde::{Deserialize, Serialize};

/// How a source pixel combines with the destination pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Replace the destination
    Opaque,
    /// `dest + src`, saturating per channel
    Additive,
    /// `dest * src` on color channels, destination alpha passes through
    Multiply,
    /// Straight source-over
    Alpha,
}

/// Texture sampling used when a blit changes size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

/// `a * b / 255` with rounding
#[inline]
pub fn mul_div255(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}

/// Blend one RGBA8 source pixel into a destination pixel slice
/// Function - transforms the 4 destination bytes in place
#[inline]
pub fn blend_pixel(mode: BlendMode, dst: &mut [u8], src: [u8; 4]) {
    match mode {
        BlendMode::Opaque => dst[..4].copy_from_slice(&src),
        BlendMode::Additive => {
            for c in 0..4 {
                dst[c] = dst[c].saturating_add(src[c]);
            }
        }
        BlendMode::Multiply => {
            for c in 0..3 {
                dst[c] = mul_div255(dst[c], src[c]);
            }
        }
        BlendMode::Alpha => {
            let a = src[3];
            let inv = 255 - a;
            for c in 0..3 {
                dst[c] = mul_div255(src[c], a) + mul_div255(dst[c], inv);
            }
            dst[3] = a.saturating_add(mul_div255(dst[3], inv));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additive_saturates() {
        let mut dst = [200, 10, 0, 255];
        blend_pixel(BlendMode::Additive, &mut dst, [100, 20, 0, 255]);
        assert_eq!(dst, [255, 30, 0, 255]);
    }

    #[test]
    fn test_multiply_keeps_dest_alpha() {
        let mut dst = [255, 128, 64, 77];
        blend_pixel(BlendMode::Multiply, &mut dst, [128, 255, 0, 255]);
        assert_eq!(dst, [128, 128, 0, 77]);
    }

    #[test]
    fn test_multiply_by_white_is_identity() {
        for v in 0..=255u8 {
            assert_eq!(mul_div255(v, 255), v);
        }
    }

    #[test]
    fn test_alpha_over() {
        let mut dst = [0, 0, 0, 255];
        blend_pixel(BlendMode::Alpha, &mut dst, [255, 255, 255, 255]);
        assert_eq!(dst, [255, 255, 255, 255]);

        let mut dst = [10, 20, 30, 255];
        blend_pixel(BlendMode::Alpha, &mut dst, [255, 0, 0, 0]);
        assert_eq!(dst, [10, 20, 30, 255]);
    }
}
