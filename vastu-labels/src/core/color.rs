//! Per-point color.

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Weighted blend of two colors.
    ///
    /// Falls back to `second` when both weights are zero.
    pub fn blend(first: Color, first_weight: f32, second: Color, second_weight: f32) -> Color {
        let total = first_weight + second_weight;
        if total <= 0.0 {
            return second;
        }
        let w1 = first_weight / total;
        let w2 = second_weight / total;
        let mix = |a: u8, b: u8| (a as f32 * w1 + b as f32 * w2).round().clamp(0.0, 255.0) as u8;

        Color {
            r: mix(first.r, second.r),
            g: mix(first.g, second.g),
            b: mix(first.b, second.b),
            a: mix(first.a, second.a),
        }
    }
}
