/// Color math and per-mesh shading strategy.
/// Kept separate from the rasterizer so color resolution
/// can evolve independently of the fill loop.
use super::texture::Texture;
use std::ops::{Add, AddAssign, Mul};
use std::sync::Arc;

/// Linear RGB color with f32 channels. Values are nominally in [0, 1];
/// interpolation can push channels above 1, which `max_to_one` repairs
/// before packing.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ColorRgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl ColorRgb {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    pub const RED: Self = Self::new(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::new(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::new(0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from 8-bit channels (e.g. decoded image data).
    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Hue-preserving overflow normalization: if any channel exceeds 1,
    /// all channels are divided by the largest one. Colors already in
    /// range are returned untouched (no independent clamping).
    #[inline]
    pub fn max_to_one(self) -> Self {
        let max = self.r.max(self.g).max(self.b);
        if max > 1.0 {
            Self {
                r: self.r / max,
                g: self.g / max,
                b: self.b / max,
            }
        } else {
            self
        }
    }

    /// Pack to ARGB32 for the framebuffer. Channels are clamped to [0, 1]
    /// here; callers that want hue preservation apply `max_to_one` first.
    #[inline]
    pub fn to_argb(self) -> u32 {
        let r = (self.r.clamp(0.0, 1.0) * 255.0) as u32;
        let g = (self.g.clamp(0.0, 1.0) * 255.0) as u32;
        let b = (self.b.clamp(0.0, 1.0) * 255.0) as u32;

        // Pack directly without a helper call (better inlining)
        0xFF000000 | (r << 16) | (g << 8) | b
    }

    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self * (1.0 - t) + other * t
    }
}

impl Add for ColorRgb {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for ColorRgb {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<f32> for ColorRgb {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

impl Mul for ColorRgb {
    type Output = Self;

    /// Channel-wise modulation, e.g. tinting a texture sample.
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

/// How the rasterizer resolves a covered pixel's color. Selected per mesh;
/// the fill loop interpolates only the attributes the variant needs.
#[derive(Clone, Default)]
pub enum Material {
    /// Perspective-correct interpolation of per-vertex colors.
    #[default]
    VertexColor,
    /// Perspective-correct interpolation of UVs followed by a texture
    /// lookup. Shared so per-thread rasterizers can sample concurrently.
    Textured(Arc<Texture>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_to_one_preserves_channel_ratios() {
        let c = ColorRgb::new(2.0, 1.0, 0.5).max_to_one();

        assert!((c.r - 1.0).abs() < 1e-6);
        assert!((c.g - 0.5).abs() < 1e-6);
        assert!((c.b - 0.25).abs() < 1e-6);
    }

    #[test]
    fn max_to_one_leaves_in_range_colors_untouched() {
        let c = ColorRgb::new(0.25, 0.5, 1.0);
        assert_eq!(c.max_to_one(), c);
    }

    #[test]
    fn componentwise_multiply_modulates_each_channel() {
        let tinted = ColorRgb::new(1.0, 0.5, 0.25) * ColorRgb::new(0.5, 0.5, 2.0);
        assert_eq!(tinted, ColorRgb::new(0.5, 0.25, 0.5));
    }

    #[test]
    fn pack_clamps_and_orders_channels() {
        assert_eq!(ColorRgb::RED.to_argb(), 0xFFFF0000);
        assert_eq!(ColorRgb::from_u8(100, 100, 100).to_argb(), 0xFF646464);

        let packed = ColorRgb::new(-1.0, 0.0, 2.0).to_argb();
        assert_eq!(packed, 0xFF0000FF, "out-of-range channels clamp at pack time");
    }
}
