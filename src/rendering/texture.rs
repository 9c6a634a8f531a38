/// Texture storage and sampling.
/// Texels are decoded to linear `ColorRgb` up front so the fill loop
/// never touches pixel formats.
use super::shading::ColorRgb;
use anyhow::{ensure, Context, Result};
use glam::Vec2;
use std::path::Path;

/// How `sample` resolves a UV that lands between texel centers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterMode {
    /// Single texel lookup, hard edges.
    Nearest,
    /// Weighted blend of the four surrounding texels.
    Bilinear,
}

#[derive(Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    // Row-major, v = 0 at the top row
    texels: Vec<ColorRgb>,
    filter: FilterMode,
}

impl Texture {
    /// Build a texture from decoded texels. Fails if the dimensions do
    /// not match the texel count or are zero. Filtering defaults to
    /// nearest; use `with_filter`/`set_filter` to change it.
    pub fn new(width: u32, height: u32, texels: Vec<ColorRgb>) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "texture dimensions must be non-zero, got {}x{}",
            width,
            height
        );
        ensure!(
            texels.len() == (width * height) as usize,
            "texel count {} does not match {}x{}",
            texels.len(),
            width,
            height
        );

        Ok(Self {
            width,
            height,
            texels,
            filter: FilterMode::Nearest,
        })
    }

    /// Decode an image file (PNG, BMP, ...) into a texture.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .with_context(|| format!("failed to load texture {}", path.display()))?
            .to_rgba8();

        let (width, height) = image.dimensions();
        log::debug!("loaded texture {} ({}x{})", path.display(), width, height);

        let texels = image
            .pixels()
            .map(|p| {
                let [r, g, b, _] = p.0;
                ColorRgb::from_u8(r, g, b)
            })
            .collect();

        Self::new(width, height, texels)
    }

    /// Procedural checkerboard, `cell` texels per square.
    pub fn checkerboard(width: u32, height: u32, cell: u32, a: ColorRgb, b: ColorRgb) -> Self {
        let cell = cell.max(1);

        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let even = ((x / cell) + (y / cell)) % 2 == 0;
                texels.push(if even { a } else { b });
            }
        }

        Self {
            width,
            height,
            texels,
            filter: FilterMode::Nearest,
        }
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
    }

    #[inline]
    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample with repeat wrapping. UVs outside [0, 1) tile the texture;
    /// v = 0 addresses the top row.
    #[inline]
    pub fn sample(&self, uv: Vec2) -> ColorRgb {
        match self.filter {
            FilterMode::Nearest => self.sample_nearest(uv),
            FilterMode::Bilinear => self.sample_bilinear(uv),
        }
    }

    #[inline]
    fn sample_nearest(&self, uv: Vec2) -> ColorRgb {
        // Wrap into [0, 1). `u - floor(u)` handles negatives, unlike fract.
        let u = uv.x - uv.x.floor();
        let v = uv.y - uv.y.floor();

        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);

        // Safety: x < width and y < height, so the index is in bounds
        unsafe { *self.texels.get_unchecked((y * self.width + x) as usize) }
    }

    fn sample_bilinear(&self, uv: Vec2) -> ColorRgb {
        // Texel centers sit at (i + 0.5) / size; shifting by half a texel
        // makes the integer part the lower neighbor and the fraction the
        // blend weight.
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;
        let tx = x - x.floor();
        let ty = y - y.floor();

        let x0 = (x.floor() as i64).rem_euclid(self.width as i64) as u32;
        let y0 = (y.floor() as i64).rem_euclid(self.height as i64) as u32;
        let x1 = if x0 + 1 == self.width { 0 } else { x0 + 1 };
        let y1 = if y0 + 1 == self.height { 0 } else { y0 + 1 };

        let top = self.texel(x0, y0).lerp(self.texel(x1, y0), tx);
        let bottom = self.texel(x0, y1).lerp(self.texel(x1, y1), tx);
        top.lerp(bottom, ty)
    }

    #[inline]
    fn texel(&self, x: u32, y: u32) -> ColorRgb {
        self.texels[(y * self.width + x) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> Texture {
        // Top row: red, green. Bottom row: blue, white.
        Texture::new(
            2,
            2,
            vec![ColorRgb::RED, ColorRgb::GREEN, ColorRgb::BLUE, ColorRgb::WHITE],
        )
        .unwrap()
    }

    #[test]
    fn nearest_sample_picks_the_enclosing_texel() {
        let tex = two_by_two();

        assert_eq!(tex.sample(Vec2::new(0.1, 0.1)), ColorRgb::RED);
        assert_eq!(tex.sample(Vec2::new(0.9, 0.1)), ColorRgb::GREEN);
        assert_eq!(tex.sample(Vec2::new(0.1, 0.9)), ColorRgb::BLUE);
        assert_eq!(tex.sample(Vec2::new(0.9, 0.9)), ColorRgb::WHITE);
    }

    #[test]
    fn out_of_range_uvs_repeat() {
        let tex = two_by_two();

        assert_eq!(tex.sample(Vec2::new(1.1, 0.1)), tex.sample(Vec2::new(0.1, 0.1)));
        assert_eq!(tex.sample(Vec2::new(-0.9, 0.1)), tex.sample(Vec2::new(0.1, 0.1)));
        assert_eq!(tex.sample(Vec2::new(0.1, 2.9)), tex.sample(Vec2::new(0.1, 0.9)));
        assert_eq!(tex.sample(Vec2::new(1.0, 1.0)), tex.sample(Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn mismatched_texel_count_is_rejected() {
        assert!(Texture::new(2, 2, vec![ColorRgb::BLACK; 3]).is_err());
        assert!(Texture::new(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let tex = Texture::checkerboard(4, 4, 2, ColorRgb::WHITE, ColorRgb::BLACK);

        assert_eq!(tex.sample(Vec2::new(0.0, 0.0)), ColorRgb::WHITE);
        assert_eq!(tex.sample(Vec2::new(0.6, 0.0)), ColorRgb::BLACK);
        assert_eq!(tex.sample(Vec2::new(0.6, 0.6)), ColorRgb::WHITE);
    }

    #[test]
    fn bilinear_midpoint_blends_both_neighbors() {
        let tex = Texture::new(2, 1, vec![ColorRgb::BLACK, ColorRgb::WHITE])
            .unwrap()
            .with_filter(FilterMode::Bilinear);

        // Texel centers reproduce the stored texel exactly
        assert_eq!(tex.sample(Vec2::new(0.25, 0.5)), ColorRgb::BLACK);
        assert_eq!(tex.sample(Vec2::new(0.75, 0.5)), ColorRgb::WHITE);

        // Halfway between the centers the blend is an even mix
        let mid = tex.sample(Vec2::new(0.5, 0.5));
        assert!((mid.r - 0.5).abs() < 1e-6);
        assert!((mid.g - 0.5).abs() < 1e-6);
        assert!((mid.b - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bilinear_wraps_across_the_texture_edge() {
        let tex = Texture::new(2, 1, vec![ColorRgb::BLACK, ColorRgb::WHITE])
            .unwrap()
            .with_filter(FilterMode::Bilinear);

        // u = 0 sits half a texel past the seam, blending both edge texels
        let seam = tex.sample(Vec2::new(0.0, 0.5));
        assert!((seam.r - 0.5).abs() < 1e-6);
        assert_eq!(tex.sample(Vec2::new(0.0, 0.5)), tex.sample(Vec2::new(1.0, 0.5)));
    }

    #[test]
    fn filter_mode_switches_sampling_for_the_same_uv() {
        let mut tex = Texture::new(2, 1, vec![ColorRgb::BLACK, ColorRgb::WHITE]).unwrap();
        let uv = Vec2::new(0.4, 0.5);

        assert_eq!(tex.filter(), FilterMode::Nearest);
        assert_eq!(tex.sample(uv), ColorRgb::BLACK);

        tex.set_filter(FilterMode::Bilinear);
        let blended = tex.sample(uv);
        assert!((blended.r - 0.3).abs() < 1e-6, "got {}", blended.r);
    }
}
