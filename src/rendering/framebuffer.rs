/// Framebuffer for software rendering
/// Stores color and depth information
///
/// Buffers are stored as separate Vecs to allow independent access
/// patterns; the color buffer hands off directly to the surface.
use anyhow::{ensure, Context, Result};
use std::path::Path;

use crate::count_call;
#[cfg(feature = "profiling")]
use crate::perf::FUNCTION_COUNTERS;

#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::{
    _mm256_set1_epi32, _mm256_set1_ps, _mm256_storeu_ps, _mm256_storeu_si256, _mm_set1_epi32,
    _mm_set1_ps, _mm_storeu_ps, _mm_storeu_si128,
};

/// Flat background the color buffer is reset to every frame.
pub const DEFAULT_CLEAR_COLOR: u32 = rgb_to_u32(100, 100, 100);

/// Depth sentinel meaning "nothing drawn here yet". Any finite depth
/// passes the strict less-than test against it.
const DEPTH_CLEAR: f32 = f32::INFINITY;

/// View into a contiguous set of rows in the framebuffer.
/// Used for multi-core rasterization where each worker owns a disjoint slice.
pub struct FrameSlice<'a> {
    pub width: usize,
    pub full_height: usize,
    pub y0: usize,
    pub height: usize,
    pub color: &'a mut [u32],
    pub depth: &'a mut [f32],
}

impl<'a> FrameSlice<'a> {
    /// Perform a depth test at (x, y_global) and, if it passes, update depth and
    /// return the linear index into the local color buffer. Returns None if the
    /// pixel lies outside this slice or fails the depth test.
    ///
    /// Ties keep the stored value, so with a fixed draw order the
    /// earlier-drawn triangle wins on exactly equal depth.
    #[inline]
    pub unsafe fn test_depth_and_get_index(
        &mut self,
        x: usize,
        y_global: usize,
        depth: f32,
    ) -> Option<usize> {
        if y_global < self.y0 {
            return None;
        }
        let y_local = y_global - self.y0;
        if y_local >= self.height {
            return None;
        }

        let index = y_local * self.width + x;
        if depth < self.depth[index] {
            self.depth[index] = depth;
            Some(index)
        } else {
            None
        }
    }

    #[inline]
    pub fn write_color(&mut self, index: usize, color: u32) {
        self.color[index] = color;
    }
}

pub struct Framebuffer {
    pub width: usize,
    pub height: usize,
    // Color and depth buffers - accessed with different patterns
    pub color_buffer: Vec<u32>, // ARGB format
    pub depth_buffer: Vec<f32>,
}

impl Framebuffer {
    /// Create a framebuffer matching the surface dimensions.
    /// A zero-sized surface is a caller contract violation and is
    /// rejected here rather than at first pixel write.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "framebuffer dimensions must be non-zero, got {}x{}",
            width,
            height
        );

        let pixel_count = width * height;
        Ok(Self {
            width,
            height,
            color_buffer: vec![0; pixel_count],
            depth_buffer: vec![DEPTH_CLEAR; pixel_count],
        })
    }

    /// Reset both buffers for a new frame: the color buffer to
    /// `clear_color`, the depth buffer to its sentinel.
    pub fn clear(&mut self, clear_color: u32) {
        count_call!(FUNCTION_COUNTERS.framebuffer_clear_calls);
        fill_u32(&mut self.color_buffer, clear_color);
        fill_f32(&mut self.depth_buffer, DEPTH_CLEAR);
    }

    /// Reset only the color buffer, leaving stored depth intact.
    pub fn clear_color(&mut self, clear_color: u32) {
        fill_u32(&mut self.color_buffer, clear_color);
    }

    /// Reset only the depth buffer; every pixel becomes writable again.
    pub fn clear_depth(&mut self) {
        fill_f32(&mut self.depth_buffer, DEPTH_CLEAR);
    }

    /// Get color buffer as slice (handed to the surface for presentation)
    pub fn color_buffer_slice(&self) -> &[u32] {
        &self.color_buffer
    }

    /// Create a FrameSlice covering the entire framebuffer (for single-threaded rendering)
    pub fn as_full_slice_mut(&mut self) -> FrameSlice<'_> {
        FrameSlice {
            width: self.width,
            full_height: self.height,
            y0: 0,
            height: self.height,
            color: &mut self.color_buffer,
            depth: &mut self.depth_buffer,
        }
    }

    /// Resize framebuffer (caller guards against zero dimensions)
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        let pixel_count = width * height;
        self.color_buffer.resize(pixel_count, 0);
        self.depth_buffer.resize(pixel_count, DEPTH_CLEAR);
    }

    /// Split the framebuffer into horizontal stripes for multi-core rendering.
    /// Each stripe owns a disjoint subset of rows, so they can be rendered in
    /// parallel. Asking for more stripes than rows yields one stripe per row.
    pub fn split_into_stripes(&mut self, stripes: usize) -> Vec<FrameSlice<'_>> {
        let width = self.width;
        let height = self.height;
        let rows_per_stripe = (height + stripes.max(1) - 1) / stripes.max(1);
        let pixels_per_stripe = rows_per_stripe * width;

        self.color_buffer
            .chunks_mut(pixels_per_stripe)
            .zip(self.depth_buffer.chunks_mut(pixels_per_stripe))
            .enumerate()
            .map(|(i, (color, depth))| FrameSlice {
                width,
                full_height: height,
                y0: i * rows_per_stripe,
                height: color.len() / width,
                color,
                depth,
            })
            .collect()
    }

    /// Save the current color buffer to an image file for regression and
    /// reference comparisons. The format follows the file extension; the
    /// render loop uses `.bmp` (uncompressed).
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        count_call!(FUNCTION_COUNTERS.snapshot_saves);
        let path = path.as_ref();

        let mut image = image::RgbImage::new(self.width as u32, self.height as u32);
        for (pixel, &argb) in image.pixels_mut().zip(self.color_buffer.iter()) {
            *pixel = image::Rgb([(argb >> 16) as u8, (argb >> 8) as u8, argb as u8]);
        }

        image
            .save(path)
            .with_context(|| format!("failed to save snapshot to {}", path.display()))
    }
}

/// Convert RGB to ARGB u32
#[inline]
pub const fn rgb_to_u32(r: u8, g: u8, b: u8) -> u32 {
    0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

// Buffer fills: 8 lanes per store with AVX, 4 with SSE2, scalar
// elsewhere.

#[inline]
fn fill_u32(buffer: &mut [u32], value: u32) {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx") {
            unsafe {
                return fill_u32_avx(buffer, value);
            }
        }
        if std::arch::is_x86_feature_detected!("sse2") {
            unsafe {
                return fill_u32_sse2(buffer, value);
            }
        }
    }

    buffer.fill(value);
}

#[inline]
fn fill_f32(buffer: &mut [f32], value: f32) {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx") {
            unsafe {
                return fill_f32_avx(buffer, value);
            }
        }
        if std::arch::is_x86_feature_detected!("sse2") {
            unsafe {
                return fill_f32_sse2(buffer, value);
            }
        }
    }

    buffer.fill(value);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx")]
unsafe fn fill_u32_avx(buffer: &mut [u32], value: u32) {
    let lanes = _mm256_set1_epi32(value as i32);
    let mut chunks = buffer.chunks_exact_mut(8);
    for chunk in &mut chunks {
        _mm256_storeu_si256(chunk.as_mut_ptr() as *mut _, lanes);
    }
    chunks.into_remainder().fill(value);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn fill_u32_sse2(buffer: &mut [u32], value: u32) {
    let lanes = _mm_set1_epi32(value as i32);
    let mut chunks = buffer.chunks_exact_mut(4);
    for chunk in &mut chunks {
        _mm_storeu_si128(chunk.as_mut_ptr() as *mut _, lanes);
    }
    chunks.into_remainder().fill(value);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx")]
unsafe fn fill_f32_avx(buffer: &mut [f32], value: f32) {
    let lanes = _mm256_set1_ps(value);
    let mut chunks = buffer.chunks_exact_mut(8);
    for chunk in &mut chunks {
        _mm256_storeu_ps(chunk.as_mut_ptr(), lanes);
    }
    chunks.into_remainder().fill(value);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn fill_f32_sse2(buffer: &mut [f32], value: f32) {
    let lanes = _mm_set1_ps(value);
    let mut chunks = buffer.chunks_exact_mut(4);
    for chunk in &mut chunks {
        _mm_storeu_ps(chunk.as_mut_ptr(), lanes);
    }
    chunks.into_remainder().fill(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_every_lane_including_the_tail() {
        // 13 x 3 = 39 pixels: not a multiple of either vector width
        let mut framebuffer = Framebuffer::new(13, 3).unwrap();
        framebuffer.color_buffer.fill(0xFF102030);
        framebuffer.depth_buffer.fill(0.25);

        framebuffer.clear(DEFAULT_CLEAR_COLOR);

        assert!(framebuffer
            .color_buffer
            .iter()
            .all(|&c| c == DEFAULT_CLEAR_COLOR));
        assert!(framebuffer.depth_buffer.iter().all(|&d| d == f32::INFINITY));
    }

    #[test]
    fn partial_clears_touch_only_their_buffer() {
        let mut framebuffer = Framebuffer::new(8, 8).unwrap();
        framebuffer.color_buffer.fill(0xFF112233);
        framebuffer.depth_buffer.fill(0.5);

        framebuffer.clear_depth();
        assert!(framebuffer.color_buffer.iter().all(|&c| c == 0xFF112233));
        assert!(framebuffer.depth_buffer.iter().all(|&d| d == f32::INFINITY));

        framebuffer.depth_buffer.fill(0.5);
        framebuffer.clear_color(DEFAULT_CLEAR_COLOR);
        assert!(framebuffer
            .color_buffer
            .iter()
            .all(|&c| c == DEFAULT_CLEAR_COLOR));
        assert!(framebuffer.depth_buffer.iter().all(|&d| d == 0.5));
    }

    #[test]
    fn stripes_partition_rows_exactly_once() {
        let mut framebuffer = Framebuffer::new(10, 37).unwrap();
        let slices = framebuffer.split_into_stripes(8);

        let mut covered_rows = 0usize;
        let mut expected_y0 = 0usize;
        for slice in &slices {
            assert_eq!(slice.y0, expected_y0);
            assert_eq!(slice.color.len(), slice.height * slice.width);
            assert_eq!(slice.depth.len(), slice.color.len());
            expected_y0 += slice.height;
            covered_rows += slice.height;
        }
        assert_eq!(covered_rows, 37);
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(Framebuffer::new(0, 600).is_err());
        assert!(Framebuffer::new(800, 0).is_err());
    }
}
