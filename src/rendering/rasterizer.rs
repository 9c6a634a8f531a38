/// Software rasterizer using edge functions over screen bounding boxes
/// Optimized for cache locality and minimal branching
use super::framebuffer::{Framebuffer, FrameSlice};
use super::shading::{ColorRgb, Material};
use super::texture::Texture;
use super::vertex_stage;
use crate::count_call;
use crate::geometry::{Mesh, VertexOut};
#[cfg(feature = "profiling")]
use crate::perf::FUNCTION_COUNTERS;
use glam::{Mat4, Vec2, Vec4};
use rayon::prelude::*;

/// Extra pixels added around the screen bounding box before clamping.
const BBOX_MARGIN: f32 = 1.0;

/// Abstraction over a render target that supports depth-tested pixel writes.
pub trait PixelTarget {
    /// Full framebuffer width (stride for indexing).
    fn width(&self) -> usize;
    /// Full framebuffer height (used for NDC -> screen mapping).
    fn full_height(&self) -> usize;
    /// Rectangle covered by this target in framebuffer coordinates:
    /// (x0, y0, width, height).
    fn rect(&self) -> (usize, usize, usize, usize);
    unsafe fn test_depth_and_get_index(
        &mut self,
        x: usize,
        y: usize,
        depth: f32,
    ) -> Option<usize>;
    fn write_color(&mut self, index: usize, color: u32);
}

impl<'a> PixelTarget for FrameSlice<'a> {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn full_height(&self) -> usize {
        self.full_height
    }

    #[inline]
    fn rect(&self) -> (usize, usize, usize, usize) {
        (0, self.y0, self.width, self.height)
    }

    #[inline]
    unsafe fn test_depth_and_get_index(
        &mut self,
        x: usize,
        y: usize,
        depth: f32,
    ) -> Option<usize> {
        FrameSlice::test_depth_and_get_index(self, x, y, depth)
    }

    #[inline]
    fn write_color(&mut self, index: usize, color: u32) {
        FrameSlice::write_color(self, index, color);
    }
}

/// Per-triangle interpolation inputs, premultiplied by 1/w so the pixel
/// loop only blends and divides once. One variant per shading strategy;
/// the strategy is chosen per mesh, not per pipeline copy.
enum ShadingPlan<'a> {
    VertexColor {
        c0_over_w: ColorRgb,
        c1_over_w: ColorRgb,
        c2_over_w: ColorRgb,
    },
    Textured {
        texture: &'a Texture,
        uv0_over_w: Vec2,
        uv1_over_w: Vec2,
        uv2_over_w: Vec2,
    },
}

pub struct Rasterizer {
    // Scratch buffers so each vertex is transformed once per mesh rather
    // than once per triangle. Reused across meshes and frames.
    vertices_out: Vec<VertexOut>,
    screen_positions: Vec<Vec2>,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self {
            vertices_out: Vec::new(),
            screen_positions: Vec::new(),
        }
    }

    /// Render a mesh to the full framebuffer (single-threaded path).
    pub fn render_mesh(
        &mut self,
        mesh: &Mesh,
        view_projection: &Mat4,
        framebuffer: &mut Framebuffer,
    ) {
        let mut slice = framebuffer.as_full_slice_mut();
        self.render_mesh_into_target(mesh, view_projection, &mut slice);
    }

    /// Render a mesh into a specific framebuffer slice (used for multi-core stripes).
    pub fn render_mesh_into_slice(
        &mut self,
        mesh: &Mesh,
        view_projection: &Mat4,
        slice: &mut FrameSlice<'_>,
    ) {
        self.render_mesh_into_target(mesh, view_projection, slice);
    }

    /// Transform a mesh's vertices and rasterize its triangles into the target.
    pub fn render_mesh_into_target<T: PixelTarget>(
        &mut self,
        mesh: &Mesh,
        view_projection: &Mat4,
        target: &mut T,
    ) {
        if mesh.vertices.is_empty() || mesh.triangle_count() == 0 {
            return;
        }

        vertex_stage::transform_vertices(
            &mesh.vertices,
            &mesh.world,
            view_projection,
            target.width() as f32,
            target.full_height() as f32,
            &mut self.vertices_out,
            &mut self.screen_positions,
        );

        for tri in 0..mesh.triangle_count() {
            let [i0, i1, i2] = mesh.triangle_indices(tri);

            // Repeated indices mark zero-area stitches (common in strips)
            if i0 == i1 || i1 == i2 || i0 == i2 {
                count_call!(FUNCTION_COUNTERS.render_triangle_degenerate);
                continue;
            }

            self.render_triangle(i0 as usize, i1 as usize, i2 as usize, &mesh.material, target);
        }
    }

    /// Rasterize one triangle from the transformed scratch buffers.
    /// Returns true if at least one pixel was written.
    fn render_triangle<T: PixelTarget>(
        &self,
        i0: usize,
        i1: usize,
        i2: usize,
        material: &Material,
        target: &mut T,
    ) -> bool {
        count_call!(FUNCTION_COUNTERS.render_triangle_calls);

        let v0 = &self.vertices_out[i0];
        let v1 = &self.vertices_out[i1];
        let v2 = &self.vertices_out[i2];

        // Conservative per-vertex frustum cull: a triangle with any vertex
        // outside NDC bounds is dropped whole, straddling ones included.
        // No clipping is performed.
        if !in_ndc_bounds(v0.position)
            || !in_ndc_bounds(v1.position)
            || !in_ndc_bounds(v2.position)
        {
            count_call!(FUNCTION_COUNTERS.render_triangle_culled);
            return false;
        }

        let s0 = self.screen_positions[i0];
        let s1 = self.screen_positions[i1];
        let s2 = self.screen_positions[i2];

        // The signed area doubles as the back-face test: front faces wind
        // to positive area in screen space.
        let area = edge_function(s0, s1, s2);
        if area <= 0.0 {
            count_call!(FUNCTION_COUNTERS.render_triangle_backface);
            return false;
        }
        let inv_area = 1.0 / area;

        // Screen bounding box with a safety margin, clamped to the framebuffer
        let fb_w = target.width() as i32;
        let fb_h = target.full_height() as i32;
        let mut min_x = (s0.x.min(s1.x).min(s2.x) - BBOX_MARGIN).floor() as i32;
        let mut max_x = (s0.x.max(s1.x).max(s2.x) + BBOX_MARGIN).ceil() as i32;
        let mut min_y = (s0.y.min(s1.y).min(s2.y) - BBOX_MARGIN).floor() as i32;
        let mut max_y = (s0.y.max(s1.y).max(s2.y) + BBOX_MARGIN).ceil() as i32;

        min_x = min_x.max(0);
        max_x = max_x.min(fb_w - 1);
        min_y = min_y.max(0);
        max_y = max_y.min(fb_h - 1);

        // Intersect with this target's rectangle (stripe)
        let (tx0, ty0, tw, th) = target.rect();
        min_x = min_x.max(tx0 as i32);
        max_x = max_x.min((tx0 + tw - 1) as i32);
        min_y = min_y.max(ty0 as i32);
        max_y = max_y.min((ty0 + th - 1) as i32);

        // Skip if completely outside this target
        if min_x > max_x || min_y > max_y {
            return false;
        }

        let (z0, z1, z2) = (v0.position.z, v1.position.z, v2.position.z);
        let (inv_z0, inv_z1, inv_z2) = (1.0 / z0, 1.0 / z1, 1.0 / z2);
        let (inv_w0, inv_w1, inv_w2) = (
            1.0 / v0.position.w,
            1.0 / v1.position.w,
            1.0 / v2.position.w,
        );

        let plan = match material {
            Material::VertexColor => ShadingPlan::VertexColor {
                c0_over_w: v0.color * inv_w0,
                c1_over_w: v1.color * inv_w1,
                c2_over_w: v2.color * inv_w2,
            },
            Material::Textured(texture) => ShadingPlan::Textured {
                texture,
                uv0_over_w: v0.uv * inv_w0,
                uv1_over_w: v1.uv * inv_w1,
                uv2_over_w: v2.uv * inv_w2,
            },
        };

        // Precompute edge deltas for incremental stepping
        let w0_step_x = s1.y - s2.y;
        let w0_step_y = s2.x - s1.x;
        let w1_step_x = s2.y - s0.y;
        let w1_step_y = s0.x - s2.x;
        let w2_step_x = s0.y - s1.y;
        let w2_step_y = s1.x - s0.x;

        // Evaluate edge functions at the top-left pixel center
        let p_start = Vec2::new(min_x as f32 + 0.5, min_y as f32 + 0.5);
        let mut w0_row = edge_function(s1, s2, p_start);
        let mut w1_row = edge_function(s2, s0, p_start);
        let mut w2_row = edge_function(s0, s1, p_start);

        let mut any_drawn = false;

        for y in min_y..=max_y {
            let mut w0 = w0_row;
            let mut w1 = w1_row;
            let mut w2 = w2_row;

            for x in min_x..=max_x {
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    count_call!(FUNCTION_COUNTERS.set_pixel_attempts);

                    let bw0 = w0 * inv_area;
                    let bw1 = w1 * inv_area;
                    let bw2 = w2 * inv_area;

                    // Perspective-correct depth from reciprocal blending,
                    // not a linear barycentric mix
                    let depth = 1.0 / (bw0 * inv_z0 + bw1 * inv_z1 + bw2 * inv_z2);

                    if let Some(idx) =
                        unsafe { target.test_depth_and_get_index(x as usize, y as usize, depth) }
                    {
                        let w_interp = 1.0 / (bw0 * inv_w0 + bw1 * inv_w1 + bw2 * inv_w2);
                        let color = match &plan {
                            ShadingPlan::VertexColor {
                                c0_over_w,
                                c1_over_w,
                                c2_over_w,
                            } => {
                                (*c0_over_w * bw0 + *c1_over_w * bw1 + *c2_over_w * bw2)
                                    * w_interp
                            }
                            ShadingPlan::Textured {
                                texture,
                                uv0_over_w,
                                uv1_over_w,
                                uv2_over_w,
                            } => {
                                let uv = (*uv0_over_w * bw0 + *uv1_over_w * bw1
                                    + *uv2_over_w * bw2)
                                    * w_interp;
                                texture.sample(uv)
                            }
                        };

                        // Overflow-normalized pack; in-range colors pass through
                        target.write_color(idx, color.max_to_one().to_argb());
                        count_call!(FUNCTION_COUNTERS.set_pixel_depth_passed);
                        any_drawn = true;
                    } else {
                        count_call!(FUNCTION_COUNTERS.set_pixel_depth_failed);
                    }
                }

                w0 += w0_step_x;
                w1 += w1_step_x;
                w2 += w2_step_x;
            }

            w0_row += w0_step_y;
            w1_row += w1_step_y;
            w2_row += w2_step_y;
        }

        any_drawn
    }
}

/// Render every mesh across horizontal stripes in parallel. Each stripe
/// owns a disjoint row range and draws all meshes in submission order, so
/// the output is bit-identical to the single-stripe path.
pub fn render_scene(
    framebuffer: &mut Framebuffer,
    meshes: &[Mesh],
    view_projection: &Mat4,
    stripes: usize,
) {
    let slices = framebuffer.split_into_stripes(stripes);

    slices
        .into_par_iter()
        .for_each_init(Rasterizer::new, |rasterizer, mut slice| {
            for mesh in meshes {
                rasterizer.render_mesh_into_slice(mesh, view_projection, &mut slice);
            }
        });
}

/// Inclusive NDC containment test. Both depth boundaries count as inside;
/// non-finite components fail the comparisons and cull the triangle.
#[inline]
fn in_ndc_bounds(ndc: Vec4) -> bool {
    ndc.x >= -1.0
        && ndc.x <= 1.0
        && ndc.y >= -1.0
        && ndc.y <= 1.0
        && ndc.z >= 0.0
        && ndc.z <= 1.0
}

/// Edge function for barycentric coordinates
/// Returns 2x the signed area of the triangle
#[inline]
fn edge_function(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}
