/// Vertex transformation stage
/// Maps mesh-space vertices through world/view/projection to NDC and
/// screen space, one pass per mesh per frame
use crate::geometry::{Vertex, VertexOut};
use crate::{count_add, count_call};
#[cfg(feature = "profiling")]
use crate::perf::FUNCTION_COUNTERS;
use glam::{Mat4, Vec2, Vec4};

/// Transform every vertex of a mesh into a `VertexOut` plus its screen
/// point. Outputs are parallel to the input: index i of either buffer
/// corresponds to `vertices[i]`.
///
/// Positions go through the composed world-view-projection; normals and
/// tangents rotate with the world matrix only. The perspective divide
/// happens here; the pre-divide clip w is kept in the output's w lane.
/// Vertices at or behind the camera plane produce non-finite NDC, which
/// the rasterizer's frustum cull rejects before any screen coordinate
/// is consumed.
pub fn transform_vertices(
    vertices: &[Vertex],
    world: &Mat4,
    view_projection: &Mat4,
    width: f32,
    height: f32,
    vertices_out: &mut Vec<VertexOut>,
    screen_out: &mut Vec<Vec2>,
) {
    count_call!(FUNCTION_COUNTERS.mesh_transform_calls);
    count_add!(FUNCTION_COUNTERS.vertices_transformed, vertices.len() as u64);

    vertices_out.clear();
    screen_out.clear();
    vertices_out.reserve(vertices.len());
    screen_out.reserve(vertices.len());

    // Composed once per mesh, one matrix multiply per vertex after that
    let world_view_projection = *view_projection * *world;

    for vertex in vertices {
        let clip = world_view_projection * vertex.position.extend(1.0);
        let ndc = Vec4::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w, clip.w);

        // Direction attributes ignore translation and stay unit length
        let normal = world.transform_vector3(vertex.normal).normalize_or_zero();
        let tangent = world.transform_vector3(vertex.tangent).normalize_or_zero();

        vertices_out.push(VertexOut {
            position: ndc,
            color: vertex.color,
            uv: vertex.uv,
            normal,
            tangent,
        });
        screen_out.push(ndc_to_screen(Vec2::new(ndc.x, ndc.y), width, height));
    }
}

/// Convert NDC coordinates to screen space
#[inline]
pub fn ndc_to_screen(ndc: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        (ndc.x + 1.0) * 0.5 * width,
        (1.0 - ndc.y) * 0.5 * height, // Flip Y for screen coordinates
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use glam::Vec3;

    #[test]
    fn ndc_corners_map_to_screen_corners() {
        let (w, h) = (800.0, 600.0);

        assert_eq!(ndc_to_screen(Vec2::new(-1.0, 1.0), w, h), Vec2::new(0.0, 0.0));
        assert_eq!(ndc_to_screen(Vec2::new(1.0, -1.0), w, h), Vec2::new(800.0, 600.0));
        assert_eq!(ndc_to_screen(Vec2::new(0.0, 0.0), w, h), Vec2::new(400.0, 300.0));
    }

    #[test]
    fn outputs_stay_parallel_to_input_and_keep_w() {
        let camera = Camera::new(60.0, 800.0 / 600.0, Vec3::new(0.0, 0.0, -10.0)).unwrap();
        let m = camera.view_projection_matrix();

        let vertices: Vec<Vertex> = [
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(1.5, -1.0, 0.0),
            Vec3::new(-1.5, -1.0, 0.0),
        ]
        .iter()
        .map(|&p| Vertex::new(p))
        .collect();

        let mut out = Vec::new();
        let mut screen = Vec::new();
        transform_vertices(&vertices, &Mat4::IDENTITY, &m, 800.0, 600.0, &mut out, &mut screen);

        assert_eq!(out.len(), 3);
        assert_eq!(screen.len(), 3);

        // Every vertex sits 10 units in front of the camera, so the
        // retained pre-divide w equals the view-space depth.
        for v in &out {
            assert!((v.position.w - 10.0).abs() < 1e-4);
        }

        // Apex projects to the horizontal center, upper third of the frame
        assert!((screen[0].x - 400.0).abs() < 1e-2);
        assert!((screen[0].y - 196.077).abs() < 0.1);

        // Base corners land symmetrically below the apex
        assert!((screen[1].x + screen[2].x - 800.0).abs() < 1e-2);
        assert!((screen[1].y - screen[2].y).abs() < 1e-3);
        assert!(screen[1].y > screen[0].y);
    }

    #[test]
    fn world_matrix_rotates_direction_attributes() {
        let camera = Camera::new(60.0, 1.0, Vec3::new(0.0, 0.0, -5.0)).unwrap();
        let vp = camera.view_projection_matrix();

        // Quarter turn around Y: +Z lands on +X, +X lands on -Z
        let world = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let vertices = vec![Vertex::new(Vec3::ZERO).with_uv(Vec2::new(0.3, 0.7))];

        let mut out = Vec::new();
        let mut screen = Vec::new();
        transform_vertices(&vertices, &world, &vp, 100.0, 100.0, &mut out, &mut screen);

        assert!((out[0].normal - Vec3::X).length() < 1e-5);
        assert!((out[0].tangent - Vec3::NEG_Z).length() < 1e-5);
        assert_eq!(out[0].uv, Vec2::new(0.3, 0.7), "uvs pass through untouched");
    }

    #[test]
    fn transform_reuses_scratch_buffers() {
        let camera = Camera::new(60.0, 1.0, Vec3::new(0.0, 0.0, -5.0)).unwrap();
        let m = camera.view_projection_matrix();

        let many: Vec<Vertex> = (0..16)
            .map(|i| Vertex::new(Vec3::new(i as f32, 0.0, 0.0)))
            .collect();
        let few = vec![Vertex::new(Vec3::ZERO)];

        let mut out = Vec::new();
        let mut screen = Vec::new();

        transform_vertices(&many, &Mat4::IDENTITY, &m, 100.0, 100.0, &mut out, &mut screen);
        assert_eq!(out.len(), 16);

        transform_vertices(&few, &Mat4::IDENTITY, &m, 100.0, 100.0, &mut out, &mut screen);
        assert_eq!(out.len(), 1, "stale entries must not survive reuse");
        assert_eq!(screen.len(), 1);
    }
}
