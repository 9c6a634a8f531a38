/// Mesh and vertex model consumed by the render pipeline.
/// Loading/parsing of asset formats happens outside this crate; meshes
/// are built from an already-decoded (vertices, indices, topology) triple.
use crate::rendering::{ColorRgb, Material};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Input vertex attributes. Immutable once authored; owned by the mesh.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub color: ColorRgb,
    pub uv: Vec2,
    pub normal: Vec3,
    pub tangent: Vec3,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: ColorRgb::WHITE,
            uv: Vec2::ZERO,
            normal: Vec3::Z,
            tangent: Vec3::X,
        }
    }
}

impl Vertex {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: ColorRgb) -> Self {
        self.color = color;
        self
    }

    pub fn with_uv(mut self, uv: Vec2) -> Self {
        self.uv = uv;
        self
    }
}

/// Post-transform vertex, rebuilt every frame. `position` holds NDC x/y/z
/// with the pre-divide clip-space w preserved in the w lane; that w is
/// what makes perspective-correct interpolation possible downstream.
#[derive(Copy, Clone, Debug)]
pub struct VertexOut {
    pub position: Vec4,
    pub color: ColorRgb,
    pub uv: Vec2,
    pub normal: Vec3,
    pub tangent: Vec3,
}

/// How the index sequence resolves into triangles.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrimitiveTopology {
    /// Indices form consecutive groups of three. Trailing indices that
    /// do not complete a group are ignored.
    TriangleList,
    /// Every index past the first two completes a triangle; odd-numbered
    /// triangles swap their 2nd/3rd vertices to keep the winding uniform.
    TriangleStrip,
}

pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: PrimitiveTopology,
    pub material: Material,
    /// Model-to-world transform, free to change between frames.
    pub world: Mat4,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, topology: PrimitiveTopology) -> Self {
        debug_assert!(
            indices.iter().all(|&i| (i as usize) < vertices.len()),
            "mesh index out of range"
        );

        Self {
            vertices,
            indices,
            topology,
            material: Material::VertexColor,
            world: Mat4::IDENTITY,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    /// Number of triangles the index sequence resolves to. Degenerate
    /// triangles are counted here and rejected later at raster time.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        match self.topology {
            PrimitiveTopology::TriangleList => self.indices.len() / 3,
            PrimitiveTopology::TriangleStrip => self.indices.len().saturating_sub(2),
        }
    }

    /// Resolve triangle `tri` into three vertex indices, applying the
    /// strip's alternating winding swap.
    #[inline]
    pub fn triangle_indices(&self, tri: usize) -> [u32; 3] {
        match self.topology {
            PrimitiveTopology::TriangleList => {
                let base = tri * 3;
                [
                    self.indices[base],
                    self.indices[base + 1],
                    self.indices[base + 2],
                ]
            }
            PrimitiveTopology::TriangleStrip => {
                if tri % 2 == 0 {
                    [
                        self.indices[tri],
                        self.indices[tri + 1],
                        self.indices[tri + 2],
                    ]
                } else {
                    [
                        self.indices[tri],
                        self.indices[tri + 2],
                        self.indices[tri + 1],
                    ]
                }
            }
        }
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        (0..self.triangle_count()).map(move |tri| self.triangle_indices(tri))
    }
}

/// The two reference triangles the renderer boots with: a solid red one
/// nearest the camera and a larger one behind it carrying one primary
/// color per vertex.
pub fn demo_triangle_pair() -> Vec<Mesh> {
    let solid = Mesh::new(
        vec![
            Vertex::new(Vec3::new(0.0, 2.0, 0.0)).with_color(ColorRgb::RED),
            Vertex::new(Vec3::new(1.5, -1.0, 0.0)).with_color(ColorRgb::RED),
            Vertex::new(Vec3::new(-1.5, -1.0, 0.0)).with_color(ColorRgb::RED),
        ],
        vec![0, 1, 2],
        PrimitiveTopology::TriangleList,
    );

    let blended = Mesh::new(
        vec![
            Vertex::new(Vec3::new(0.0, 4.0, 2.0)).with_color(ColorRgb::RED),
            Vertex::new(Vec3::new(3.0, -2.0, 2.0)).with_color(ColorRgb::GREEN),
            Vertex::new(Vec3::new(-3.0, -2.0, 2.0)).with_color(ColorRgb::BLUE),
        ],
        vec![0, 1, 2],
        PrimitiveTopology::TriangleList,
    );

    vec![solid, blended]
}

/// 3x3 vertex quad grid spanning [-3, 3] in x and y with UVs across
/// [0, 1]. The same eight front-facing cells are expressed either as
/// plain index triples or as one strip whose repeated indices stitch
/// the two cell rows together.
pub fn demo_quad_grid(topology: PrimitiveTopology, material: Material) -> Mesh {
    let mut vertices = Vec::with_capacity(9);
    for row in 0..3u32 {
        for col in 0..3u32 {
            let position = Vec3::new(col as f32 * 3.0 - 3.0, 3.0 - row as f32 * 3.0, 0.0);
            let uv = Vec2::new(col as f32 * 0.5, row as f32 * 0.5);
            vertices.push(Vertex::new(position).with_uv(uv));
        }
    }

    let indices = match topology {
        PrimitiveTopology::TriangleList => vec![
            3, 0, 1, 1, 4, 3, 4, 1, 2, 2, 5, 4, 6, 3, 4, 4, 7, 6, 7, 4, 5, 5, 8, 7,
        ],
        PrimitiveTopology::TriangleStrip => vec![3, 0, 4, 1, 5, 2, 2, 6, 6, 3, 7, 4, 8, 5],
    };

    Mesh::new(vertices, indices, topology).with_material(material)
}
