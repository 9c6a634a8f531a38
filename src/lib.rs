pub mod camera;
pub mod geometry;
pub mod perf;
/// Raster Engine - CPU-only software rasterizer
/// Matrix transform pipeline, edge-function fill, reciprocal depth buffer
pub mod rendering;

pub use camera::{Camera, CameraController, CameraInput};
pub use geometry::{demo_quad_grid, demo_triangle_pair, Mesh, PrimitiveTopology, Vertex, VertexOut};
pub use perf::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};
pub use rendering::{
    render_scene, ColorRgb, FilterMode, Framebuffer, Material, Rasterizer, Texture,
    DEFAULT_CLEAR_COLOR,
};
