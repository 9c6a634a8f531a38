pub mod framebuffer;
/// Software rasterization pipeline
/// Optimized for performance with minimal branching
pub mod rasterizer;
pub mod shading;
pub mod texture;
pub mod vertex_stage;

pub use framebuffer::{Framebuffer, FrameSlice, DEFAULT_CLEAR_COLOR};
pub use rasterizer::{render_scene, PixelTarget, Rasterizer};
pub use shading::{ColorRgb, Material};
pub use texture::{FilterMode, Texture};
