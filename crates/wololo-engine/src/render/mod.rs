//! Full-screen ubershader renderer.
//!
//! The CSG scene is drawn by a single render pass that rasterizes a fixed
//! 6-vertex quad; all shape evaluation happens in the fragment shader.
//! Command buffers are recorded once at construction, so per-frame work is
//! limited to synchronization and a uniform write.

mod frame;
mod guard;
mod pipeline;
mod renderer;
mod sync;
mod uniforms;

pub use frame::{clear_color, FrameResources, QUAD_VERTEX_COUNT};
pub use guard::{AlreadyConstructed, InstanceGuard};
pub use pipeline::{load_spirv, Pipeline};
pub use renderer::Renderer;
pub use sync::{FrameCursor, FrameSlot, FrameSync, ImageFenceTable, FRAMES_IN_FLIGHT};
pub use uniforms::FrameUniforms;
