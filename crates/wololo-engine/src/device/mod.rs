//! Vulkan device + presentation management.
//!
//! This module is responsible for:
//! - loading Vulkan and creating the instance (with opportunistic validation)
//! - binding a window surface and selecting adapter + queue families
//! - negotiating and creating the swapchain and its image views
//! - the reverse-order [`Teardown`] stack every created object is registered on

mod context;
mod init;
mod instance;
mod memory;
mod names;
mod surface;
mod swapchain;
mod teardown;

pub use context::{find_queue_families, DeviceContext, QueueFamilies};
pub use init::{RendererConfig, BUILT_FRAGMENT_SHADER, BUILT_VERTEX_SHADER};
pub use instance::InstanceContext;
pub use memory::find_memory_type;
pub use names::{resolve_names, NameResolution};
pub use surface::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, create_surface,
    sharing_mode, SurfaceSupport,
};
pub use swapchain::Swapchain;
pub use teardown::Teardown;
