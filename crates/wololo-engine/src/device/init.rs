use std::ffi::CString;
use std::path::PathBuf;

/// SPIR-V the build script compiles from `shaders/csg.vert`.
pub const BUILT_VERTEX_SHADER: &str = concat!(env!("OUT_DIR"), "/csg.vert.spv");

/// SPIR-V the build script compiles from `shaders/csg.frag`.
pub const BUILT_FRAGMENT_SHADER: &str = concat!(env!("OUT_DIR"), "/csg.frag.spv");

/// Construction parameters for the renderer.
///
/// Layer and extension lists are resolved at runtime against what the platform
/// reports as available.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name reported to the driver; also the scene arena's name.
    pub app_name: String,

    /// Capacity of the scene arena.
    pub max_node_count: usize,

    /// Request the validation layers below.
    ///
    /// Missing layers are logged and skipped.
    pub enable_validation: bool,

    pub validation_layers: Vec<CString>,

    /// Device extensions without which construction fails.
    pub required_device_extensions: Vec<CString>,

    /// Device extensions enabled only when available.
    pub optional_device_extensions: Vec<CString>,

    /// Precompiled SPIR-V for the full-screen quad vertex stage.
    pub vertex_shader_path: PathBuf,

    /// Precompiled SPIR-V for the ray-marching fragment stage.
    pub fragment_shader_path: PathBuf,
}

impl RendererConfig {
    /// Default configuration with the given name and arena capacity.
    pub fn new(app_name: impl Into<String>, max_node_count: usize) -> Self {
        Self {
            app_name: app_name.into(),
            max_node_count,
            ..Self::default()
        }
    }

    pub fn with_shader_paths(
        mut self,
        vertex: impl Into<PathBuf>,
        fragment: impl Into<PathBuf>,
    ) -> Self {
        self.vertex_shader_path = vertex.into();
        self.fragment_shader_path = fragment.into();
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "wololo".to_string(),
            max_node_count: 256,
            enable_validation: cfg!(debug_assertions),
            validation_layers: vec![c"VK_LAYER_KHRONOS_validation".to_owned()],
            required_device_extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            optional_device_extensions: Vec::new(),
            vertex_shader_path: PathBuf::from(BUILT_VERTEX_SHADER),
            fragment_shader_path: PathBuf::from(BUILT_FRAGMENT_SHADER),
        }
    }
}
