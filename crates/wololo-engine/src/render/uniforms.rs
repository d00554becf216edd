use ash::vk;
use bytemuck::{Pod, Zeroable};

/// Fragment uniform block, std140 layout:
///
/// ```glsl
/// layout(set = 0, binding = 0) uniform Frame {
///     float time;
///     vec2 resolution;
/// };
/// ```
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    /// Seconds since the renderer was created.
    pub time: f32,
    pub _pad: f32, // vec2 alignment
    /// Viewport size in pixels.
    pub resolution: [f32; 2],
}

impl FrameUniforms {
    pub const SIZE: vk::DeviceSize = size_of::<FrameUniforms>() as vk::DeviceSize;

    #[inline]
    pub fn new(time: f32, extent: vk::Extent2D) -> Self {
        Self {
            time,
            _pad: 0.0,
            resolution: [extent.width as f32, extent.height as f32],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_std140_layout() {
        assert_eq!(FrameUniforms::SIZE, 16);
        assert_eq!(std::mem::offset_of!(FrameUniforms, time), 0);
        assert_eq!(std::mem::offset_of!(FrameUniforms, resolution), 8);
    }

    #[test]
    fn bytes_carry_time_and_resolution() {
        let u = FrameUniforms::new(1.5, vk::Extent2D { width: 600, height: 450 });
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&u));
        assert_eq!(floats, &[1.5, 0.0, 600.0, 450.0]);
    }
}
