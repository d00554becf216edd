use anyhow::{Context, Result};
use ash::vk;

use crate::device::{find_memory_type, DeviceContext, Swapchain, Teardown};

use super::pipeline::full_viewport;
use super::{FrameUniforms, Pipeline};

/// Vertices of the two triangles covering the viewport.
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Clear colour of the render pass: magenta in debug builds so uncovered
/// pixels stand out, black otherwise.
pub fn clear_color() -> [f32; 4] {
    if cfg!(debug_assertions) {
        [1.0, 0.0, 1.0, 1.0]
    } else {
        [0.0, 0.0, 0.0, 1.0]
    }
}

/// Per-swapchain-image objects; every vector is indexed by image index.
///
/// Command buffers and descriptor sets are freed with their pools.
pub struct FrameResources {
    pub framebuffers: Vec<vk::Framebuffer>,
    pub command_pool: vk::CommandPool,
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub uniform_buffers: Vec<vk::Buffer>,
    pub uniform_memory: Vec<vk::DeviceMemory>,
    pub descriptor_pool: vk::DescriptorPool,
    pub descriptor_sets: Vec<vk::DescriptorSet>,
}

impl FrameResources {
    /// Creates the resources and records every command buffer once.
    pub fn new(
        dev: &DeviceContext,
        swapchain: &Swapchain,
        pipeline: &Pipeline,
        teardown: &mut Teardown,
    ) -> Result<Self> {
        let device = &dev.device;
        let count = swapchain.image_count();

        let framebuffers = swapchain
            .views
            .iter()
            .map(|&view| create_framebuffer(device, pipeline.render_pass, view, swapchain.extent, teardown))
            .collect::<Result<Vec<_>>>()?;

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(dev.families.graphics);
        let command_pool = unsafe { device.create_command_pool(&pool_info, None) }
            .context("failed to create command pool")?;
        {
            let device = device.clone();
            teardown.push("command pool", move || unsafe {
                device.destroy_command_pool(command_pool, None)
            });
        }

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32);
        let command_buffers = unsafe { device.allocate_command_buffers(&alloc_info) }
            .context("failed to allocate command buffers")?;

        let mut uniform_buffers = Vec::with_capacity(count);
        let mut uniform_memory = Vec::with_capacity(count);
        for _ in 0..count {
            let (buffer, memory) = create_uniform_buffer(dev, teardown)?;
            uniform_buffers.push(buffer);
            uniform_memory.push(memory);
        }

        let (descriptor_pool, descriptor_sets) =
            create_descriptor_sets(device, pipeline.descriptor_set_layout, &uniform_buffers, teardown)?;

        let resources = Self {
            framebuffers,
            command_pool,
            command_buffers,
            uniform_buffers,
            uniform_memory,
            descriptor_pool,
            descriptor_sets,
        };
        resources.record(device, pipeline, swapchain.extent)?;
        log::info!("recorded {count} command buffers");

        Ok(resources)
    }

    fn record(&self, device: &ash::Device, pipeline: &Pipeline, extent: vk::Extent2D) -> Result<()> {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue { float32: clear_color() },
        }];
        let viewports = [full_viewport(extent)];

        for (i, &cmd) in self.command_buffers.iter().enumerate() {
            let begin = vk::CommandBufferBeginInfo::default();
            let pass = vk::RenderPassBeginInfo::default()
                .render_pass(pipeline.render_pass)
                .framebuffer(self.framebuffers[i])
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);

            unsafe {
                device
                    .begin_command_buffer(cmd, &begin)
                    .context("failed to begin recording command buffer")?;

                device.cmd_begin_render_pass(cmd, &pass, vk::SubpassContents::INLINE);
                device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.handle);
                device.cmd_set_viewport(cmd, 0, &viewports);
                device.cmd_bind_descriptor_sets(
                    cmd,
                    vk::PipelineBindPoint::GRAPHICS,
                    pipeline.layout,
                    0,
                    &[self.descriptor_sets[i]],
                    &[],
                );
                device.cmd_draw(cmd, QUAD_VERTEX_COUNT, 1, 0, 0);
                device.cmd_end_render_pass(cmd);

                device
                    .end_command_buffer(cmd)
                    .context("failed to record command buffer")?;
            }
        }
        Ok(())
    }

    /// Overwrites the uniform block of one swapchain image.
    ///
    /// The caller must know the GPU is no longer reading that image's buffer.
    pub fn write_uniforms(
        &self,
        device: &ash::Device,
        image_index: usize,
        uniforms: &FrameUniforms,
    ) -> Result<()> {
        let memory = self.uniform_memory[image_index];
        let bytes = bytemuck::bytes_of(uniforms);
        unsafe {
            let ptr = device
                .map_memory(memory, 0, FrameUniforms::SIZE, vk::MemoryMapFlags::empty())
                .context("failed to map uniform memory")?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            device.unmap_memory(memory);
        }
        Ok(())
    }
}

fn create_framebuffer(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    view: vk::ImageView,
    extent: vk::Extent2D,
    teardown: &mut Teardown,
) -> Result<vk::Framebuffer> {
    let attachments = [view];
    let info = vk::FramebufferCreateInfo::default()
        .render_pass(render_pass)
        .attachments(&attachments)
        .width(extent.width)
        .height(extent.height)
        .layers(1);

    let framebuffer = unsafe { device.create_framebuffer(&info, None) }
        .context("failed to create framebuffer")?;
    let device = device.clone();
    teardown.push("framebuffer", move || unsafe { device.destroy_framebuffer(framebuffer, None) });
    Ok(framebuffer)
}

fn create_uniform_buffer(
    dev: &DeviceContext,
    teardown: &mut Teardown,
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    let device = &dev.device;

    let info = vk::BufferCreateInfo::default()
        .size(FrameUniforms::SIZE)
        .usage(vk::BufferUsageFlags::UNIFORM_BUFFER)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let buffer = unsafe { device.create_buffer(&info, None) }
        .context("failed to create uniform buffer")?;
    {
        let device = device.clone();
        teardown.push("uniform buffer", move || unsafe { device.destroy_buffer(buffer, None) });
    }

    let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
    let memory_type = find_memory_type(
        &dev.memory_properties,
        requirements.memory_type_bits,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
    )
    .context("no host-visible coherent memory type for uniform buffers")?;

    let alloc = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type);
    let memory = unsafe { device.allocate_memory(&alloc, None) }
        .context("failed to allocate uniform buffer memory")?;
    {
        let device = device.clone();
        teardown.push("uniform memory", move || unsafe { device.free_memory(memory, None) });
    }

    unsafe { device.bind_buffer_memory(buffer, memory, 0) }
        .context("failed to bind uniform buffer memory")?;

    Ok((buffer, memory))
}

fn create_descriptor_sets(
    device: &ash::Device,
    layout: vk::DescriptorSetLayout,
    buffers: &[vk::Buffer],
    teardown: &mut Teardown,
) -> Result<(vk::DescriptorPool, Vec<vk::DescriptorSet>)> {
    let count = buffers.len() as u32;

    let sizes = [vk::DescriptorPoolSize {
        ty: vk::DescriptorType::UNIFORM_BUFFER,
        descriptor_count: count,
    }];
    let pool_info = vk::DescriptorPoolCreateInfo::default()
        .pool_sizes(&sizes)
        .max_sets(count);
    let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }
        .context("failed to create descriptor pool")?;
    {
        let device = device.clone();
        teardown.push("descriptor pool", move || unsafe {
            device.destroy_descriptor_pool(pool, None)
        });
    }

    let layouts = vec![layout; buffers.len()];
    let alloc = vk::DescriptorSetAllocateInfo::default()
        .descriptor_pool(pool)
        .set_layouts(&layouts);
    let sets = unsafe { device.allocate_descriptor_sets(&alloc) }
        .context("failed to allocate descriptor sets")?;

    for (&set, &buffer) in sets.iter().zip(buffers) {
        let buffer_info = [vk::DescriptorBufferInfo {
            buffer,
            offset: 0,
            range: FrameUniforms::SIZE,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(0)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info);
        unsafe { device.update_descriptor_sets(&[write], &[]) };
    }

    Ok((pool, sets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_color_is_opaque() {
        assert_eq!(clear_color()[3], 1.0);
    }

    #[test]
    fn clear_color_depends_on_build() {
        let expected = if cfg!(debug_assertions) {
            [1.0, 0.0, 1.0, 1.0]
        } else {
            [0.0, 0.0, 0.0, 1.0]
        };
        assert_eq!(clear_color(), expected);
    }

    #[test]
    fn quad_is_two_triangles() {
        assert_eq!(QUAD_VERTEX_COUNT % 3, 0);
        assert_eq!(QUAD_VERTEX_COUNT / 3, 2);
    }
}
