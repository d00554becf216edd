use std::io::Cursor;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use ash::vk;

use crate::device::{RendererConfig, Teardown};

const ENTRY_POINT: &std::ffi::CStr = c"main";

/// Reads a SPIR-V binary from disk.
///
/// A missing, empty or misaligned file is an error.
pub fn load_spirv(path: &Path) -> Result<Vec<u32>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read shader binary {}", path.display()))?;
    ensure!(!bytes.is_empty(), "shader binary {} is empty", path.display());

    ash::util::read_spv(&mut Cursor::new(bytes))
        .with_context(|| format!("{} is not valid SPIR-V", path.display()))
}

/// The fixed rendering configuration: render pass, descriptor layout and the
/// ubershader pipeline.
pub struct Pipeline {
    pub render_pass: vk::RenderPass,
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub layout: vk::PipelineLayout,
    pub handle: vk::Pipeline,
}

impl Pipeline {
    pub fn new(
        device: &ash::Device,
        format: vk::Format,
        extent: vk::Extent2D,
        config: &RendererConfig,
        teardown: &mut Teardown,
    ) -> Result<Self> {
        let render_pass = create_render_pass(device, format, teardown)?;
        let descriptor_set_layout = create_descriptor_set_layout(device, teardown)?;

        let set_layouts = [descriptor_set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
            .context("failed to create pipeline layout")?;
        {
            let device = device.clone();
            teardown.push("pipeline layout", move || unsafe {
                device.destroy_pipeline_layout(layout, None)
            });
        }

        let handle = create_graphics_pipeline(device, render_pass, layout, extent, config)?;
        {
            let device = device.clone();
            teardown.push("pipeline", move || unsafe { device.destroy_pipeline(handle, None) });
        }
        log::info!("created graphics pipeline");

        Ok(Self {
            render_pass,
            descriptor_set_layout,
            layout,
            handle,
        })
    }
}

fn create_render_pass(
    device: &ash::Device,
    format: vk::Format,
    teardown: &mut Teardown,
) -> Result<vk::RenderPass> {
    let attachments = [vk::AttachmentDescription::default()
        .format(format)
        .samples(vk::SampleCountFlags::TYPE_1)
        .load_op(vk::AttachmentLoadOp::CLEAR)
        .store_op(vk::AttachmentStoreOp::STORE)
        .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
        .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
        .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)];

    let color_refs = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)];

    // The image is not writable until acquisition has signalled.
    let dependencies = [vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)];

    let info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    let render_pass = unsafe { device.create_render_pass(&info, None) }
        .context("failed to create render pass")?;
    let device = device.clone();
    teardown.push("render pass", move || unsafe { device.destroy_render_pass(render_pass, None) });
    Ok(render_pass)
}

fn create_descriptor_set_layout(
    device: &ash::Device,
    teardown: &mut Teardown,
) -> Result<vk::DescriptorSetLayout> {
    let bindings = [vk::DescriptorSetLayoutBinding::default()
        .binding(0)
        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
        .descriptor_count(1)
        .stage_flags(vk::ShaderStageFlags::FRAGMENT)];
    let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

    let layout = unsafe { device.create_descriptor_set_layout(&info, None) }
        .context("failed to create descriptor set layout")?;
    let device = device.clone();
    teardown.push("descriptor set layout", move || unsafe {
        device.destroy_descriptor_set_layout(layout, None)
    });
    Ok(layout)
}

fn create_shader_module(
    device: &ash::Device,
    path: &Path,
    teardown: &mut Teardown,
) -> Result<vk::ShaderModule> {
    let code = load_spirv(path)?;
    let info = vk::ShaderModuleCreateInfo::default().code(&code);
    let module = unsafe { device.create_shader_module(&info, None) }
        .with_context(|| format!("failed to create shader module from {}", path.display()))?;

    let device = device.clone();
    teardown.push("shader module", move || unsafe { device.destroy_shader_module(module, None) });
    log::debug!("loaded shader {}", path.display());
    Ok(module)
}

fn create_graphics_pipeline(
    device: &ash::Device,
    render_pass: vk::RenderPass,
    layout: vk::PipelineLayout,
    extent: vk::Extent2D,
    config: &RendererConfig,
) -> Result<vk::Pipeline> {
    // Shader modules only live until the pipeline is built.
    let mut modules = Teardown::new();
    let vert = create_shader_module(device, &config.vertex_shader_path, &mut modules)?;
    let frag = create_shader_module(device, &config.fragment_shader_path, &mut modules)?;

    let stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vert)
            .name(ENTRY_POINT),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(frag)
            .name(ENTRY_POINT),
    ];

    // Quad corners come from gl_VertexIndex.
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();
    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let viewports = [full_viewport(extent)];
    let scissors = [vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&viewports)
        .scissors(&scissors);

    let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::CLOCKWISE)
        .depth_bias_enable(false);

    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false)];
    let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterizer)
        .multisample_state(&multisample)
        .color_blend_state(&color_blend)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[info], None)
    }
    .map_err(|(_, err)| err)
    .context("failed to create graphics pipeline")?;

    modules.run();
    pipelines
        .into_iter()
        .next()
        .context("driver returned no graphics pipeline")
}

/// Viewport covering the whole extent with the standard depth range.
pub(crate) fn full_viewport(extent: vk::Extent2D) -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn scratch(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("wololo-{}-{name}", std::process::id()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn missing_shader_is_an_error() {
        let err = load_spirv(Path::new("/nonexistent/wololo/shader.spv")).unwrap_err();
        assert!(err.to_string().contains("failed to read shader binary"));
    }

    #[test]
    fn empty_shader_is_an_error() {
        let path = scratch("empty.spv", &[]);
        let err = load_spirv(&path).unwrap_err();
        assert!(err.to_string().contains("is empty"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn misaligned_shader_is_an_error() {
        let path = scratch("odd.spv", &[0x03, 0x02, 0x23]);
        assert!(load_spirv(&path).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn words_are_decoded() {
        let mut bytes = Vec::new();
        for word in [0x0723_0203_u32, 0x0001_0000, 0, 1, 0] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let path = scratch("header.spv", &bytes);
        let words = load_spirv(&path).unwrap();
        assert_eq!(words, vec![0x0723_0203, 0x0001_0000, 0, 1, 0]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn default_shader_paths_hold_built_spirv() {
        let config = RendererConfig::default();
        for path in [&config.vertex_shader_path, &config.fragment_shader_path] {
            let words = load_spirv(path).unwrap();
            assert_eq!(words[0], 0x0723_0203, "{} lacks the SPIR-V magic", path.display());
            assert!(words.len() > 5);
        }
    }

    #[test]
    fn viewport_covers_extent() {
        let vp = full_viewport(vk::Extent2D { width: 600, height: 450 });
        assert_eq!((vp.x, vp.y, vp.width, vp.height), (0.0, 0.0, 600.0, 450.0));
        assert_eq!((vp.min_depth, vp.max_depth), (0.0, 1.0));
    }
}
