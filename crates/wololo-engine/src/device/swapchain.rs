use anyhow::{Context, Result};
use ash::khr::swapchain;
use ash::vk;

use super::{
    choose_extent, choose_image_count, choose_present_mode, choose_surface_format, sharing_mode,
    DeviceContext, InstanceContext, SurfaceSupport, Teardown,
};

/// Presentable image chain bound to the window surface.
///
/// Created once; resize/recreation is not supported, so the swapchain never has
/// a predecessor.
pub struct Swapchain {
    pub loader: swapchain::Device,
    pub handle: vk::SwapchainKHR,

    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,

    /// Owned by the swapchain; never destroyed individually.
    pub images: Vec<vk::Image>,
    /// One view per image, same order.
    pub views: Vec<vk::ImageView>,
}

impl Swapchain {
    pub fn new(
        ctx: &InstanceContext,
        dev: &DeviceContext,
        surface: vk::SurfaceKHR,
        framebuffer_size: (u32, u32),
        teardown: &mut Teardown,
    ) -> Result<Self> {
        let support = SurfaceSupport::query(ctx, dev.physical_device, surface)?;
        let caps = &support.capabilities;

        let format = choose_surface_format(&support.formats).context("surface reports no formats")?;
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(caps, framebuffer_size);
        let image_count = choose_image_count(caps);
        let (sharing, family_indices) = sharing_mode(dev.families);

        log::info!(
            "swapchain: format={:?}/{:?} present_mode={:?} extent={}x{} images(min={} -> requested={}) sharing={:?}",
            format.format,
            format.color_space,
            present_mode,
            extent.width,
            extent.height,
            caps.min_image_count,
            image_count,
            sharing,
        );

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing)
            .queue_family_indices(&family_indices)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let loader = swapchain::Device::new(&ctx.instance, &dev.device);
        let handle = unsafe { loader.create_swapchain(&create_info, None) }
            .context("failed to create swapchain")?;
        {
            let loader = loader.clone();
            teardown.push("swapchain", move || unsafe { loader.destroy_swapchain(handle, None) });
        }

        let images = unsafe { loader.get_swapchain_images(handle) }
            .context("failed to get swapchain images")?;
        log::info!("swapchain created with {} images", images.len());

        let mut views = Vec::with_capacity(images.len());
        for &image in &images {
            views.push(create_view(&dev.device, image, format.format, teardown)?);
        }

        Ok(Self {
            loader,
            handle,
            format,
            present_mode,
            extent,
            images,
            views,
        })
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

fn create_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
    teardown: &mut Teardown,
) -> Result<vk::ImageView> {
    let info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        });

    let view = unsafe { device.create_image_view(&info, None) }
        .context("failed to create swapchain image view")?;

    let device = device.clone();
    teardown.push("image view", move || unsafe { device.destroy_image_view(view, None) });
    Ok(view)
}
