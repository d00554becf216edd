use anyhow::{Context, Result};
use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use super::{InstanceContext, QueueFamilies, Teardown};

/// Capabilities, formats and present modes a surface reports for one adapter.
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// Queries the surface. Empty format or present-mode lists are an error.
    pub fn query(
        ctx: &InstanceContext,
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> Result<Self> {
        let loader = &ctx.surface_loader;
        let (capabilities, formats, present_modes) = unsafe {
            (
                loader
                    .get_physical_device_surface_capabilities(physical_device, surface)
                    .context("failed to query surface capabilities")?,
                loader
                    .get_physical_device_surface_formats(physical_device, surface)
                    .context("failed to query surface formats")?,
                loader
                    .get_physical_device_surface_present_modes(physical_device, surface)
                    .context("failed to query surface present modes")?,
            )
        };

        anyhow::ensure!(!formats.is_empty(), "surface reports no formats");
        anyhow::ensure!(!present_modes.is_empty(), "surface reports no present modes");

        Ok(Self { capabilities, formats, present_modes })
    }
}

/// Creates the platform surface for a window and registers its destruction.
pub fn create_surface(
    ctx: &InstanceContext,
    display: RawDisplayHandle,
    window: RawWindowHandle,
    teardown: &mut Teardown,
) -> Result<vk::SurfaceKHR> {
    let surface =
        unsafe { ash_window::create_surface(&ctx.entry, &ctx.instance, display, window, None) }
            .context("failed to create a window surface")?;

    let loader = ctx.surface_loader.clone();
    teardown.push("surface", move || unsafe { loader.destroy_surface(surface, None) });

    log::info!("created window surface");
    Ok(surface)
}

/// BGRA8 sRGB with the sRGB non-linear colour space if offered, else the first format.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first().copied())
}

/// MAILBOX when offered; FIFO otherwise (always supported).
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// The surface's current extent, or the framebuffer size clamped to the
/// supported range when the surface leaves it undefined (`u32::MAX`).
pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, framebuffer: (u32, u32)) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }

    vk::Extent2D {
        width: framebuffer
            .0
            .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
        height: framebuffer
            .1
            .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum; a maximum of 0 means no cap.
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count + 1;
    if caps.max_image_count == 0 {
        wanted
    } else {
        wanted.min(caps.max_image_count)
    }
}

/// CONCURRENT across both families when they differ, else EXCLUSIVE.
///
/// The returned indices are only meaningful for CONCURRENT.
pub fn sharing_mode(families: QueueFamilies) -> (vk::SharingMode, Vec<u32>) {
    if families.is_shared() {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    } else {
        (vk::SharingMode::CONCURRENT, vec![families.graphics, families.present])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    // ── format ────────────────────────────────────────────────────────────

    #[test]
    fn format_prefers_bgra8_srgb_nonlinear() {
        let formats = [
            fmt(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            fmt(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats), Some(formats[1]));
    }

    #[test]
    fn format_falls_back_to_first_entry() {
        let formats = [
            fmt(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            // Right format, wrong colour space: not an exact match.
            fmt(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT),
            fmt(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats), Some(formats[0]));
    }

    #[test]
    fn format_none_when_empty() {
        assert_eq!(choose_surface_format(&[]), None);
    }

    // ── present mode ──────────────────────────────────────────────────────

    #[test]
    fn present_mode_fifo_only() {
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO]),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn present_mode_prefers_mailbox() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn present_mode_ignores_immediate() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    // ── extent ────────────────────────────────────────────────────────────

    #[test]
    fn extent_uses_defined_current_extent() {
        let mut c = caps(2, 3);
        c.current_extent = vk::Extent2D { width: 800, height: 600 };
        assert_eq!(choose_extent(&c, (1, 1)), c.current_extent);
    }

    #[test]
    fn extent_clamps_framebuffer_when_undefined() {
        let mut c = caps(2, 3);
        c.current_extent = vk::Extent2D { width: u32::MAX, height: u32::MAX };
        c.min_image_extent = vk::Extent2D { width: 100, height: 100 };
        c.max_image_extent = vk::Extent2D { width: 1000, height: 500 };

        assert_eq!(
            choose_extent(&c, (2000, 50)),
            vk::Extent2D { width: 1000, height: 100 }
        );
        assert_eq!(
            choose_extent(&c, (600, 450)),
            vk::Extent2D { width: 600, height: 450 }
        );
    }

    // ── image count ───────────────────────────────────────────────────────

    #[test]
    fn image_count_is_min_plus_one() {
        assert_eq!(choose_image_count(&caps(2, 8)), 3);
    }

    #[test]
    fn image_count_respects_max() {
        assert_eq!(choose_image_count(&caps(3, 3)), 3);
    }

    #[test]
    fn image_count_zero_max_is_unbounded() {
        assert_eq!(choose_image_count(&caps(4, 0)), 5);
    }

    // ── sharing ───────────────────────────────────────────────────────────

    #[test]
    fn sharing_exclusive_for_one_family() {
        let (mode, indices) = sharing_mode(QueueFamilies { graphics: 0, present: 0 });
        assert_eq!(mode, vk::SharingMode::EXCLUSIVE);
        assert!(indices.is_empty());
    }

    #[test]
    fn sharing_concurrent_for_two_families() {
        let (mode, indices) = sharing_mode(QueueFamilies { graphics: 0, present: 2 });
        assert_eq!(mode, vk::SharingMode::CONCURRENT);
        assert_eq!(indices, vec![0, 2]);
    }
}
