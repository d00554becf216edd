use anyhow::{bail, Context, Result};
use ash::vk;

use super::{resolve_names, InstanceContext, RendererConfig, Teardown};

/// Queue family indices for graphics work and presentation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Returns `true` when one family serves both roles.
    #[inline]
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Distinct family indices, graphics first.
    pub fn unique(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Finds the first graphics-capable family and the first present-capable family.
///
/// `supports_present` is asked about families in index order until one answers
/// `true`; query failures are propagated.
pub fn find_queue_families<F>(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: F,
) -> Result<QueueFamilies>
where
    F: FnMut(u32) -> Result<bool>,
{
    let graphics = families
        .iter()
        .position(|f| f.queue_count > 0 && f.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .context("no queue family with graphics support")?;

    let mut present = None;
    for index in 0..families.len() as u32 {
        if supports_present(index)? {
            present = Some(index);
            break;
        }
    }
    let Some(present) = present else {
        bail!("no queue family can present to the surface");
    };

    Ok(QueueFamilies { graphics: graphics as u32, present })
}

/// Selected adapter, logical device and its queues.
pub struct DeviceContext {
    pub physical_device: vk::PhysicalDevice,
    pub device_name: String,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,

    pub device: ash::Device,
    pub families: QueueFamilies,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

impl DeviceContext {
    /// Picks the first enumerated adapter and opens a logical device on it.
    pub fn new(
        ctx: &InstanceContext,
        surface: vk::SurfaceKHR,
        config: &RendererConfig,
        teardown: &mut Teardown,
    ) -> Result<Self> {
        let instance = &ctx.instance;

        let physical_devices = unsafe { instance.enumerate_physical_devices() }
            .context("failed to enumerate physical devices")?;
        let Some(&physical_device) = physical_devices.first() else {
            bail!("could not find any physical device supporting Vulkan");
        };

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name = properties
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "<unnamed>".to_string());
        log::info!(
            "initializing with physical device \"{device_name}\" ({} available)",
            physical_devices.len()
        );

        let family_props =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
        let families = find_queue_families(&family_props, |index| {
            unsafe {
                ctx.surface_loader
                    .get_physical_device_surface_support(physical_device, index, surface)
            }
            .context("failed to query surface support")
        })?;
        log::info!(
            "queue families: graphics={} present={}",
            families.graphics,
            families.present
        );

        let available = unsafe { instance.enumerate_device_extension_properties(physical_device) }
            .context("failed to enumerate device extensions")?;
        let available_names: Vec<_> = available
            .iter()
            .filter_map(|e| e.extension_name_as_c_str().ok())
            .collect();

        let required = resolve_names(&config.required_device_extensions, available_names.iter().copied());
        if !required.missing.is_empty() {
            bail!("missing required device extensions: {:?}", required.missing);
        }
        let optional = resolve_names(&config.optional_device_extensions, available_names.iter().copied());

        for name in &required.found {
            log::info!("found device extension {name:?}");
        }
        for name in &optional.found {
            log::info!("found optional device extension {name:?}");
        }

        let extension_ptrs: Vec<_> = required
            .found
            .iter()
            .chain(&optional.found)
            .map(|n| n.as_ptr())
            .collect();

        let priorities = [1.0_f32];
        let queue_infos: Vec<_> = families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
            })
            .collect();

        let features = vk::PhysicalDeviceFeatures::default();
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_ptrs)
            .enabled_features(&features);

        let device = unsafe { instance.create_device(physical_device, &create_info, None) }
            .context("failed to create a Vulkan logical device")?;
        {
            let device = device.clone();
            teardown.push("device", move || unsafe { device.destroy_device(None) });
        }

        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        log::info!("created logical device");

        Ok(Self {
            physical_device,
            device_name,
            memory_properties,
            device,
            families,
            graphics_queue,
            present_queue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn same_family_for_both_roles() {
        let fams = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];
        let q = find_queue_families(&fams, |_| Ok(true)).unwrap();
        assert_eq!(q, QueueFamilies { graphics: 0, present: 0 });
        assert!(q.is_shared());
        assert_eq!(q.unique(), vec![0]);
    }

    #[test]
    fn first_graphics_and_first_present_are_picked() {
        let fams = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];
        let q = find_queue_families(&fams, |i| Ok(i == 3 || i == 0)).unwrap();
        assert_eq!(q, QueueFamilies { graphics: 1, present: 0 });
        assert_eq!(q.unique(), vec![1, 0]);
    }

    #[test]
    fn missing_graphics_is_an_error() {
        let fams = [family(vk::QueueFlags::COMPUTE)];
        let err = find_queue_families(&fams, |_| Ok(true)).unwrap_err();
        assert!(err.to_string().contains("graphics"));
    }

    #[test]
    fn missing_present_is_an_error() {
        let fams = [family(vk::QueueFlags::GRAPHICS)];
        let err = find_queue_families(&fams, |_| Ok(false)).unwrap_err();
        assert!(err.to_string().contains("present"));
    }

    #[test]
    fn present_query_failure_propagates() {
        let fams = [family(vk::QueueFlags::GRAPHICS)];
        let err = find_queue_families(&fams, |_| anyhow::bail!("device lost")).unwrap_err();
        assert_eq!(err.to_string(), "device lost");
    }

    #[test]
    fn empty_family_list_fails() {
        assert!(find_queue_families(&[], |_| Ok(true)).is_err());
    }
}
