use std::ffi::{c_void, CStr, CString};

use anyhow::{Context, Result};
use ash::ext::debug_utils;
use ash::khr::surface;
use ash::{vk, Entry};
use raw_window_handle::RawDisplayHandle;

use super::{resolve_names, RendererConfig, Teardown};

const ENGINE_NAME: &CStr = c"Wololo Csg Renderer";

/// Loaded Vulkan entry points plus the instance-level objects.
pub struct InstanceContext {
    pub entry: Entry,
    pub instance: ash::Instance,
    pub surface_loader: surface::Instance,

    /// Validation layers actually enabled on the instance.
    pub enabled_layers: Vec<CString>,
}

impl InstanceContext {
    /// Loads the Vulkan library and creates the instance.
    ///
    /// Instance extensions are the ones the window system needs to create a
    /// surface, plus debug utils when validation is active and available.
    pub fn new(
        config: &RendererConfig,
        display: RawDisplayHandle,
        teardown: &mut Teardown,
    ) -> Result<Self> {
        let entry = unsafe { Entry::load() }.context("failed to load the Vulkan library")?;

        let enabled_layers = if config.enable_validation {
            select_validation_layers(&entry, &config.validation_layers)?
        } else {
            Vec::new()
        };

        let mut extensions: Vec<*const std::ffi::c_char> =
            ash_window::enumerate_required_extensions(display)
                .context("failed to query window-system instance extensions")?
                .to_vec();

        let debug_utils_available = !enabled_layers.is_empty() && {
            let available = unsafe { entry.enumerate_instance_extension_properties(None) }
                .context("failed to enumerate instance extensions")?;
            available
                .iter()
                .any(|e| e.extension_name_as_c_str() == Ok(debug_utils::NAME))
        };
        if debug_utils_available {
            extensions.push(debug_utils::NAME.as_ptr());
        }

        let app_name = CString::new(config.app_name.replace('\0', ""))
            .context("application name is not a valid C string")?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 0, 0))
            .engine_name(ENGINE_NAME)
            .engine_version(vk::make_api_version(0, 0, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let layer_ptrs: Vec<_> = enabled_layers.iter().map(|l| l.as_ptr()).collect();
        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extensions);

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .context("failed to create a Vulkan instance")?;
        {
            // The entry keeps the loader library mapped until the instance is gone.
            let entry = entry.clone();
            let instance = instance.clone();
            teardown.push("instance", move || unsafe {
                instance.destroy_instance(None);
                drop(entry);
            });
        }
        log::info!("created Vulkan instance ({} layer(s))", enabled_layers.len());

        if debug_utils_available {
            install_debug_messenger(&entry, &instance, teardown)?;
        } else if !enabled_layers.is_empty() {
            log::warn!("VK_EXT_debug_utils is unavailable; validation output will not be logged");
        }

        let surface_loader = surface::Instance::new(&entry, &instance);

        Ok(Self {
            entry,
            instance,
            surface_loader,
            enabled_layers,
        })
    }
}

fn select_validation_layers(entry: &Entry, wanted: &[CString]) -> Result<Vec<CString>> {
    let available = unsafe { entry.enumerate_instance_layer_properties() }
        .context("failed to enumerate instance layers")?;

    let resolved = resolve_names(
        wanted,
        available.iter().filter_map(|l| l.layer_name_as_c_str().ok()),
    );

    for name in &resolved.found {
        log::info!("found Vulkan validation layer {name:?}");
    }
    for name in &resolved.missing {
        log::warn!("could not find support for validation layer {name:?}");
    }

    Ok(resolved.found)
}

fn install_debug_messenger(
    entry: &Entry,
    instance: &ash::Instance,
    teardown: &mut Teardown,
) -> Result<()> {
    let loader = debug_utils::Instance::new(entry, instance);

    let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = unsafe { loader.create_debug_utils_messenger(&info, None) }
        .context("failed to create debug messenger")?;
    teardown.push("debug messenger", move || unsafe {
        loader.destroy_debug_utils_messenger(messenger, None);
    });

    log::debug!("debug messenger installed");
    Ok(())
}

fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> log::Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::Level::Debug
    } else {
        log::Level::Trace
    }
}

unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    ty: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user: *mut c_void,
) -> vk::Bool32 {
    let message = if data.is_null() || unsafe { (*data).p_message.is_null() } {
        std::borrow::Cow::Borrowed("<no message>")
    } else {
        unsafe { CStr::from_ptr((*data).p_message) }.to_string_lossy()
    };

    log::log!(target: crate::logging::VULKAN_TARGET, severity_level(severity), "[{ty:?}] {message}");
    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_maps_to_log_levels() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as S;
        assert_eq!(severity_level(S::ERROR), log::Level::Error);
        assert_eq!(severity_level(S::WARNING), log::Level::Warn);
        assert_eq!(severity_level(S::INFO), log::Level::Debug);
        assert_eq!(severity_level(S::VERBOSE), log::Level::Trace);
    }
}
