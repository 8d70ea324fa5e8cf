/// Vulkan debug messenger - handles validation layer messages with colored output
///
/// Compiled in only with the `vulkan-validation` cargo feature; the messenger
/// itself is created only when the device config also enables validation.

use ash::vk;
use colored::*;
use nebula_gfx::{Error, Result};
use std::ffi::CStr;

/// Create the debug utils messenger for validation output
pub(crate) fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
    let loader = ash::ext::debug_utils::Instance::new(entry, instance);

    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_callback));

    let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None) }
        .map_err(|e| {
            Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
        })?;

    Ok((loader, messenger))
}

unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() {
        return vk::FALSE;
    }

    let message = if (*callback_data).p_message.is_null() {
        String::from("<no message>")
    } else {
        CStr::from_ptr((*callback_data).p_message)
            .to_string_lossy()
            .into_owned()
    };

    let type_str = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "performance",
        _ => "general",
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        eprintln!("{} [{}] {}", "[vulkan]".red().bold(), type_str, message);
    } else {
        eprintln!("{} [{}] {}", "[vulkan]".yellow(), type_str, message);
    }

    vk::FALSE
}
