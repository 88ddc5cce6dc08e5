//! Vulkan instance management
//!
//! Owns the loader entry, the instance and the optional validation messenger.
//! Validation errors reported by the layer are recorded in a [`ValidationSink`]
//! that the frame loop checks after every frame.

use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};
use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use thiserror::Error;

use crate::config::RendererConfig;
use crate::render::vulkan::Window;

/// Vulkan-specific error types
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No physical device has a queue family that does both graphics and present
    #[error("No suitable GPU found: need a graphics queue that can present to the surface")]
    NoSuitableDevice,

    /// No memory type satisfies the allocation
    #[error("Out of device memory: no memory type in mask {type_bits:#b} has {required:?}")]
    OutOfDeviceMemory {
        /// Memory type bits from the resource requirements
        type_bits: u32,
        /// Property flags that were requested
        required: vk::MemoryPropertyFlags,
    },

    /// The surface can no longer present on the selected queue family
    #[error("Surface does not support presentation on queue family {queue_family}")]
    SurfaceUnsupported {
        /// Queue family that was queried
        queue_family: u32,
    },

    /// The validation layer reported an error
    #[error("Validation error: {0}")]
    ValidationFailed(String),

    /// The swapchain no longer matches the surface
    #[error("Swapchain out of date")]
    SwapchainOutOfDate,

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Collects validation-layer errors raised from the debug messenger callback
#[derive(Debug, Default)]
pub struct ValidationSink {
    error_count: AtomicU32,
    first_error: Mutex<Option<String>>,
}

impl ValidationSink {
    /// Record an error message; only the first one since the last take is kept
    pub fn record(&self, message: &str) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut slot) = self.first_error.lock() {
            if slot.is_none() {
                *slot = Some(message.to_owned());
            }
        }
    }

    /// Total errors recorded over the sink's lifetime
    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Take the pending error, if any
    pub fn take_error(&self) -> Option<String> {
        self.first_error.lock().ok().and_then(|mut slot| slot.take())
    }

    /// Fail with [`VulkanError::ValidationFailed`] if an error is pending
    pub fn check(&self) -> VulkanResult<()> {
        match self.take_error() {
            Some(message) => Err(VulkanError::ValidationFailed(message)),
            None => Ok(()),
        }
    }
}

/// Vulkan instance wrapper with RAII cleanup
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
    // Boxed so the pointer handed to the messenger stays put
    validation: Box<ValidationSink>,
}

impl VulkanInstance {
    /// Create a Vulkan 1.2 instance with the extensions the window needs
    pub fn new(window: &Window, config: &RendererConfig) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {:?}", e)))?;

        let app_name_cstr = to_cstring(&config.application_name)?;
        let engine_name_cstr = to_cstring("mesh_renderer")?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_2);

        let required_extensions = window
            .required_instance_extensions()
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to get required extensions: {}", e)))?;

        let cstr_extensions = required_extensions
            .iter()
            .map(|ext| to_cstring(ext))
            .collect::<VulkanResult<Vec<_>>>()?;

        let mut extensions: Vec<*const c_char> = cstr_extensions.iter().map(|ext| ext.as_ptr()).collect();

        let enable_validation = config.enable_validation && Self::validation_layer_available(&entry)?;
        if config.enable_validation && !enable_validation {
            log::warn!("{} not installed, continuing without validation", VALIDATION_LAYER);
        }

        let layer_names = if enable_validation {
            extensions.push(DebugUtils::name().as_ptr());
            vec![to_cstring(VALIDATION_LAYER)?]
        } else {
            Vec::new()
        };
        let layer_names_ptrs: Vec<*const c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_names_ptrs);

        let instance = unsafe {
            entry.create_instance(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let validation = Box::new(ValidationSink::default());

        let debug_utils = if enable_validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils, &validation) {
                Ok(messenger) => Some((debug_utils, messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            None
        };

        log::info!(
            "Created Vulkan 1.2 instance ({} extensions, validation {})",
            extensions.len(),
            if enable_validation { "on" } else { "off" }
        );

        Ok(Self {
            entry,
            instance,
            debug_utils,
            validation,
        })
    }

    fn validation_layer_available(entry: &Entry) -> VulkanResult<bool> {
        let layers = entry.enumerate_instance_layer_properties().map_err(VulkanError::Api)?;
        Ok(layers.iter().any(|layer| {
            let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
            name.to_bytes() == VALIDATION_LAYER.as_bytes()
        }))
    }

    fn setup_debug_messenger(
        debug_utils: &DebugUtils,
        sink: &ValidationSink,
    ) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback))
            .user_data(sink as *const ValidationSink as *mut c_void);

        unsafe {
            debug_utils.create_debug_utils_messenger(&create_info, None)
                .map_err(VulkanError::Api)
        }
    }

    /// Whether the debug messenger is installed
    pub fn validation_enabled(&self) -> bool {
        self.debug_utils.is_some()
    }

    /// Validation errors collected from the layer
    pub fn validation(&self) -> &ValidationSink {
        &self.validation
    }

    /// Fail with [`VulkanError::ValidationFailed`] if the layer reported an error
    pub fn check_validation(&self) -> VulkanResult<()> {
        self.validation.check()
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = &self.debug_utils {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        log::debug!("Destroyed Vulkan instance");
    }
}

fn to_cstring(value: &str) -> VulkanResult<CString> {
    CString::new(value)
        .map_err(|e| VulkanError::InitializationFailed(format!("Invalid name {:?}: {}", value, e)))
}

/// Debug callback for validation layers
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    user_data: *mut c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
        if let Some(sink) = (user_data as *const ValidationSink).as_ref() {
            sink.record(&message);
        }
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoke(sink: &ValidationSink, severity: vk::DebugUtilsMessageSeverityFlagsEXT, text: &str) {
        let message = CString::new(text).unwrap();
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: message.as_ptr(),
            ..Default::default()
        };
        let result = unsafe {
            debug_callback(
                severity,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                sink as *const ValidationSink as *mut c_void,
            )
        };
        assert_eq!(result, vk::FALSE);
    }

    #[test]
    fn test_sink_keeps_first_error() {
        let sink = ValidationSink::default();
        sink.record("first");
        sink.record("second");

        assert_eq!(sink.error_count(), 2);
        assert_eq!(sink.take_error().as_deref(), Some("first"));
        assert_eq!(sink.take_error(), None);
    }

    #[test]
    fn test_callback_escalates_errors_only() {
        let sink = ValidationSink::default();

        invoke(&sink, vk::DebugUtilsMessageSeverityFlagsEXT::WARNING, "just a warning");
        assert_eq!(sink.error_count(), 0);

        invoke(&sink, vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, "bad barrier");
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.take_error().as_deref(), Some("bad barrier"));
    }

    #[test]
    fn test_check_reports_pending_error_once() {
        let sink = ValidationSink::default();
        assert!(sink.check().is_ok());

        invoke(&sink, vk::DebugUtilsMessageSeverityFlagsEXT::ERROR, "descriptor not updated");
        match sink.check() {
            Err(VulkanError::ValidationFailed(message)) => assert_eq!(message, "descriptor not updated"),
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert!(sink.check().is_ok());
    }

    #[test]
    fn test_callback_tolerates_null_data() {
        let sink = ValidationSink::default();
        let result = unsafe {
            debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
        assert_eq!(sink.error_count(), 0);
    }
}
