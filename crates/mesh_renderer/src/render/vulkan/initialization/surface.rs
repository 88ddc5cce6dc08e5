//! Vulkan surface management
//!
//! Handles window surface creation and the queries swapchain creation needs

use ash::{extensions::khr, vk};

use crate::render::vulkan::{VulkanError, VulkanInstance, VulkanResult, Window};

/// Presentation surface for a window, destroyed on drop
pub struct SurfaceContext {
    surface_loader: khr::Surface,
    surface: vk::SurfaceKHR,
}

impl SurfaceContext {
    /// Create a surface for the window using GLFW
    pub fn new(instance: &VulkanInstance, window: &mut Window) -> VulkanResult<Self> {
        let surface_loader = khr::Surface::new(&instance.entry, &instance.instance);
        let surface = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(format!("Surface creation: {}", e)))?;

        log::debug!("Created window surface");
        Ok(Self { surface_loader, surface })
    }

    /// Get the underlying surface handle
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get the surface loader
    pub fn loader(&self) -> &khr::Surface {
        &self.surface_loader
    }

    /// Whether the queue family can present to this surface
    pub fn supports_present(&self, physical_device: vk::PhysicalDevice, queue_family: u32) -> VulkanResult<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(physical_device, queue_family, self.surface)
                .map_err(VulkanError::Api)
        }
    }

    /// Get surface capabilities for a physical device
    pub fn capabilities(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)
                .map_err(VulkanError::Api)
        }
    }

    /// Get surface formats for a physical device
    pub fn formats(&self, physical_device: vk::PhysicalDevice) -> VulkanResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(physical_device, self.surface)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for SurfaceContext {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
        log::debug!("Destroyed window surface");
    }
}
