//! Synchronization primitives
//!
//! One frame is in flight at a time, so a single pair of binary semaphores
//! orders acquire → submit → present for the whole process.

use ash::{vk, Device};

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Semaphore wrapper with RAII cleanup
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new binary semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device.create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Acquire and release semaphores for the frame in flight
pub struct FrameSyncPair {
    /// Signalled when the acquired image is ready to be rendered to
    pub acquire: Semaphore,
    /// Signalled when rendering finished and the image may be presented
    pub release: Semaphore,
}

impl FrameSyncPair {
    /// Create both semaphores
    pub fn new(device: &Device) -> VulkanResult<Self> {
        Ok(Self {
            acquire: Semaphore::new(device.clone())?,
            release: Semaphore::new(device.clone())?,
        })
    }
}
