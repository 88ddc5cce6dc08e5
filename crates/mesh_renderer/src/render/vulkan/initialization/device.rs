//! Physical and logical device selection
//!
//! One queue family must do both graphics and presentation; the selected
//! device is created with `VK_KHR_swapchain` and `VK_KHR_push_descriptor`.

use ash::extensions::khr::{PushDescriptor, Swapchain as SwapchainLoader};
use ash::{vk, Device, Instance};
use std::ffi::CStr;

use crate::render::vulkan::resources::memory::select_memory_type;
use crate::render::vulkan::{SurfaceContext, VulkanError, VulkanInstance, VulkanResult};

/// What device selection needs to know about one physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCandidate {
    /// Reported device type
    pub device_type: vk::PhysicalDeviceType,
    /// First queue family with graphics and present support, if the device
    /// also exposes the required extensions
    pub queue_family: Option<u32>,
}

/// Pick the first suitable discrete GPU, else the first suitable device
pub fn select_device_index(candidates: &[DeviceCandidate]) -> Option<usize> {
    let suitable = |candidate: &DeviceCandidate| candidate.queue_family.is_some();

    candidates
        .iter()
        .position(|c| suitable(c) && c.device_type == vk::PhysicalDeviceType::DISCRETE_GPU)
        .or_else(|| candidates.iter().position(suitable))
}

fn required_device_extensions() -> [&'static CStr; 2] {
    [SwapchainLoader::name(), PushDescriptor::name()]
}

/// Selected GPU, its logical device and the single graphics+present queue
pub struct DeviceContext {
    /// Vulkan physical device handle
    pub physical_device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Index of the graphics+present queue family
    pub queue_family_index: u32,
    /// Graphics+present queue
    pub queue: vk::Queue,
    /// Vulkan logical device handle
    pub device: Device,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
    /// Push descriptor extension loader
    pub push_descriptor: PushDescriptor,
}

impl DeviceContext {
    /// Select a physical device for the surface and create the logical device
    pub fn new(instance: &VulkanInstance, surface: &SurfaceContext) -> VulkanResult<Self> {
        let vk_instance = &instance.instance;
        let devices = unsafe {
            vk_instance.enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };

        let candidates = devices
            .iter()
            .map(|&device| Self::evaluate_device(vk_instance, device, surface))
            .collect::<VulkanResult<Vec<_>>>()?;

        let selected = select_device_index(&candidates).ok_or(VulkanError::NoSuitableDevice)?;
        let physical_device = devices[selected];
        let queue_family_index = candidates[selected]
            .queue_family
            .ok_or(VulkanError::NoSuitableDevice)?;

        let properties = unsafe { vk_instance.get_physical_device_properties(physical_device) };
        let memory_properties = unsafe { vk_instance.get_physical_device_memory_properties(physical_device) };

        log::info!(
            "Selected GPU: {} ({:?}), queue family {}",
            unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy(),
            properties.device_type,
            queue_family_index
        );

        let queue_priorities = [1.0];
        let queue_infos = [vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities)
            .build()];

        let extension_names = required_device_extensions().map(CStr::as_ptr);
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_names);

        let device = unsafe {
            vk_instance.create_device(physical_device, &create_info, None)
                .map_err(VulkanError::Api)?
        };
        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        let swapchain_loader = SwapchainLoader::new(vk_instance, &device);
        let push_descriptor = PushDescriptor::new(vk_instance, &device);

        Ok(Self {
            physical_device,
            properties,
            memory_properties,
            queue_family_index,
            queue,
            device,
            swapchain_loader,
            push_descriptor,
        })
    }

    fn evaluate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: &SurfaceContext,
    ) -> VulkanResult<DeviceCandidate> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let candidate = |queue_family| DeviceCandidate {
            device_type: properties.device_type,
            queue_family,
        };

        let extensions = unsafe {
            instance.enumerate_device_extension_properties(device)
                .map_err(VulkanError::Api)?
        };
        let has_required_extensions = required_device_extensions().iter().all(|required| {
            extensions.iter().any(|available| {
                let extension_name = unsafe { CStr::from_ptr(available.extension_name.as_ptr()) };
                extension_name == *required
            })
        });
        if !has_required_extensions {
            log::debug!("Skipping device without swapchain/push descriptor support");
            return Ok(candidate(None));
        }

        let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };
        for (index, family) in (0u32..).zip(queue_families.iter()) {
            if family.queue_flags.contains(vk::QueueFlags::GRAPHICS) && surface.supports_present(device, index)? {
                return Ok(candidate(Some(index)));
            }
        }

        Ok(candidate(None))
    }

    /// Memory type index for a resource, see [`select_memory_type`]
    pub fn memory_type_index(&self, type_bits: u32, required: vk::MemoryPropertyFlags) -> VulkanResult<u32> {
        select_memory_type(&self.memory_properties, type_bits, required)
            .ok_or(VulkanError::OutOfDeviceMemory { type_bits, required })
    }

    /// Block until all queued work has finished
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.device_wait_idle().map_err(VulkanError::Api) }
    }

    /// Block until the graphics queue has drained
    pub fn queue_wait_idle(&self) -> VulkanResult<()> {
        unsafe { self.device.queue_wait_idle(self.queue).map_err(VulkanError::Api) }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
        log::debug!("Destroyed logical device");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(device_type: vk::PhysicalDeviceType, queue_family: Option<u32>) -> DeviceCandidate {
        DeviceCandidate { device_type, queue_family }
    }

    #[test]
    fn test_prefers_discrete_gpu() {
        let candidates = [
            candidate(vk::PhysicalDeviceType::INTEGRATED_GPU, Some(0)),
            candidate(vk::PhysicalDeviceType::DISCRETE_GPU, Some(1)),
            candidate(vk::PhysicalDeviceType::DISCRETE_GPU, Some(0)),
        ];
        assert_eq!(select_device_index(&candidates), Some(1));
    }

    #[test]
    fn test_skips_unsuitable_discrete_gpu() {
        let candidates = [
            candidate(vk::PhysicalDeviceType::DISCRETE_GPU, None),
            candidate(vk::PhysicalDeviceType::CPU, Some(2)),
            candidate(vk::PhysicalDeviceType::INTEGRATED_GPU, Some(0)),
        ];
        assert_eq!(select_device_index(&candidates), Some(1));
    }

    #[test]
    fn test_no_suitable_device() {
        let candidates = [candidate(vk::PhysicalDeviceType::DISCRETE_GPU, None)];
        assert_eq!(select_device_index(&candidates), None);
        assert_eq!(select_device_index(&[]), None);
    }
}
