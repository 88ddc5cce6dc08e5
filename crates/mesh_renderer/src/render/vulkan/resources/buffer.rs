//! GPU buffers
//!
//! A buffer owns its memory. Host-visible buffers stay mapped for their whole
//! lifetime; device-local ones are never mapped.

use ash::{vk, Device};
use std::ptr::NonNull;

use crate::render::vulkan::{DeviceContext, VulkanError, VulkanResult};

/// Buffer and its dedicated memory, released on drop
pub struct GpuBuffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    mapped: Option<NonNull<u8>>,
    size: vk::DeviceSize,
}

impl GpuBuffer {
    /// Create a buffer, allocate memory with `properties` and bind it
    ///
    /// Memory that is `HOST_VISIBLE` is mapped immediately.
    pub fn new(
        ctx: &DeviceContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        if size == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: "Cannot create a zero-sized buffer".to_string(),
            });
        }

        let device = ctx.device.clone();
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device.create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory = match allocate_and_bind(ctx, buffer, requirements, properties) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(e);
            }
        };

        // Dropping `result` on error releases buffer and memory
        let mut result = Self {
            device,
            buffer,
            memory,
            mapped: None,
            size,
        };

        if properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            let ptr = unsafe {
                result.device.map_memory(memory, 0, size, vk::MemoryMapFlags::empty())
                    .map_err(VulkanError::Api)?
            };
            result.mapped = NonNull::new(ptr.cast::<u8>());
        }

        log::debug!("Created {} byte buffer ({:?}, {:?})", size, usage, properties);
        Ok(result)
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Whether the buffer has a persistent host mapping
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    fn mapped_range(&self, offset: vk::DeviceSize, len: usize) -> VulkanResult<NonNull<u8>> {
        let ptr = self.mapped.ok_or_else(|| VulkanError::InvalidOperation {
            reason: "Buffer is not host-mapped".to_string(),
        })?;

        let end = offset.checked_add(len as vk::DeviceSize);
        if end.map_or(true, |end| end > self.size) {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Range {}+{} exceeds buffer size {}", offset, len, self.size),
            });
        }

        // In bounds of the mapping, checked above
        Ok(unsafe { NonNull::new_unchecked(ptr.as_ptr().add(offset as usize)) })
    }

    /// Copy bytes into the mapping at `offset`
    pub fn write_bytes(&mut self, offset: vk::DeviceSize, data: &[u8]) -> VulkanResult<()> {
        let dst = self.mapped_range(offset, data.len())?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst.as_ptr(), data.len());
        }
        Ok(())
    }

    /// Copy `len` bytes out of the mapping at `offset`
    pub fn read_bytes(&self, offset: vk::DeviceSize, len: usize) -> VulkanResult<Vec<u8>> {
        let src = self.mapped_range(offset, len)?;
        let mut out = vec![0u8; len];
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), out.as_mut_ptr(), len);
        }
        Ok(out)
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe {
            if self.mapped.is_some() {
                self.device.unmap_memory(self.memory);
            }
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

fn allocate_and_bind(
    ctx: &DeviceContext,
    buffer: vk::Buffer,
    requirements: vk::MemoryRequirements,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<vk::DeviceMemory> {
    let memory_type_index = ctx.memory_type_index(requirements.memory_type_bits, properties)?;
    let alloc_info = vk::MemoryAllocateInfo::builder()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);

    let memory = unsafe {
        ctx.device.allocate_memory(&alloc_info, None)
            .map_err(VulkanError::Api)?
    };

    if let Err(e) = unsafe { ctx.device.bind_buffer_memory(buffer, memory, 0) } {
        unsafe { ctx.device.free_memory(memory, None) };
        return Err(VulkanError::Api(e));
    }

    Ok(memory)
}
