//! Command pool management
//!
//! Transient pools for one-shot transfer work and for the per-frame command
//! buffer, which is reset together with its pool.

use ash::{vk, Device};

use crate::render::vulkan::{DeviceContext, VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a transient command pool on the context's queue family
    pub fn new(ctx: &DeviceContext) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::TRANSIENT)
            .queue_family_index(ctx.queue_family_index);

        let command_pool = unsafe {
            ctx.device.create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device: ctx.device.clone(),
            command_pool,
        })
    }

    /// Allocate one primary command buffer
    pub fn allocate_primary(&self) -> VulkanResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffers = unsafe {
            self.device.allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        command_buffers.first().copied().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "Driver returned no command buffer".to_string(),
        })
    }

    /// Return every buffer allocated from the pool to the initial state
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_command_pool(self.command_pool, vk::CommandPoolResetFlags::empty())
                .map_err(VulkanError::Api)
        }
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }

    /// Allocate a command buffer and begin it for a single submission
    pub fn begin_one_shot(&self) -> VulkanResult<OneShotCommands<'_>> {
        let command_buffer = self.allocate_primary()?;
        let commands = OneShotCommands {
            pool: self,
            command_buffer,
        };

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            self.device.begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        Ok(commands)
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Command buffer recorded for one blocking submission; freed on drop
pub struct OneShotCommands<'a> {
    pool: &'a CommandPool,
    command_buffer: vk::CommandBuffer,
}

impl OneShotCommands<'_> {
    /// Command buffer being recorded
    pub fn handle(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// End recording, submit to the context's queue and wait for the queue to drain
    pub fn submit_and_wait(self, ctx: &DeviceContext) -> VulkanResult<()> {
        let command_buffers = [self.command_buffer];
        let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);

        unsafe {
            ctx.device.end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;
            ctx.device.queue_submit(ctx.queue, &[submit_info.build()], vk::Fence::null())
                .map_err(VulkanError::Api)?;
        }
        ctx.queue_wait_idle()
    }
}

impl Drop for OneShotCommands<'_> {
    fn drop(&mut self) {
        unsafe {
            self.pool.device.free_command_buffers(self.pool.command_pool, &[self.command_buffer]);
        }
    }
}
