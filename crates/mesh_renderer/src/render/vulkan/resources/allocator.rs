//! GPU resource creation and blocking transfers
//!
//! Every transfer records into its own command buffer, submits it and waits
//! for the queue to drain before returning.

use ash::vk;

use super::buffer::GpuBuffer;
use super::image::{texel_size, GpuImage, LayoutTransition};
use super::texture::Texture;
use crate::render::vulkan::rendering::commands::CommandPool;
use crate::render::vulkan::{DeviceContext, VulkanError, VulkanResult};
use crate::render::TextureData;

const HOST_COHERENT: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// Creates buffers and images and performs one-shot transfers between them
pub struct ResourceAllocator {
    command_pool: CommandPool,
}

impl ResourceAllocator {
    /// Create an allocator with its own transient command pool
    pub fn new(ctx: &DeviceContext) -> VulkanResult<Self> {
        Ok(Self {
            command_pool: CommandPool::new(ctx)?,
        })
    }

    /// Host-visible, coherent buffer that stays mapped for its lifetime
    pub fn create_mapped_buffer(
        &self,
        ctx: &DeviceContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<GpuBuffer> {
        GpuBuffer::new(ctx, size, usage, HOST_COHERENT)
    }

    /// Mapped buffer pre-filled with `data`, usable as a transfer source
    pub fn create_staging_buffer(&self, ctx: &DeviceContext, data: &[u8]) -> VulkanResult<GpuBuffer> {
        let mut staging = self.create_mapped_buffer(ctx, data.len() as vk::DeviceSize, vk::BufferUsageFlags::TRANSFER_SRC)?;
        staging.write_bytes(0, data)?;
        Ok(staging)
    }

    /// Device-local buffer, never mapped
    pub fn create_device_local_buffer(
        &self,
        ctx: &DeviceContext,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> VulkanResult<GpuBuffer> {
        GpuBuffer::new(ctx, size, usage, vk::MemoryPropertyFlags::DEVICE_LOCAL)
    }

    /// Copy `size` bytes from `staging` into a new device-local buffer
    ///
    /// Blocks until the queue is idle, so `staging` may be dropped afterwards.
    pub fn upload_via_staging(
        &self,
        ctx: &DeviceContext,
        staging: &GpuBuffer,
        size: vk::DeviceSize,
        dest_usage: vk::BufferUsageFlags,
    ) -> VulkanResult<GpuBuffer> {
        let resident = self.create_device_local_buffer(ctx, size, dest_usage | vk::BufferUsageFlags::TRANSFER_DST)?;
        self.copy_buffer(ctx, staging, &resident, size)?;
        log::debug!("Uploaded {} bytes to device-local buffer", size);
        Ok(resident)
    }

    /// Stage `data` and upload it into a new device-local buffer
    pub fn upload_bytes(
        &self,
        ctx: &DeviceContext,
        data: &[u8],
        dest_usage: vk::BufferUsageFlags,
    ) -> VulkanResult<GpuBuffer> {
        let staging = self.create_staging_buffer(ctx, data)?;
        self.upload_via_staging(ctx, &staging, staging.size(), dest_usage)
    }

    /// Blocking buffer-to-buffer copy of the first `size` bytes
    pub fn copy_buffer(
        &self,
        ctx: &DeviceContext,
        src: &GpuBuffer,
        dst: &GpuBuffer,
        size: vk::DeviceSize,
    ) -> VulkanResult<()> {
        if size > src.size() || size > dst.size() {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Copy of {} bytes exceeds source {} or destination {}", size, src.size(), dst.size()),
            });
        }

        let commands = self.command_pool.begin_one_shot()?;
        let region = vk::BufferCopy { src_offset: 0, dst_offset: 0, size };
        unsafe {
            ctx.device.cmd_copy_buffer(commands.handle(), src.handle(), dst.handle(), &[region]);
        }
        commands.submit_and_wait(ctx)
    }

    /// Device-local 2D image in `UNDEFINED` layout
    pub fn create_image(
        &self,
        ctx: &DeviceContext,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> VulkanResult<GpuImage> {
        GpuImage::new(ctx, extent, format, usage)
    }

    /// Record one of the supported layout transitions and wait for it
    ///
    /// Fails without touching the GPU if the image is not in the transition's
    /// source layout.
    pub fn transition_image_layout(
        &self,
        ctx: &DeviceContext,
        image: &mut GpuImage,
        transition: LayoutTransition,
    ) -> VulkanResult<()> {
        transition.check(image.layout())?;

        let commands = self.command_pool.begin_one_shot()?;
        let (src_stage, dst_stage) = transition.stages();
        unsafe {
            ctx.device.cmd_pipeline_barrier(
                commands.handle(),
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[transition.barrier(image.handle())],
            );
        }
        commands.submit_and_wait(ctx)?;

        image.set_layout(transition.new_layout());
        Ok(())
    }

    /// Fill mip 0, layer 0 of `image` from the start of `buffer`
    ///
    /// The buffer must hold at least one tightly packed image's worth of texels.
    pub fn copy_buffer_to_image(
        &self,
        ctx: &DeviceContext,
        buffer: &GpuBuffer,
        image: &GpuImage,
    ) -> VulkanResult<()> {
        if image.layout() != vk::ImageLayout::TRANSFER_DST_OPTIMAL {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Copy destination must be TRANSFER_DST_OPTIMAL, image is in {:?}", image.layout()),
            });
        }

        let extent = image.extent();
        let texel = texel_size(image.format()).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("Buffer copies into {:?} images are not supported", image.format()),
        })?;
        let required = u64::from(extent.width) * u64::from(extent.height) * texel;
        if buffer.size() < required {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "Buffer of {} bytes cannot fill a {}x{} image ({} bytes)",
                    buffer.size(),
                    extent.width,
                    extent.height,
                    required
                ),
            });
        }

        let commands = self.command_pool.begin_one_shot()?;
        let region = vk::BufferImageCopy::builder()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            });

        unsafe {
            ctx.device.cmd_copy_buffer_to_image(
                commands.handle(),
                buffer.handle(),
                image.handle(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region.build()],
            );
        }
        commands.submit_and_wait(ctx)
    }

    /// Upload RGBA8 pixels into a sampleable texture
    pub fn upload_texture(&self, ctx: &DeviceContext, data: &TextureData) -> VulkanResult<Texture> {
        let staging = self.create_staging_buffer(ctx, data.pixels())?;
        let mut image = self.create_image(
            ctx,
            vk::Extent2D { width: data.width(), height: data.height() },
            vk::Format::R8G8B8A8_UNORM,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        )?;

        self.transition_image_layout(ctx, &mut image, LayoutTransition::UndefinedToTransferDst)?;
        self.copy_buffer_to_image(ctx, &staging, &image)?;
        self.transition_image_layout(ctx, &mut image, LayoutTransition::TransferDstToShaderRead)?;

        log::debug!("Uploaded {}x{} texture", data.width(), data.height());
        Texture::new(ctx, image)
    }
}
