//! GPU images and their layout transitions
//!
//! Images start in `UNDEFINED` and track their layout on the host so that an
//! image that never reached `SHADER_READ_ONLY_OPTIMAL` cannot be sampled.

use ash::{vk, Device};

use crate::render::vulkan::{DeviceContext, VulkanError, VulkanResult};

/// The layout transitions texture upload needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTransition {
    /// Freshly created image to copy destination
    UndefinedToTransferDst,
    /// Copy destination to fragment-shader sampling
    TransferDstToShaderRead,
}

impl LayoutTransition {
    #[cfg(test)]
    fn from_layouts(old: vk::ImageLayout, new: vk::ImageLayout) -> Option<Self> {
        [Self::UndefinedToTransferDst, Self::TransferDstToShaderRead]
            .into_iter()
            .find(|t| t.old_layout() == old && t.new_layout() == new)
    }

    /// Layout the image must be in before the barrier
    pub fn old_layout(self) -> vk::ImageLayout {
        match self {
            Self::UndefinedToTransferDst => vk::ImageLayout::UNDEFINED,
            Self::TransferDstToShaderRead => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        }
    }

    /// Layout after the barrier
    pub fn new_layout(self) -> vk::ImageLayout {
        match self {
            Self::UndefinedToTransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            Self::TransferDstToShaderRead => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }

    /// Source and destination pipeline stages
    pub fn stages(self) -> (vk::PipelineStageFlags, vk::PipelineStageFlags) {
        match self {
            Self::UndefinedToTransferDst => (vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TRANSFER),
            Self::TransferDstToShaderRead => (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER),
        }
    }

    /// Source and destination access masks
    pub fn access(self) -> (vk::AccessFlags, vk::AccessFlags) {
        match self {
            Self::UndefinedToTransferDst => (vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE),
            Self::TransferDstToShaderRead => (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ),
        }
    }

    /// Image barrier for the color aspect, mip 0, layer 0
    pub fn barrier(self, image: vk::Image) -> vk::ImageMemoryBarrier {
        let (src_access, dst_access) = self.access();
        vk::ImageMemoryBarrier::builder()
            .old_layout(self.old_layout())
            .new_layout(self.new_layout())
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(color_subresource_range())
            .src_access_mask(src_access)
            .dst_access_mask(dst_access)
            .build()
    }

    /// Check that an image in `current` layout may take this transition
    pub fn check(self, current: vk::ImageLayout) -> VulkanResult<()> {
        if current == self.old_layout() {
            Ok(())
        } else {
            Err(VulkanError::InvalidOperation {
                reason: format!("{:?} requires layout {:?}, image is in {:?}", self, self.old_layout(), current),
            })
        }
    }
}

/// Fail unless `layout` allows sampling from a shader
pub fn ensure_sampleable(layout: vk::ImageLayout) -> VulkanResult<()> {
    if layout == vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL {
        Ok(())
    } else {
        Err(VulkanError::InvalidOperation {
            reason: format!("Image in layout {:?} cannot be sampled", layout),
        })
    }
}

/// Single color mip, single layer
pub fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// Bytes per texel for the color formats buffers can be copied into
pub fn texel_size(format: vk::Format) -> Option<vk::DeviceSize> {
    match format {
        vk::Format::R8_UNORM => Some(1),
        vk::Format::R8G8B8A8_UNORM
        | vk::Format::R8G8B8A8_SRGB
        | vk::Format::B8G8R8A8_UNORM
        | vk::Format::B8G8R8A8_SRGB => Some(4),
        _ => None,
    }
}

/// Device-local 2D image and its memory, released on drop
pub struct GpuImage {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    extent: vk::Extent2D,
    format: vk::Format,
    layout: vk::ImageLayout,
}

impl GpuImage {
    /// Create an optimally tiled image in `UNDEFINED` layout
    pub fn new(
        ctx: &DeviceContext,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> VulkanResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Cannot create a {}x{} image", extent.width, extent.height),
            });
        }

        let device = ctx.device.clone();
        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe {
            device.create_image(&image_create_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory = match Self::allocate_and_bind(ctx, image, requirements) {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_image(image, None) };
                return Err(e);
            }
        };

        log::debug!("Created {}x{} {:?} image", extent.width, extent.height, format);

        Ok(Self {
            device,
            image,
            memory,
            extent,
            format,
            layout: vk::ImageLayout::UNDEFINED,
        })
    }

    fn allocate_and_bind(
        ctx: &DeviceContext,
        image: vk::Image,
        requirements: vk::MemoryRequirements,
    ) -> VulkanResult<vk::DeviceMemory> {
        let memory_type_index =
            ctx.memory_type_index(requirements.memory_type_bits, vk::MemoryPropertyFlags::DEVICE_LOCAL)?;
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            ctx.device.allocate_memory(&alloc_info, None)
                .map_err(VulkanError::Api)?
        };

        if let Err(e) = unsafe { ctx.device.bind_image_memory(image, memory, 0) } {
            unsafe { ctx.device.free_memory(memory, None) };
            return Err(VulkanError::Api(e));
        }

        Ok(memory)
    }

    /// Get image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Image dimensions
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Pixel format
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Layout after the last recorded transition
    pub fn layout(&self) -> vk::ImageLayout {
        self.layout
    }

    pub(crate) fn set_layout(&mut self, layout: vk::ImageLayout) {
        self.layout = layout;
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_parameters() {
        let to_dst = LayoutTransition::UndefinedToTransferDst;
        assert_eq!(to_dst.stages(), (vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TRANSFER));
        assert_eq!(to_dst.access(), (vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE));

        let to_read = LayoutTransition::TransferDstToShaderRead;
        assert_eq!(to_read.stages(), (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER));
        assert_eq!(to_read.access(), (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ));

        let barrier = to_read.barrier(vk::Image::null());
        assert_eq!(barrier.old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(barrier.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(barrier.subresource_range.level_count, 1);
    }

    #[test]
    fn test_texel_sizes() {
        assert_eq!(texel_size(vk::Format::R8G8B8A8_UNORM), Some(4));
        assert_eq!(texel_size(vk::Format::B8G8R8A8_SRGB), Some(4));
        assert_eq!(texel_size(vk::Format::R8_UNORM), Some(1));
        assert_eq!(texel_size(vk::Format::BC1_RGB_UNORM_BLOCK), None);
    }

    #[test]
    fn test_only_two_transitions_exist() {
        assert_eq!(
            LayoutTransition::from_layouts(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
            Some(LayoutTransition::UndefinedToTransferDst)
        );
        assert_eq!(
            LayoutTransition::from_layouts(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            Some(LayoutTransition::TransferDstToShaderRead)
        );
        assert_eq!(
            LayoutTransition::from_layouts(vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            None
        );
        assert_eq!(
            LayoutTransition::from_layouts(vk::ImageLayout::UNDEFINED, vk::ImageLayout::GENERAL),
            None
        );
    }

    #[test]
    fn test_transition_checks_current_layout() {
        assert!(LayoutTransition::UndefinedToTransferDst.check(vk::ImageLayout::UNDEFINED).is_ok());
        assert!(matches!(
            LayoutTransition::TransferDstToShaderRead.check(vk::ImageLayout::UNDEFINED),
            Err(VulkanError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_untransitioned_image_is_not_sampleable() {
        assert!(ensure_sampleable(vk::ImageLayout::UNDEFINED).is_err());
        assert!(ensure_sampleable(vk::ImageLayout::TRANSFER_DST_OPTIMAL).is_err());
        assert!(ensure_sampleable(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL).is_ok());
    }
}
