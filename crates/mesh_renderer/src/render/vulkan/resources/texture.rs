//! Sampleable textures

use ash::{vk, Device};

use super::image::{color_subresource_range, ensure_sampleable, GpuImage};
use crate::render::vulkan::{DeviceContext, VulkanError, VulkanResult};

/// Image in `SHADER_READ_ONLY_OPTIMAL` with a view and a linear repeat sampler
pub struct Texture {
    device: Device,
    image_view: vk::ImageView,
    sampler: vk::Sampler,
    image: GpuImage,
}

impl Texture {
    /// Wrap an uploaded image; fails if it was never transitioned for sampling
    pub fn new(ctx: &DeviceContext, image: GpuImage) -> VulkanResult<Self> {
        ensure_sampleable(image.layout())?;

        let device = ctx.device.clone();
        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image.handle())
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(image.format())
            .subresource_range(color_subresource_range());

        let image_view = unsafe {
            device.create_image_view(&view_info, None)
                .map_err(VulkanError::Api)?
        };

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .max_lod(vk::LOD_CLAMP_NONE);

        let sampler = match unsafe { device.create_sampler(&sampler_info, None) } {
            Ok(sampler) => sampler,
            Err(e) => {
                unsafe { device.destroy_image_view(image_view, None) };
                return Err(VulkanError::Api(e));
            }
        };

        Ok(Self {
            device,
            image_view,
            sampler,
            image,
        })
    }

    /// Get the image view for descriptor binding
    pub fn image_view(&self) -> vk::ImageView {
        self.image_view
    }

    /// Get the sampler for descriptor binding
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// Texture dimensions
    pub fn extent(&self) -> vk::Extent2D {
        self.image.extent()
    }

    /// Descriptor info for a combined image sampler binding
    pub fn descriptor_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: self.sampler,
            image_view: self.image_view,
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_image_view(self.image_view, None);
        }
    }
}
