//! Swapchain lifecycle
//!
//! The surface format is chosen once; capabilities and composite alpha are
//! queried again for every chain. A resize builds the new chain from the old
//! handle, idles the device and only then releases the old chain.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device};

use super::framebuffer::Framebuffer;
use crate::render::vulkan::resources::image::color_subresource_range;
use crate::render::vulkan::{DeviceContext, RenderPass, SurfaceContext, VulkanError, VulkanResult};

/// Minimum number of images in a chain
pub const MIN_IMAGE_COUNT: u32 = 2;

/// Pick the chain format from what the surface reports
///
/// A lone `UNDEFINED` entry means any format is allowed and yields
/// `R8G8B8A8_UNORM`. Otherwise the first 8-bit UNORM RGBA/BGRA entry wins,
/// falling back to the first reported format.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    if let [only] = formats {
        if only.format == vk::Format::UNDEFINED {
            return Some(vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: only.color_space,
            });
        }
    }

    formats
        .iter()
        .find(|f| f.format == vk::Format::R8G8B8A8_UNORM || f.format == vk::Format::B8G8R8A8_UNORM)
        .or_else(|| formats.first())
        .copied()
}

/// Opaque if possible, then pre-multiplied, post-multiplied, inherit
pub fn choose_composite_alpha(supported: vk::CompositeAlphaFlagsKHR) -> vk::CompositeAlphaFlagsKHR {
    [
        vk::CompositeAlphaFlagsKHR::OPAQUE,
        vk::CompositeAlphaFlagsKHR::PRE_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED,
        vk::CompositeAlphaFlagsKHR::INHERIT,
    ]
    .into_iter()
    .find(|&mode| supported.contains(mode))
    .unwrap_or(vk::CompositeAlphaFlagsKHR::OPAQUE)
}

/// At least two images, no fewer than the surface minimum and no more than
/// its maximum (0 means unbounded)
///
/// `None` if the surface cannot hold [`MIN_IMAGE_COUNT`] images.
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> Option<u32> {
    let count = MIN_IMAGE_COUNT.max(capabilities.min_image_count);
    match capabilities.max_image_count {
        0 => Some(count),
        max if max < MIN_IMAGE_COUNT => None,
        max => Some(count.min(max)),
    }
}

/// The surface's current extent when defined, else `requested` clamped to its limits
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, requested: vk::Extent2D) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: requested.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: requested.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Whether the chain must be rebuilt for the live surface size
///
/// `requested` is the size the current chain was asked for, not the extent
/// the surface granted, so a clamped chain is not rebuilt every frame. A
/// zero-sized surface never triggers a resize; such frames are skipped.
pub fn needs_resize(requested: vk::Extent2D, surface: vk::Extent2D) -> bool {
    surface.width != 0 && surface.height != 0 && requested != surface
}

/// Presentable images with their views and framebuffers
///
/// Images belong to the presentation engine; views and framebuffers are owned
/// and released before the chain handle.
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    framebuffers: Vec<Framebuffer>,
    extent: vk::Extent2D,
    requested_extent: vk::Extent2D,
    format: vk::Format,
}

impl Swapchain {
    /// Get the swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Chain dimensions
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Size passed to [`SwapchainManager::create`] for this chain
    pub fn requested_extent(&self) -> vk::Extent2D {
        self.requested_extent
    }

    /// Image format
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Number of images N
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Presentation-engine images
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// One view per image
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// One framebuffer per image
    pub fn framebuffers(&self) -> &[Framebuffer] {
        &self.framebuffers
    }

    /// Image handle for an acquired index
    pub fn image(&self, index: u32) -> VulkanResult<vk::Image> {
        self.images.get(index as usize).copied().ok_or_else(|| out_of_range(index, self.images.len()))
    }

    /// Framebuffer handle for an acquired index
    pub fn framebuffer(&self, index: u32) -> VulkanResult<vk::Framebuffer> {
        self.framebuffers
            .get(index as usize)
            .map(Framebuffer::handle)
            .ok_or_else(|| out_of_range(index, self.framebuffers.len()))
    }

    /// Swapchain extension loader
    pub fn loader(&self) -> &SwapchainLoader {
        &self.loader
    }
}

fn out_of_range(index: u32, count: usize) -> VulkanError {
    VulkanError::InvalidOperation {
        reason: format!("Swapchain image index {} out of range ({} images)", index, count),
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.framebuffers.clear();
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
        log::debug!("Destroyed swapchain ({} images)", self.images.len());
    }
}

/// Creates, resizes and destroys swapchains for one surface
pub struct SwapchainManager {
    surface_format: vk::SurfaceFormatKHR,
    render_pass: RenderPass,
}

impl SwapchainManager {
    /// Choose the surface format and build the render pass that targets it
    pub fn new(ctx: &DeviceContext, surface: &SurfaceContext) -> VulkanResult<Self> {
        let formats = surface.formats(ctx.physical_device)?;
        let surface_format = choose_surface_format(&formats).ok_or_else(|| {
            VulkanError::InitializationFailed("Surface reports no formats".to_string())
        })?;
        log::info!("Swapchain format {:?} / {:?}", surface_format.format, surface_format.color_space);

        let render_pass = RenderPass::new_color_pass(ctx.device.clone(), surface_format.format)?;
        Ok(Self { surface_format, render_pass })
    }

    /// Format every chain is created with
    pub fn surface_format(&self) -> vk::SurfaceFormatKHR {
        self.surface_format
    }

    /// Render pass the framebuffers are built for
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    /// Create a chain of at least [`MIN_IMAGE_COUNT`] images
    ///
    /// Returns `Ok(None)` when the surface cannot present on the context's
    /// queue family. `previous` is handed to the driver as the old chain.
    pub fn create(
        &self,
        ctx: &DeviceContext,
        surface: &SurfaceContext,
        extent: vk::Extent2D,
        previous: Option<&Swapchain>,
    ) -> VulkanResult<Option<Swapchain>> {
        if extent.width == 0 || extent.height == 0 {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Cannot create a {}x{} swapchain", extent.width, extent.height),
            });
        }

        if !surface.supports_present(ctx.physical_device, ctx.queue_family_index)? {
            log::warn!("Surface no longer supports presentation on queue family {}", ctx.queue_family_index);
            return Ok(None);
        }

        let capabilities = surface.capabilities(ctx.physical_device)?;
        let image_count = choose_image_count(&capabilities).ok_or_else(|| {
            VulkanError::InitializationFailed(format!(
                "Surface allows at most {} swapchain images, need {}",
                capabilities.max_image_count, MIN_IMAGE_COUNT
            ))
        })?;
        let composite_alpha = choose_composite_alpha(capabilities.supported_composite_alpha);
        let requested_extent = extent;
        let extent = choose_extent(&capabilities, requested_extent);

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(composite_alpha)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true)
            .old_swapchain(previous.map_or(vk::SwapchainKHR::null(), Swapchain::handle));

        let loader = ctx.swapchain_loader.clone();
        let handle = unsafe {
            loader.create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        // From here on Drop releases whatever has been created
        let mut swapchain = Swapchain {
            device: ctx.device.clone(),
            loader,
            swapchain: handle,
            images: Vec::new(),
            image_views: Vec::new(),
            framebuffers: Vec::new(),
            extent,
            requested_extent,
            format: self.surface_format.format,
        };

        swapchain.images = unsafe {
            swapchain.loader.get_swapchain_images(handle)
                .map_err(VulkanError::Api)?
        };

        for &image in &swapchain.images {
            let view_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.surface_format.format)
                .subresource_range(color_subresource_range());
            let view = unsafe {
                ctx.device.create_image_view(&view_info, None)
                    .map_err(VulkanError::Api)?
            };
            swapchain.image_views.push(view);
        }

        for &view in &swapchain.image_views {
            let framebuffer = Framebuffer::new(ctx.device.clone(), self.render_pass.handle(), &[view], extent)?;
            swapchain.framebuffers.push(framebuffer);
        }

        log::info!(
            "Created swapchain {}x{} with {} images (requested {}, alpha {:?})",
            extent.width,
            extent.height,
            swapchain.image_count(),
            image_count,
            composite_alpha
        );
        Ok(Some(swapchain))
    }

    /// Replace `current` with a chain of the given size
    ///
    /// The new chain is created from the old handle; the device is idled
    /// before the old chain's framebuffers, views and handle are released.
    pub fn resize(
        &self,
        ctx: &DeviceContext,
        surface: &SurfaceContext,
        current: &mut Swapchain,
        extent: vk::Extent2D,
    ) -> VulkanResult<()> {
        let replacement = self
            .create(ctx, surface, extent, Some(&*current))?
            .ok_or(VulkanError::SurfaceUnsupported {
                queue_family: ctx.queue_family_index,
            })?;

        ctx.wait_idle()?;
        let previous = std::mem::replace(current, replacement);
        self.destroy(previous);
        Ok(())
    }

    /// Release framebuffers, then views, then the chain
    pub fn destroy(&self, swapchain: Swapchain) {
        drop(swapchain);
    }
}
