//! Window-backed frame backend
//!
//! Owns the whole device stack. Field order is drop order: GPU objects go
//! before the device, the device before the surface, the surface before the
//! instance and the instance before the window.

use ash::vk;
use mesh_renderer::prelude::*;
use std::path::PathBuf;

use crate::assets;
use crate::config::ViewerConfig;
use crate::error::{self, AppResult};

pub struct ViewerBackend {
    renderer: FrameRenderer,
    resources: MeshResources,
    pipeline: MeshPipeline,
    swapchain: Swapchain,
    swapchain_manager: SwapchainManager,
    allocator: ResourceAllocator,
    device: DeviceContext,
    surface: SurfaceContext,
    instance: VulkanInstance,
    window: Window,
    mesh: Mesh,
    texture_path: Option<PathBuf>,
    // Device failure from an asset reload, reported by the next acquire
    deferred_error: Option<VulkanError>,
}

impl ViewerBackend {
    pub fn new(config: &ViewerConfig) -> AppResult<Self> {
        let settings = &config.window;
        let mut window = Window::new(&settings.title, settings.width, settings.height)?;

        let instance = VulkanInstance::new(&window, &config.renderer)?;
        let surface = SurfaceContext::new(&instance, &mut window)?;
        let device = DeviceContext::new(&instance, &surface)?;
        let allocator = ResourceAllocator::new(&device)?;

        let swapchain_manager = SwapchainManager::new(&device, &surface)?;
        let mut extent = window.framebuffer_extent();
        if extent.width == 0 || extent.height == 0 {
            extent = vk::Extent2D { width: settings.width, height: settings.height };
        }
        let swapchain = swapchain_manager
            .create(&device, &surface, extent, None)?
            .ok_or(VulkanError::SurfaceUnsupported {
                queue_family: device.queue_family_index,
            })?;

        let pipeline = MeshPipeline::from_files(
            device.device.clone(),
            swapchain_manager.render_pass(),
            &config.vertex_shader,
            &config.fragment_shader,
        )?;

        let mesh = assets::cube()?;
        let texture = assets::texture_or_default(config.texture.as_deref())?;
        let resources = MeshResources::upload(&device, &allocator, &mesh, &texture)?;

        let renderer = FrameRenderer::new(&device, config.renderer.clear_color)?;
        instance.check_validation()?;

        log::info!("Viewer ready");
        Ok(Self {
            renderer,
            resources,
            pipeline,
            swapchain,
            swapchain_manager,
            allocator,
            device,
            surface,
            instance,
            window,
            mesh,
            texture_path: config.texture.clone(),
            deferred_error: None,
        })
    }

    /// Re-read the texture file and upload mesh and texture again
    fn reload_assets(&mut self) -> AppResult<()> {
        let texture = assets::texture_or_default(self.texture_path.as_deref())?;

        self.device.wait_idle()?;
        self.resources = MeshResources::upload(&self.device, &self.allocator, &self.mesh, &texture)?;
        log::info!("Reloaded assets");
        Ok(())
    }
}

impl FrameBackend for ViewerBackend {
    fn close_requested(&mut self) -> bool {
        for key in self.window.poll_key_presses() {
            match key {
                glfw::Key::Escape => self.window.set_should_close(true),
                glfw::Key::R => {
                    if let Err(e) = self.reload_assets() {
                        if let Some(fatal) = error::reload_failure(e) {
                            self.deferred_error.get_or_insert(fatal);
                        }
                    }
                }
                _ => {}
            }
        }
        self.window.should_close()
    }

    fn surface_extent(&self) -> vk::Extent2D {
        self.window.framebuffer_extent()
    }

    fn chain_extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    fn requested_extent(&self) -> vk::Extent2D {
        self.swapchain.requested_extent()
    }

    fn resize(&mut self, extent: vk::Extent2D) -> VulkanResult<()> {
        self.swapchain_manager
            .resize(&self.device, &self.surface, &mut self.swapchain, extent)
    }

    fn acquire(&mut self) -> VulkanResult<AcquireOutcome> {
        if let Some(e) = self.deferred_error.take() {
            return Err(e);
        }
        self.renderer.acquire(&self.swapchain)
    }

    fn record(&mut self, push_constants: &PushConstantBlock) -> VulkanResult<()> {
        self.renderer.record(
            &self.device,
            &self.swapchain,
            self.swapchain_manager.render_pass(),
            &self.pipeline,
            &self.resources,
            push_constants,
        )
    }

    fn submit(&mut self) -> VulkanResult<()> {
        self.renderer.submit(&self.device)
    }

    fn present(&mut self) -> VulkanResult<PresentOutcome> {
        self.renderer.present(&self.device, &self.swapchain)
    }

    fn synchronize(&mut self) -> VulkanResult<()> {
        self.renderer.synchronize(&self.device)?;
        self.instance.check_validation()
    }

    fn wait_while_minimized(&mut self) {
        self.window.wait_events_timeout(0.1);
    }
}
