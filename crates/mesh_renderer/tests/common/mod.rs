//! Shared setup for tests that need a real device and a (hidden) window

#![allow(dead_code)]

use ash::vk;
use mesh_renderer::prelude::*;
use std::path::PathBuf;

/// Device stack in drop order: allocator, device, surface, instance, window
pub struct Gpu {
    pub allocator: ResourceAllocator,
    pub device: DeviceContext,
    pub surface: SurfaceContext,
    pub instance: VulkanInstance,
    pub window: Window,
}

impl Gpu {
    pub fn new(width: u32, height: u32) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut window = Window::new_hidden("mesh_renderer test", width, height).expect("window");
        let config = RendererConfig {
            application_name: "mesh_renderer tests".to_string(),
            ..RendererConfig::default()
        };
        let instance = VulkanInstance::new(&window, &config).expect("instance");
        let surface = SurfaceContext::new(&instance, &mut window).expect("surface");
        let device = DeviceContext::new(&instance, &surface).expect("device");
        let allocator = ResourceAllocator::new(&device).expect("allocator");

        Self {
            allocator,
            device,
            surface,
            instance,
            window,
        }
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.window.framebuffer_extent()
    }
}

/// Compiled shaders written by the viewer's build script, if present
pub fn compiled_shaders() -> Option<(PathBuf, PathBuf)> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/shaders");
    let vert = dir.join("mesh.vert.spv");
    let frag = dir.join("mesh.frag.spv");
    (vert.exists() && frag.exists()).then_some((vert, frag))
}
