//! Swapchain lifecycle against a real surface

mod common;

use ash::vk;
use common::Gpu;
use mesh_renderer::prelude::*;

#[test]
#[ignore = "requires a Vulkan device and display"]
fn test_create_yields_matching_counts() {
    let gpu = Gpu::new(256, 256);
    let manager = SwapchainManager::new(&gpu.device, &gpu.surface).unwrap();

    let swapchain = manager
        .create(&gpu.device, &gpu.surface, gpu.extent(), None)
        .unwrap()
        .expect("surface supports presentation");

    assert!(swapchain.image_count() >= 2);
    assert_eq!(swapchain.image_views().len(), swapchain.image_count());
    assert_eq!(swapchain.framebuffers().len(), swapchain.image_count());
    assert_eq!(swapchain.format(), manager.surface_format().format);

    manager.destroy(swapchain);
    gpu.instance.check_validation().unwrap();
}

#[test]
#[ignore = "requires a Vulkan device and display"]
fn test_resize_to_same_size_is_equivalent() {
    let gpu = Gpu::new(256, 256);
    let manager = SwapchainManager::new(&gpu.device, &gpu.surface).unwrap();
    let extent = gpu.extent();

    let mut swapchain = manager.create(&gpu.device, &gpu.surface, extent, None).unwrap().unwrap();
    let old_handle = swapchain.handle();
    let old_count = swapchain.image_count();
    let old_extent = swapchain.extent();

    manager.resize(&gpu.device, &gpu.surface, &mut swapchain, extent).unwrap();

    assert_ne!(swapchain.handle(), old_handle);
    assert_ne!(swapchain.handle(), vk::SwapchainKHR::null());
    assert_eq!(swapchain.image_count(), old_count);
    assert_eq!(swapchain.extent(), old_extent);
    assert_eq!(swapchain.framebuffers().len(), old_count);

    manager.destroy(swapchain);
    gpu.instance.check_validation().unwrap();
}
