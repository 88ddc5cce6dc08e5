//! One quad rendered end to end, with a resize between frames

mod common;

use ash::vk;
use common::{compiled_shaders, Gpu};
use mesh_renderer::prelude::*;

const WIDE: vk::Extent2D = vk::Extent2D { width: 512, height: 256 };

/// Pump events until the framebuffer reports `target`, or give up after a few seconds
fn wait_for_framebuffer(gpu: &mut Gpu, target: vk::Extent2D) -> vk::Extent2D {
    for _ in 0..100 {
        if gpu.extent() == target {
            break;
        }
        gpu.window.wait_events_timeout(0.05);
    }
    gpu.extent()
}

fn render_frame(
    gpu: &Gpu,
    renderer: &mut FrameRenderer,
    manager: &SwapchainManager,
    swapchain: &mut Swapchain,
    pipeline: &MeshPipeline,
    resources: &MeshResources,
) -> PresentOutcome {
    let mut outcome = renderer.acquire(swapchain).unwrap();
    if outcome == AcquireOutcome::OutOfDate {
        manager.resize(&gpu.device, &gpu.surface, swapchain, gpu.extent()).unwrap();
        outcome = renderer.acquire(swapchain).unwrap();
    }
    assert!(matches!(outcome, AcquireOutcome::Acquired { .. }));
    assert_eq!(renderer.phase(), FramePhase::Acquired);

    renderer
        .record(
            &gpu.device,
            swapchain,
            manager.render_pass(),
            pipeline,
            resources,
            &PushConstantBlock::identity(),
        )
        .unwrap();
    renderer.submit(&gpu.device).unwrap();
    let presented = renderer.present(&gpu.device, swapchain).unwrap();
    renderer.synchronize(&gpu.device).unwrap();
    assert_eq!(renderer.phase(), FramePhase::Idle);
    presented
}

#[test]
#[ignore = "requires a Vulkan device and display"]
fn test_quad_renders_across_resize() {
    let (vert, frag) = compiled_shaders().expect("compiled shaders missing, build viewer_app first");

    let mut gpu = Gpu::new(256, 256);
    let manager = SwapchainManager::new(&gpu.device, &gpu.surface).unwrap();
    let pipeline = MeshPipeline::from_files(gpu.device.device.clone(), manager.render_pass(), &vert, &frag).unwrap();
    let texture = TextureData::checkerboard(2, [255, 255, 255, 255], [0, 0, 0, 255]).unwrap();
    let resources = MeshResources::upload(&gpu.device, &gpu.allocator, &Mesh::quad(), &texture).unwrap();
    let mut renderer = FrameRenderer::new(&gpu.device, RendererConfig::default().clear_color).unwrap();

    let mut swapchain = manager.create(&gpu.device, &gpu.surface, gpu.extent(), None).unwrap().unwrap();
    assert_eq!(swapchain.extent(), vk::Extent2D { width: 256, height: 256 });
    let first = render_frame(&gpu, &mut renderer, &manager, &mut swapchain, &pipeline, &resources);
    assert_eq!(first, PresentOutcome::Presented);

    gpu.window.set_size(WIDE.width, WIDE.height);
    assert_eq!(wait_for_framebuffer(&mut gpu, WIDE), WIDE);
    manager.resize(&gpu.device, &gpu.surface, &mut swapchain, WIDE).unwrap();
    assert_eq!(swapchain.extent(), WIDE);
    assert_eq!(swapchain.framebuffers().len(), swapchain.image_count());

    let second = render_frame(&gpu, &mut renderer, &manager, &mut swapchain, &pipeline, &resources);
    assert_eq!(second, PresentOutcome::Presented);

    // Out of order steps are rejected
    assert!(renderer.submit(&gpu.device).is_err());
    assert!(renderer.present(&gpu.device, &swapchain).is_err());

    gpu.device.wait_idle().unwrap();
    manager.destroy(swapchain);
    gpu.instance.check_validation().unwrap();
}
