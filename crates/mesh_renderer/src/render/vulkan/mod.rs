//! Vulkan backend implementation
//!
//! Organized into initialization, resources, rendering, state and frame modules.

/// Vulkan initialization types (instance, window, surface, device)
pub mod initialization;

/// GPU buffers, images, textures and uploads
pub mod resources;

/// Shaders, render pass, pipeline and command pools
pub mod rendering;

/// Swapchain, framebuffers and synchronization
pub mod state;

/// Per-frame submission protocol and frame loop
pub mod frame;

// Re-export core initialization types
pub use initialization::context::{ValidationSink, VulkanError, VulkanInstance, VulkanResult};
pub use initialization::device::{DeviceCandidate, DeviceContext};
pub use initialization::surface::SurfaceContext;
pub use initialization::window::{Window, WindowError};

// Re-export resource types
pub use resources::{GpuBuffer, GpuImage, LayoutTransition, MeshResources, ResourceAllocator, Texture};

// Re-export rendering types
pub use rendering::{CommandPool, MeshPipeline, RenderPass, ShaderModule};

// Re-export state types
pub use state::{FrameSyncPair, Swapchain, SwapchainManager};

// Re-export frame types
pub use frame::{
    run_frame_loop, AcquireOutcome, FrameBackend, FramePhase, FrameRenderer, FrameStats,
    PresentOutcome, TransformSource,
};
