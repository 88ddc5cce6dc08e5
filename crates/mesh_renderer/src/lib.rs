//! # Mesh Renderer
//!
//! Vulkan core for drawing one textured, indexed mesh per frame to a
//! resizable window.
//!
//! ## Features
//!
//! - **Device selection**: deterministic discrete-first GPU choice with a single
//!   graphics+present queue
//! - **Resource upload**: host-mapped staging buffers, blocking one-shot
//!   transfers and image layout transitions
//! - **Swapchain lifecycle**: FIFO presentation, resize-driven recreation that
//!   idles the device before tearing down the previous chain
//! - **Frame protocol**: acquire → record → submit → present with one frame in
//!   flight
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mesh_renderer::prelude::*;
//!
//! struct Still;
//!
//! impl TransformSource for Still {
//!     fn next_transform(&mut self, _extent: ash::vk::Extent2D) -> PushConstantBlock {
//!         PushConstantBlock::identity()
//!     }
//! }
//!
//! fn run<B: FrameBackend>(backend: &mut B) -> Result<(), VulkanError> {
//!     let stats = run_frame_loop(backend, &mut Still)?;
//!     log::info!("presented {} frames", stats.frames_presented);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, RendererConfig},
        foundation::math::{Mat4, Vec3, Vec4},
        render::{
            Mesh, MeshError, PushConstantBlock, TextureData, TextureError, Vertex,
            vulkan::{
                AcquireOutcome, DeviceContext, FrameBackend, FramePhase, FrameRenderer,
                FrameStats, MeshPipeline, MeshResources, PresentOutcome, RenderPass,
                ResourceAllocator, SurfaceContext, Swapchain, SwapchainManager,
                TransformSource, VulkanError, VulkanInstance, VulkanResult, Window,
                run_frame_loop,
            },
        },
    };
}
