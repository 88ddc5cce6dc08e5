//! Swapchain, framebuffers and frame synchronization

pub mod framebuffer;
pub mod swapchain;
pub mod sync;

pub use framebuffer::Framebuffer;
pub use swapchain::{Swapchain, SwapchainManager};
pub use sync::{FrameSyncPair, Semaphore};
