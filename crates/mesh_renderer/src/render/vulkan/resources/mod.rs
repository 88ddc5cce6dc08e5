//! GPU buffers, images, textures and the allocator that fills them

pub mod allocator;
pub mod buffer;
pub mod image;
pub mod memory;
pub mod mesh_resources;
pub mod texture;

pub use allocator::ResourceAllocator;
pub use buffer::GpuBuffer;
pub use image::{GpuImage, LayoutTransition};
pub use mesh_resources::MeshResources;
pub use texture::Texture;
