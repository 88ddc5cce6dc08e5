//! Rendering system
//!
//! CPU-side asset contracts (mesh, texture, per-frame push constants) and the
//! Vulkan backend that consumes them.

pub mod mesh;
pub mod push_constants;
pub mod texture_data;
pub mod vulkan;

pub use mesh::{Mesh, MeshError, Vertex, pack_normal};
pub use push_constants::PushConstantBlock;
pub use texture_data::{TextureData, TextureError};
