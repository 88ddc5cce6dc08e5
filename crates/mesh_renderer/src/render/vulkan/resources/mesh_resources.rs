//! GPU-resident mesh and texture

use ash::vk;

use super::buffer::GpuBuffer;
use super::texture::Texture;
use super::ResourceAllocator;
use crate::render::vulkan::{DeviceContext, VulkanResult};
use crate::render::{Mesh, TextureData};

/// Vertex storage buffer, index buffer and texture read by every frame
pub struct MeshResources {
    vertex_buffer: GpuBuffer,
    index_buffer: GpuBuffer,
    index_count: u32,
    texture: Texture,
}

impl MeshResources {
    /// Upload mesh and texture to device-local memory
    pub fn upload(
        ctx: &DeviceContext,
        allocator: &ResourceAllocator,
        mesh: &Mesh,
        texture: &TextureData,
    ) -> VulkanResult<Self> {
        let vertex_buffer = allocator.upload_bytes(ctx, mesh.vertex_bytes(), vk::BufferUsageFlags::STORAGE_BUFFER)?;
        let index_buffer = allocator.upload_bytes(ctx, mesh.index_bytes(), vk::BufferUsageFlags::INDEX_BUFFER)?;
        let texture = allocator.upload_texture(ctx, texture)?;

        log::info!(
            "Uploaded mesh: {} vertices, {} indices, {}x{} texture",
            mesh.vertices().len(),
            mesh.index_count(),
            texture.extent().width,
            texture.extent().height
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            texture,
        })
    }

    /// Storage buffer bound at descriptor binding 0
    pub fn vertex_buffer(&self) -> &GpuBuffer {
        &self.vertex_buffer
    }

    /// `u32` index buffer
    pub fn index_buffer(&self) -> &GpuBuffer {
        &self.index_buffer
    }

    /// Indices drawn per frame
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Texture bound at descriptor binding 1
    pub fn texture(&self) -> &Texture {
        &self.texture
    }
}
