//! Mesh pipeline
//!
//! Vertices are pulled from a storage buffer, so the pipeline has no vertex
//! input state. Descriptors are pushed per frame through
//! `VK_KHR_push_descriptor`; the transform arrives as push constants.

use ash::extensions::khr::PushDescriptor;
use ash::{vk, Device};
use std::path::Path;

use super::render_pass::RenderPass;
use super::shader::ShaderModule;
use crate::render::vulkan::resources::{GpuBuffer, Texture};
use crate::render::vulkan::{VulkanError, VulkanResult};
use crate::render::PushConstantBlock;

/// Descriptor binding of the vertex storage buffer
pub const VERTEX_BUFFER_BINDING: u32 = 0;
/// Descriptor binding of the combined image sampler
pub const TEXTURE_BINDING: u32 = 1;

/// Graphics pipeline, its layout, push-descriptor set layout and cache
pub struct MeshPipeline {
    device: Device,
    cache: vk::PipelineCache,
    set_layout: vk::DescriptorSetLayout,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl MeshPipeline {
    /// Load both SPIR-V stages from disk and build the pipeline
    pub fn from_files(
        device: Device,
        render_pass: &RenderPass,
        vertex_path: &Path,
        fragment_path: &Path,
    ) -> VulkanResult<Self> {
        let vertex = ShaderModule::from_file(device.clone(), vertex_path)?;
        let fragment = ShaderModule::from_file(device.clone(), fragment_path)?;
        Self::new(device, render_pass, &vertex, &fragment)
    }

    /// Build the pipeline for `render_pass` from compiled shader modules
    pub fn new(
        device: Device,
        render_pass: &RenderPass,
        vertex: &ShaderModule,
        fragment: &ShaderModule,
    ) -> VulkanResult<Self> {
        // Null handles are skipped by Drop if a later step fails
        let mut result = Self {
            device,
            cache: vk::PipelineCache::null(),
            set_layout: vk::DescriptorSetLayout::null(),
            layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
        };

        let cache_info = vk::PipelineCacheCreateInfo::builder();
        result.cache = unsafe {
            result.device.create_pipeline_cache(&cache_info, None)
                .map_err(VulkanError::Api)?
        };

        let bindings = [
            vk::DescriptorSetLayoutBinding::builder()
                .binding(VERTEX_BUFFER_BINDING)
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX)
                .build(),
            vk::DescriptorSetLayoutBinding::builder()
                .binding(TEXTURE_BINDING)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT)
                .build(),
        ];
        let set_layout_info = vk::DescriptorSetLayoutCreateInfo::builder()
            .flags(vk::DescriptorSetLayoutCreateFlags::PUSH_DESCRIPTOR_KHR)
            .bindings(&bindings);
        result.set_layout = unsafe {
            result.device.create_descriptor_set_layout(&set_layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: PushConstantBlock::SIZE,
        }];
        let set_layouts = [result.set_layout];
        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        result.layout = unsafe {
            result.device.create_pipeline_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let stages = [
            vertex.stage_info(vk::ShaderStageFlags::VERTEX),
            fragment.stage_info(vk::ShaderStageFlags::FRAGMENT),
        ];

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder();
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST);
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);
        let rasterization = vk::PipelineRasterizationStateCreateInfo::builder()
            .polygon_mode(vk::PolygonMode::FILL)
            // No depth buffer: closed meshes rely on culling. The flipped
            // viewport keeps counter-clockwise as seen from the camera
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .line_width(1.0);
        let multisample = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder();

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .build()];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::builder()
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder()
            .dynamic_states(&dynamic_states);

        let create_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisample)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blend)
            .dynamic_state(&dynamic_state)
            .layout(result.layout)
            .render_pass(render_pass.handle())
            .subpass(0);

        let pipelines = unsafe {
            result.device
                .create_graphics_pipelines(result.cache, &[create_info.build()], None)
                .map_err(|(_, e)| VulkanError::Api(e))?
        };
        result.pipeline = pipelines.first().copied().ok_or_else(|| {
            VulkanError::InitializationFailed("Driver returned no pipeline".to_string())
        })?;

        log::debug!("Created mesh pipeline");
        Ok(result)
    }

    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get pipeline layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    /// Push the vertex buffer and texture descriptors for the next draw
    pub fn push_descriptors(
        &self,
        push_descriptor: &PushDescriptor,
        command_buffer: vk::CommandBuffer,
        vertex_buffer: &GpuBuffer,
        texture: &Texture,
    ) {
        let buffer_info = [vk::DescriptorBufferInfo {
            buffer: vertex_buffer.handle(),
            offset: 0,
            range: vertex_buffer.size(),
        }];
        let image_info = [texture.descriptor_info()];

        let writes = [
            vk::WriteDescriptorSet::builder()
                .dst_binding(VERTEX_BUFFER_BINDING)
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .buffer_info(&buffer_info)
                .build(),
            vk::WriteDescriptorSet::builder()
                .dst_binding(TEXTURE_BINDING)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_info)
                .build(),
        ];

        unsafe {
            push_descriptor.cmd_push_descriptor_set(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.layout,
                0,
                &writes,
            );
        }
    }

    /// Record the 80-byte push constant block for the vertex stage
    pub fn push_constants(&self, command_buffer: vk::CommandBuffer, block: &PushConstantBlock) {
        unsafe {
            self.device.cmd_push_constants(
                command_buffer,
                self.layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                block.as_bytes(),
            );
        }
    }
}

impl Drop for MeshPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
            self.device.destroy_descriptor_set_layout(self.set_layout, None);
            self.device.destroy_pipeline_cache(self.cache, None);
        }
    }
}
