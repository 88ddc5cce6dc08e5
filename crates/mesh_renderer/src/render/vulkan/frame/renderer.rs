//! Per-frame submission
//!
//! One command buffer and one semaphore pair serve every frame. Each step
//! checks the frame phase, so steps cannot be skipped or repeated.

use ash::vk;

use super::frame_loop::{AcquireOutcome, PresentOutcome};
use super::phase::FramePhase;
use crate::render::vulkan::resources::image::color_subresource_range;
use crate::render::vulkan::rendering::commands::CommandPool;
use crate::render::vulkan::state::sync::FrameSyncPair;
use crate::render::vulkan::{
    DeviceContext, MeshPipeline, MeshResources, RenderPass, Swapchain, VulkanError, VulkanResult,
};
use crate::render::PushConstantBlock;

/// Drives one frame at a time through acquire, record, submit, present and idle
pub struct FrameRenderer {
    // Dropped first: the pool idles the device before the semaphores go
    command_pool: CommandPool,
    command_buffer: vk::CommandBuffer,
    sync: FrameSyncPair,
    phase: FramePhase,
    image_index: Option<u32>,
    clear_color: [f32; 4],
}

impl FrameRenderer {
    /// Create the command pool, command buffer and semaphore pair
    pub fn new(ctx: &DeviceContext, clear_color: [f32; 4]) -> VulkanResult<Self> {
        let command_pool = CommandPool::new(ctx)?;
        let command_buffer = command_pool.allocate_primary()?;
        let sync = FrameSyncPair::new(&ctx.device)?;

        log::debug!("Created frame renderer");
        Ok(Self {
            command_pool,
            command_buffer,
            sync,
            phase: FramePhase::Idle,
            image_index: None,
            clear_color,
        })
    }

    /// Current phase
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Image acquired for the frame in progress
    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    /// Acquire the next image without a timeout
    ///
    /// An out-of-date chain leaves the frame idle so the caller can resize and
    /// try again.
    pub fn acquire(&mut self, swapchain: &Swapchain) -> VulkanResult<AcquireOutcome> {
        self.phase.expect(FramePhase::Idle, "acquire")?;

        let result = unsafe {
            swapchain.loader().acquire_next_image(
                swapchain.handle(),
                u64::MAX,
                self.sync.acquire.handle(),
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => {
                self.phase.advance_to(FramePhase::Acquired, "acquire")?;
                self.image_index = Some(image_index);
                Ok(AcquireOutcome::Acquired { image_index, suboptimal })
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("Swapchain out of date during acquire");
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(e) => Err(VulkanError::Api(e)),
        }
    }

    fn acquired_index(&self) -> VulkanResult<u32> {
        self.image_index.ok_or_else(|| VulkanError::InvalidOperation {
            reason: "No swapchain image acquired".to_string(),
        })
    }

    /// Record the single indexed draw for the acquired image
    pub fn record(
        &mut self,
        ctx: &DeviceContext,
        swapchain: &Swapchain,
        render_pass: &RenderPass,
        pipeline: &MeshPipeline,
        resources: &MeshResources,
        push_constants: &PushConstantBlock,
    ) -> VulkanResult<()> {
        self.phase.expect(FramePhase::Acquired, "record")?;
        let image_index = self.acquired_index()?;
        let image = swapchain.image(image_index)?;
        let framebuffer = swapchain.framebuffer(image_index)?;
        let extent = swapchain.extent();
        let device = &ctx.device;
        let cb = self.command_buffer;

        self.command_pool.reset()?;

        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            device.begin_command_buffer(cb, &begin_info)
                .map_err(VulkanError::Api)?;

            let render_begin_barrier = vk::ImageMemoryBarrier::builder()
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_subresource_range())
                .build();
            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::DependencyFlags::BY_REGION,
                &[],
                &[],
                &[render_begin_barrier],
            );

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue { float32: self.clear_color },
            }];
            let render_area = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            let pass_begin = vk::RenderPassBeginInfo::builder()
                .render_pass(render_pass.handle())
                .framebuffer(framebuffer)
                .render_area(render_area)
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(cb, &pass_begin, vk::SubpassContents::INLINE);

            // Negative height flips y so +y is up in clip space
            let viewport = vk::Viewport {
                x: 0.0,
                y: extent.height as f32,
                width: extent.width as f32,
                height: -(extent.height as f32),
                min_depth: 0.0,
                max_depth: 1.0,
            };
            device.cmd_set_viewport(cb, 0, &[viewport]);
            device.cmd_set_scissor(cb, 0, &[render_area]);

            device.cmd_bind_pipeline(cb, vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
            pipeline.push_constants(cb, push_constants);
            pipeline.push_descriptors(&ctx.push_descriptor, cb, resources.vertex_buffer(), resources.texture());

            device.cmd_bind_index_buffer(cb, resources.index_buffer().handle(), 0, vk::IndexType::UINT32);
            device.cmd_draw_indexed(cb, resources.index_count(), 1, 0, 0, 0);

            device.cmd_end_render_pass(cb);

            let render_end_barrier = vk::ImageMemoryBarrier::builder()
                .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
                .dst_access_mask(vk::AccessFlags::empty())
                .old_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                .new_layout(vk::ImageLayout::PRESENT_SRC_KHR)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_subresource_range())
                .build();
            device.cmd_pipeline_barrier(
                cb,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::DependencyFlags::BY_REGION,
                &[],
                &[],
                &[render_end_barrier],
            );

            device.end_command_buffer(cb)
                .map_err(VulkanError::Api)?;
        }

        self.phase.advance_to(FramePhase::Recorded, "record")
    }

    /// Submit once, waiting on acquire at color output and signalling release
    pub fn submit(&mut self, ctx: &DeviceContext) -> VulkanResult<()> {
        self.phase.expect(FramePhase::Recorded, "submit")?;

        let wait_semaphores = [self.sync.acquire.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.command_buffer];
        let signal_semaphores = [self.sync.release.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            ctx.device.queue_submit(ctx.queue, &[submit_info.build()], vk::Fence::null())
                .map_err(VulkanError::Api)?;
        }

        self.phase.advance_to(FramePhase::Submitted, "submit")
    }

    /// Present the acquired image once rendering has signalled release
    pub fn present(&mut self, ctx: &DeviceContext, swapchain: &Swapchain) -> VulkanResult<PresentOutcome> {
        self.phase.expect(FramePhase::Submitted, "present")?;
        let image_index = self.acquired_index()?;

        let wait_semaphores = [self.sync.release.handle()];
        let swapchains = [swapchain.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { swapchain.loader().queue_present(ctx.queue, &present_info) };
        let outcome = match result {
            Ok(false) => PresentOutcome::Presented,
            Ok(true) => PresentOutcome::Suboptimal,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => PresentOutcome::OutOfDate,
            Err(e) => return Err(VulkanError::Api(e)),
        };

        self.phase.advance_to(FramePhase::Presented, "present")?;
        Ok(outcome)
    }

    /// Wait for the device to go idle and return to [`FramePhase::Idle`]
    pub fn synchronize(&mut self, ctx: &DeviceContext) -> VulkanResult<()> {
        self.phase.expect(FramePhase::Presented, "synchronize")?;
        ctx.wait_idle()?;
        self.image_index = None;
        self.phase.advance_to(FramePhase::Idle, "synchronize")
    }
}
