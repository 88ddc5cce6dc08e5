//! Frame loop
//!
//! Runs frames until the backend reports a close request. The close check
//! happens once per iteration, before acquiring, so a frame that has started
//! always finishes. Resizes happen at the top of a frame: when the live
//! surface size differs from the chain, after a suboptimal or out-of-date
//! result, and between acquire retries.

use ash::vk;

use crate::render::vulkan::state::swapchain::needs_resize;
use crate::render::vulkan::{VulkanError, VulkanResult};
use crate::render::PushConstantBlock;

/// Acquire attempts that may end out-of-date before the frame fails
pub const MAX_ACQUIRE_RETRIES: u32 = 3;

/// Result of acquiring a swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready to be rendered to
    Acquired {
        /// Index into the chain's images
        image_index: u32,
        /// The chain still works but no longer matches the surface
        suboptimal: bool,
    },
    /// The chain must be recreated before anything can be acquired
    OutOfDate,
}

/// Result of presenting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Presented normally
    Presented,
    /// Presented, but the chain should be recreated
    Suboptimal,
    /// Not presented, the chain must be recreated
    OutOfDate,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frames that reached the presentation engine
    pub frames_presented: u64,
    /// Swapchain recreations
    pub resizes: u64,
    /// Out-of-date results from acquire or present
    pub out_of_date_recoveries: u64,
    /// Iterations skipped because the surface had a zero dimension
    pub skipped_frames: u64,
}

/// Supplies the per-frame transform
pub trait TransformSource {
    /// Push constants for the next frame, given the chain size it renders at
    fn next_transform(&mut self, extent: vk::Extent2D) -> PushConstantBlock;
}

/// The renderer operations the frame loop sequences
///
/// Implementations own the device, surface, swapchain and frame renderer.
pub trait FrameBackend {
    /// Poll window events and report whether the loop should stop
    fn close_requested(&mut self) -> bool;

    /// Live surface size, read fresh on every call
    fn surface_extent(&self) -> vk::Extent2D;

    /// Size of the current swapchain
    fn chain_extent(&self) -> vk::Extent2D;

    /// Surface size the current swapchain was created for
    ///
    /// Differs from [`FrameBackend::chain_extent`] when the surface clamps
    /// the requested size.
    fn requested_extent(&self) -> vk::Extent2D;

    /// Replace the swapchain with one of `extent`
    fn resize(&mut self, extent: vk::Extent2D) -> VulkanResult<()>;

    /// Acquire the next image
    fn acquire(&mut self) -> VulkanResult<AcquireOutcome>;

    /// Record the frame's commands
    fn record(&mut self, push_constants: &PushConstantBlock) -> VulkanResult<()>;

    /// Submit the recorded commands
    fn submit(&mut self) -> VulkanResult<()>;

    /// Present the acquired image
    fn present(&mut self) -> VulkanResult<PresentOutcome>;

    /// Wait for the frame's GPU work and surface any deferred errors
    fn synchronize(&mut self) -> VulkanResult<()>;

    /// Called instead of rendering while the surface has a zero dimension
    fn wait_while_minimized(&mut self) {}
}

fn is_zero(extent: vk::Extent2D) -> bool {
    extent.width == 0 || extent.height == 0
}

/// Run frames until a close is requested; fatal errors end the loop
pub fn run_frame_loop<B, T>(backend: &mut B, transforms: &mut T) -> VulkanResult<FrameStats>
where
    B: FrameBackend + ?Sized,
    T: TransformSource + ?Sized,
{
    let mut stats = FrameStats::default();
    let mut resize_pending = false;

    while !backend.close_requested() {
        let surface = backend.surface_extent();
        if is_zero(surface) {
            stats.skipped_frames += 1;
            backend.wait_while_minimized();
            continue;
        }

        if resize_pending || needs_resize(backend.requested_extent(), surface) {
            log::debug!("Resizing swapchain to {}x{}", surface.width, surface.height);
            backend.resize(surface)?;
            stats.resizes += 1;
            resize_pending = false;
        }

        let Some(suboptimal) = acquire_with_retry(backend, &mut stats)? else {
            stats.skipped_frames += 1;
            continue;
        };
        resize_pending |= suboptimal;

        let push_constants = transforms.next_transform(backend.chain_extent());
        backend.record(&push_constants)?;
        backend.submit()?;

        match backend.present()? {
            PresentOutcome::Presented => stats.frames_presented += 1,
            PresentOutcome::Suboptimal => {
                stats.frames_presented += 1;
                resize_pending = true;
            }
            PresentOutcome::OutOfDate => {
                log::warn!("Swapchain out of date during present, resizing next frame");
                stats.out_of_date_recoveries += 1;
                resize_pending = true;
            }
        }

        backend.synchronize()?;
    }

    log::info!(
        "Frame loop finished: {} presented, {} resizes, {} out-of-date recoveries, {} skipped",
        stats.frames_presented,
        stats.resizes,
        stats.out_of_date_recoveries,
        stats.skipped_frames
    );
    Ok(stats)
}

/// Acquire, resizing and retrying on out-of-date
///
/// Returns the suboptimal flag, or `None` if the surface shrank to zero while
/// recovering.
fn acquire_with_retry<B>(backend: &mut B, stats: &mut FrameStats) -> VulkanResult<Option<bool>>
where
    B: FrameBackend + ?Sized,
{
    for attempt in 0..=MAX_ACQUIRE_RETRIES {
        match backend.acquire()? {
            AcquireOutcome::Acquired { suboptimal, .. } => return Ok(Some(suboptimal)),
            AcquireOutcome::OutOfDate if attempt < MAX_ACQUIRE_RETRIES => {
                stats.out_of_date_recoveries += 1;
                let surface = backend.surface_extent();
                if is_zero(surface) {
                    return Ok(None);
                }
                backend.resize(surface)?;
                stats.resizes += 1;
            }
            AcquireOutcome::OutOfDate => {}
        }
    }

    log::error!("Swapchain still out of date after {} resizes", MAX_ACQUIRE_RETRIES);
    Err(VulkanError::SwapchainOutOfDate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    const SQUARE: vk::Extent2D = vk::Extent2D { width: 256, height: 256 };
    const WIDE: vk::Extent2D = vk::Extent2D { width: 512, height: 256 };
    const ZERO: vk::Extent2D = vk::Extent2D { width: 0, height: 0 };

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Resize(vk::Extent2D),
        Acquire,
        Record,
        Submit,
        Present,
        Synchronize,
    }

    /// Scripted backend; frames are counted by synchronize calls
    struct MockBackend {
        calls: Vec<Call>,
        chain: vk::Extent2D,
        requested: vk::Extent2D,
        // Largest chain the fake surface grants
        max_chain: Option<vk::Extent2D>,
        surface: vk::Extent2D,
        // (frame, surface size from that frame on)
        surface_changes: VecDeque<(u64, vk::Extent2D)>,
        acquire_script: VecDeque<AcquireOutcome>,
        present_script: VecDeque<PresentOutcome>,
        close_during_acquire_of_frame: Option<u64>,
        close_after_frames: u64,
        close: bool,
        frames: u64,
        polls: u64,
        fail_submit: bool,
    }

    impl MockBackend {
        fn new(close_after_frames: u64) -> Self {
            Self {
                calls: Vec::new(),
                chain: SQUARE,
                requested: SQUARE,
                max_chain: None,
                surface: SQUARE,
                surface_changes: VecDeque::new(),
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                close_during_acquire_of_frame: None,
                close_after_frames,
                close: false,
                frames: 0,
                polls: 0,
                fail_submit: false,
            }
        }

        fn frame_calls() -> [Call; 5] {
            [Call::Acquire, Call::Record, Call::Submit, Call::Present, Call::Synchronize]
        }

        fn count(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    impl FrameBackend for MockBackend {
        fn close_requested(&mut self) -> bool {
            self.polls += 1;
            if let Some(&(frame, extent)) = self.surface_changes.front() {
                if self.frames >= frame {
                    self.surface = extent;
                    self.surface_changes.pop_front();
                }
            }
            // Guard against runaway loops in failing tests
            self.close || self.frames >= self.close_after_frames || self.polls > 1000
        }

        fn surface_extent(&self) -> vk::Extent2D {
            self.surface
        }

        fn chain_extent(&self) -> vk::Extent2D {
            self.chain
        }

        fn requested_extent(&self) -> vk::Extent2D {
            self.requested
        }

        fn resize(&mut self, extent: vk::Extent2D) -> VulkanResult<()> {
            self.calls.push(Call::Resize(extent));
            self.requested = extent;
            self.chain = match self.max_chain {
                Some(max) => vk::Extent2D {
                    width: extent.width.min(max.width),
                    height: extent.height.min(max.height),
                },
                None => extent,
            };
            Ok(())
        }

        fn acquire(&mut self) -> VulkanResult<AcquireOutcome> {
            self.calls.push(Call::Acquire);
            if self.close_during_acquire_of_frame == Some(self.frames) {
                self.close = true;
            }
            Ok(self.acquire_script.pop_front().unwrap_or(AcquireOutcome::Acquired {
                image_index: 0,
                suboptimal: false,
            }))
        }

        fn record(&mut self, _push_constants: &PushConstantBlock) -> VulkanResult<()> {
            self.calls.push(Call::Record);
            Ok(())
        }

        fn submit(&mut self) -> VulkanResult<()> {
            self.calls.push(Call::Submit);
            if self.fail_submit {
                return Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST));
            }
            Ok(())
        }

        fn present(&mut self) -> VulkanResult<PresentOutcome> {
            self.calls.push(Call::Present);
            Ok(self.present_script.pop_front().unwrap_or(PresentOutcome::Presented))
        }

        fn synchronize(&mut self) -> VulkanResult<()> {
            self.calls.push(Call::Synchronize);
            self.frames += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTransforms {
        extents: Vec<vk::Extent2D>,
    }

    impl TransformSource for RecordingTransforms {
        fn next_transform(&mut self, extent: vk::Extent2D) -> PushConstantBlock {
            self.extents.push(extent);
            PushConstantBlock::identity()
        }
    }

    #[test]
    fn test_runs_until_close() {
        let mut backend = MockBackend::new(3);
        let mut transforms = RecordingTransforms::default();

        let stats = run_frame_loop(&mut backend, &mut transforms).unwrap();

        assert_eq!(stats.frames_presented, 3);
        assert_eq!(stats.resizes, 0);
        let expected: Vec<Call> = (0..3).flat_map(|_| MockBackend::frame_calls()).collect();
        assert_eq!(backend.calls, expected);
        assert_eq!(transforms.extents, vec![SQUARE; 3]);
    }

    #[test]
    fn test_close_during_acquire_finishes_current_frame() {
        let mut backend = MockBackend::new(u64::MAX);
        backend.close_during_acquire_of_frame = Some(1);
        let mut transforms = RecordingTransforms::default();

        let stats = run_frame_loop(&mut backend, &mut transforms).unwrap();

        assert_eq!(stats.frames_presented, 2);
        assert_eq!(backend.calls.last(), Some(&Call::Synchronize));
        assert_eq!(backend.count(&Call::Acquire), 2);
    }

    #[test]
    fn test_surface_change_resizes_before_acquire() {
        let mut backend = MockBackend::new(2);
        backend.surface_changes.push_back((1, WIDE));
        let mut transforms = RecordingTransforms::default();

        let stats = run_frame_loop(&mut backend, &mut transforms).unwrap();

        assert_eq!(stats.resizes, 1);
        assert_eq!(backend.calls[5], Call::Resize(WIDE));
        assert_eq!(backend.calls[6], Call::Acquire);
        assert_eq!(transforms.extents, vec![SQUARE, WIDE]);
    }

    #[test]
    fn test_clamped_chain_is_not_rebuilt_every_frame() {
        let mut backend = MockBackend::new(4);
        backend.max_chain = Some(vk::Extent2D { width: 300, height: 256 });
        backend.surface_changes.push_back((1, WIDE));
        let mut transforms = RecordingTransforms::default();

        let stats = run_frame_loop(&mut backend, &mut transforms).unwrap();

        assert_eq!(stats.resizes, 1);
        assert_eq!(stats.frames_presented, 4);
        assert_eq!(backend.chain, vk::Extent2D { width: 300, height: 256 });
        assert_eq!(transforms.extents[3], vk::Extent2D { width: 300, height: 256 });
    }

    #[test]
    fn test_out_of_date_acquire_resizes_and_retries() {
        let mut backend = MockBackend::new(1);
        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
        let mut transforms = RecordingTransforms::default();

        let stats = run_frame_loop(&mut backend, &mut transforms).unwrap();

        assert_eq!(stats.out_of_date_recoveries, 1);
        assert_eq!(stats.resizes, 1);
        assert_eq!(stats.frames_presented, 1);
        assert_eq!(&backend.calls[..3], &[Call::Acquire, Call::Resize(SQUARE), Call::Acquire]);
    }

    #[test]
    fn test_persistent_out_of_date_is_fatal() {
        let mut backend = MockBackend::new(1);
        backend.acquire_script.extend([AcquireOutcome::OutOfDate; 10]);
        let mut transforms = RecordingTransforms::default();

        let result = run_frame_loop(&mut backend, &mut transforms);

        assert!(matches!(result, Err(VulkanError::SwapchainOutOfDate)));
        assert_eq!(backend.count(&Call::Acquire), (MAX_ACQUIRE_RETRIES + 1) as usize);
        assert_eq!(backend.count(&Call::Record), 0);
    }

    #[test]
    fn test_present_out_of_date_forces_resize_next_frame() {
        let mut backend = MockBackend::new(2);
        backend.present_script.push_back(PresentOutcome::OutOfDate);
        let mut transforms = RecordingTransforms::default();

        let stats = run_frame_loop(&mut backend, &mut transforms).unwrap();

        assert_eq!(stats.frames_presented, 1);
        assert_eq!(stats.out_of_date_recoveries, 1);
        assert_eq!(backend.calls[5], Call::Resize(SQUARE));
    }

    #[test]
    fn test_suboptimal_acquire_still_renders() {
        let mut backend = MockBackend::new(2);
        backend.acquire_script.push_back(AcquireOutcome::Acquired { image_index: 1, suboptimal: true });
        let mut transforms = RecordingTransforms::default();

        let stats = run_frame_loop(&mut backend, &mut transforms).unwrap();

        assert_eq!(stats.frames_presented, 2);
        assert_eq!(stats.resizes, 1);
        assert_eq!(backend.calls[5], Call::Resize(SQUARE));
    }

    #[test]
    fn test_zero_surface_skips_frames() {
        let mut backend = MockBackend::new(1);
        backend.surface = ZERO;
        let mut transforms = RecordingTransforms::default();

        // Never leaves the minimized state; the runaway guard ends the loop
        let stats = run_frame_loop(&mut backend, &mut transforms).unwrap();

        assert_eq!(stats.frames_presented, 0);
        assert!(stats.skipped_frames > 0);
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn test_fatal_error_stops_loop() {
        let mut backend = MockBackend::new(5);
        backend.fail_submit = true;
        let mut transforms = RecordingTransforms::default();

        let result = run_frame_loop(&mut backend, &mut transforms);

        assert!(matches!(result, Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))));
        assert_eq!(backend.calls, vec![Call::Acquire, Call::Record, Call::Submit]);
    }
}
