//! Frame protocol: phases, the frame renderer and the loop that drives it

pub mod frame_loop;
pub mod phase;
pub mod renderer;

pub use frame_loop::{
    run_frame_loop, AcquireOutcome, FrameBackend, FrameStats, PresentOutcome, TransformSource,
    MAX_ACQUIRE_RETRIES,
};
pub use phase::FramePhase;
pub use renderer::FrameRenderer;
