//! Frame phases

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Where the current frame is in acquire → record → submit → present → idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    /// No frame in progress
    #[default]
    Idle,
    /// Swapchain image acquired
    Acquired,
    /// Command buffer recorded
    Recorded,
    /// Command buffer submitted
    Submitted,
    /// Image handed to the presentation engine
    Presented,
}

impl FramePhase {
    /// Phase that follows this one
    pub fn next(self) -> Self {
        match self {
            Self::Idle => Self::Acquired,
            Self::Acquired => Self::Recorded,
            Self::Recorded => Self::Submitted,
            Self::Submitted => Self::Presented,
            Self::Presented => Self::Idle,
        }
    }

    /// Fail unless the frame is in `expected`
    pub fn expect(self, expected: Self, operation: &str) -> VulkanResult<()> {
        if self == expected {
            Ok(())
        } else {
            Err(VulkanError::InvalidOperation {
                reason: format!("{} requires phase {:?}, frame is {:?}", operation, expected, self),
            })
        }
    }

    /// Check that `self` is the phase before `target` and move to it
    pub fn advance_to(&mut self, target: Self, operation: &str) -> VulkanResult<()> {
        let from = *self;
        if from.next() != target {
            return Err(VulkanError::InvalidOperation {
                reason: format!("{} cannot move frame from {:?} to {:?}", operation, from, target),
            });
        }
        *self = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_returns_to_idle() {
        let mut phase = FramePhase::Idle;
        let expected = [
            FramePhase::Acquired,
            FramePhase::Recorded,
            FramePhase::Submitted,
            FramePhase::Presented,
            FramePhase::Idle,
        ];
        for target in expected {
            phase.advance_to(target, "step").unwrap();
        }
        assert_eq!(phase, FramePhase::Idle);
    }

    #[test]
    fn test_rejects_skipped_phase() {
        let mut phase = FramePhase::Acquired;
        assert!(phase.advance_to(FramePhase::Submitted, "submit").is_err());
        assert_eq!(phase, FramePhase::Acquired);
    }

    #[test]
    fn test_expect() {
        assert!(FramePhase::Idle.expect(FramePhase::Idle, "acquire").is_ok());
        assert!(matches!(
            FramePhase::Recorded.expect(FramePhase::Idle, "acquire"),
            Err(VulkanError::InvalidOperation { .. })
        ));
    }
}
