//! Application error type

use mesh_renderer::prelude::{ConfigError, MeshError, TextureError, VulkanError};
use mesh_renderer::render::vulkan::WindowError;
use std::path::PathBuf;
use thiserror::Error;

/// Anything that can stop the viewer
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    #[error("Failed to load image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Whether the error came from asset content rather than the device
    pub fn is_asset_error(&self) -> bool {
        matches!(self, Self::Image { .. } | Self::Texture(_) | Self::Mesh(_))
    }
}

/// Sort out a failed asset reload
///
/// Bad asset files are logged and the previous assets stay in use. Anything
/// else is returned as the error that stops the frame loop.
pub fn reload_failure(error: AppError) -> Option<VulkanError> {
    match error {
        AppError::Vulkan(e) => Some(e),
        e if e.is_asset_error() => {
            log::warn!("Asset reload failed, keeping previous assets: {}", e);
            None
        }
        other => Some(VulkanError::InvalidOperation {
            reason: format!("Asset reload failed: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    #[test]
    fn test_bad_asset_files_are_not_fatal() {
        let missing = AppError::Image {
            path: PathBuf::from("missing.png"),
            source: image::ImageError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "missing")),
        };
        assert!(reload_failure(missing).is_none());
        assert!(reload_failure(AppError::Texture(TextureError::EmptyDimensions { width: 0, height: 4 })).is_none());
    }

    #[test]
    fn test_device_errors_during_reload_are_fatal() {
        let out_of_memory = AppError::Vulkan(VulkanError::OutOfDeviceMemory {
            type_bits: 0b11,
            required: vk::MemoryPropertyFlags::DEVICE_LOCAL,
        });
        assert!(matches!(
            reload_failure(out_of_memory),
            Some(VulkanError::OutOfDeviceMemory { type_bits: 0b11, .. })
        ));

        let lost = AppError::Vulkan(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST));
        assert!(matches!(
            reload_failure(lost),
            Some(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))
        ));
    }
}
