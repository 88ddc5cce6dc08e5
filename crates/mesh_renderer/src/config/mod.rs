//! Configuration system
//!
//! Settings are plain serde structs; the file extension picks the format.

pub use serde::{Serialize, Deserialize};
use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Renderer-level settings consumed when the Vulkan instance and frame
/// renderer are created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name reported to the driver
    pub application_name: String,

    /// Enable `VK_LAYER_KHRONOS_validation` and the debug messenger
    pub enable_validation: bool,

    /// Clear color of the single color attachment (RGBA, linear)
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "Mesh Viewer".to_string(),
            enable_validation: cfg!(debug_assertions),
            clear_color: [48.0 / 256.0, 10.0 / 256.0, 36.0 / 256.0, 1.0],
        }
    }
}

impl Config for RendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("mesh_renderer_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_toml_round_trip() {
        let path = temp_path("renderer.toml");
        let config = RendererConfig {
            application_name: "Round Trip".to_string(),
            enable_validation: true,
            clear_color: [0.25, 0.5, 0.75, 1.0],
        };

        config.save_to_file(&path).expect("save toml");
        let loaded = RendererConfig::load_from_file(&path).expect("load toml");
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_missing_fields_use_defaults() {
        let path = temp_path("partial.ron");
        std::fs::write(&path, "(enable_validation: false)").expect("write ron");

        let loaded = RendererConfig::load_from_file(&path).expect("load ron");
        let _ = std::fs::remove_file(&path);

        assert!(!loaded.enable_validation);
        assert_eq!(loaded.application_name, RendererConfig::default().application_name);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let path = temp_path("renderer.json");
        std::fs::write(&path, "{}").expect("write json");

        let result = RendererConfig::load_from_file(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
