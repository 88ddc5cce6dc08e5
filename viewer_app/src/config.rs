//! Viewer configuration

use mesh_renderer::config::{Config, RendererConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Vulkan".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Everything the viewer reads from its config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowSettings,
    pub renderer: RendererConfig,
    /// `log` filter level used unless `RUST_LOG` overrides it
    pub log_level: String,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    /// RGBA texture file; a checkerboard is used when absent
    pub texture: Option<PathBuf>,
    /// Mesh rotation in radians per second
    pub spin_speed: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            renderer: RendererConfig {
                application_name: "Mesh Viewer".to_string(),
                ..RendererConfig::default()
            },
            log_level: "info".to_string(),
            vertex_shader: PathBuf::from("target/shaders/mesh.vert.spv"),
            fragment_shader: PathBuf::from("target/shaders/mesh.frag.spv"),
            texture: None,
            spin_speed: 0.8,
        }
    }
}

impl Config for ViewerConfig {}

impl ViewerConfig {
    /// Parsed log level, `Info` if the configured name is unknown
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("viewer_app_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.window.title, "Vulkan");
        assert_eq!((config.window.width, config.window.height), (1280, 720));
        assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
        assert!(config.texture.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let path = temp_path("viewer.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\ntexture = \"assets/crate.png\"\n\n[window]\nwidth = 640\n",
        )
        .unwrap();

        let config = ViewerConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.log_level_filter(), log::LevelFilter::Debug);
        assert_eq!(config.texture, Some(PathBuf::from("assets/crate.png")));
    }

    #[test]
    fn test_ron_round_trip() {
        let path = temp_path("viewer.ron");
        let mut config = ViewerConfig::default();
        config.spin_speed = 0.0;
        config.renderer.enable_validation = false;

        config.save_to_file(&path).unwrap();
        let loaded = ViewerConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_log_level_falls_back() {
        let config = ViewerConfig {
            log_level: "loud".to_string(),
            ..ViewerConfig::default()
        };
        assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
    }
}
