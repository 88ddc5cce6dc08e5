//! Mesh viewer
//!
//! Opens a window and draws a spinning textured cube until Escape is pressed
//! or the window is closed. `R` reloads the texture.
//!
//! Usage: `mesh_viewer [config.toml|config.ron]`

mod assets;
mod backend;
mod camera;
mod config;
mod error;

use mesh_renderer::config::Config;
use mesh_renderer::foundation::logging;
use mesh_renderer::prelude::{run_frame_loop, FrameStats};
use std::process::ExitCode;

use backend::ViewerBackend;
use camera::SpinCamera;
use config::ViewerConfig;
use error::AppResult;

fn load_config() -> AppResult<ViewerConfig> {
    match std::env::args().nth(1) {
        Some(path) => Ok(ViewerConfig::load_from_file(path)?),
        None => Ok(ViewerConfig::default()),
    }
}

fn run(config: &ViewerConfig) -> AppResult<FrameStats> {
    let mut backend = ViewerBackend::new(config)?;
    let mut camera = SpinCamera::new(config.spin_speed);
    Ok(run_frame_loop(&mut backend, &mut camera)?)
}

fn main() -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init(log::LevelFilter::Info);
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log_level_filter());

    log::info!("Starting mesh viewer");
    match run(&config) {
        Ok(stats) => {
            log::info!("Mesh viewer finished after {} frames", stats.frames_presented);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}
