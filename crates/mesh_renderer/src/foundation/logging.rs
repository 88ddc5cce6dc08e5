//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// `default_level` applies to every module; `RUST_LOG` directives are parsed
/// afterwards and take precedence. Calling this twice keeps the first logger.
pub fn init(default_level: log::LevelFilter) {
    let result = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}
