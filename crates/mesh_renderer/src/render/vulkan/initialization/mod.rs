//! Instance, window, surface and device setup

pub mod context;
pub mod device;
pub mod surface;
pub mod window;
