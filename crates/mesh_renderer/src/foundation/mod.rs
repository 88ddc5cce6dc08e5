//! Foundation utilities shared by the renderer and its host application

pub mod logging;
pub mod math;
