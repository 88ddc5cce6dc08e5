//! Spinning camera transform

use ash::vk;
use mesh_renderer::foundation::math::{Mat4, Mat4Ext, Vec3};
use mesh_renderer::prelude::{PushConstantBlock, TransformSource};
use std::time::Instant;

const FOV_Y: f32 = std::f32::consts::FRAC_PI_3;
const NEAR: f32 = 0.1;
const FAR: f32 = 100.0;

/// Rotates the mesh about Y in front of a fixed camera
pub struct SpinCamera {
    eye: Vec3,
    speed: f32,
    start: Instant,
}

impl SpinCamera {
    pub fn new(speed: f32) -> Self {
        Self {
            eye: Vec3::new(0.0, 0.4, 1.6),
            speed,
            start: Instant::now(),
        }
    }

    /// Push constants at `seconds` after start
    pub fn transform_at(&self, seconds: f32, extent: vk::Extent2D) -> PushConstantBlock {
        let aspect = if extent.height == 0 {
            1.0
        } else {
            extent.width as f32 / extent.height as f32
        };

        let projection = Mat4::perspective_rh_zo(FOV_Y, aspect, NEAR, FAR);
        let view = Mat4::look_at(self.eye, Vec3::zeros(), Vec3::y());
        let model = Mat4::rotation_y(seconds * self.speed);

        PushConstantBlock::new([seconds, aspect, 0.0, 0.0], (projection * view * model).to_cols_array())
    }
}

impl TransformSource for SpinCamera {
    fn next_transform(&mut self, extent: vk::Extent2D) -> PushConstantBlock {
        self.transform_at(self.start.elapsed().as_secs_f32(), extent)
    }
}
