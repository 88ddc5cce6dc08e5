//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the two projection helpers the renderer
//! needs to feed push constants.

pub use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a rotation matrix around the Y axis
    fn rotation_y(angle: f32) -> Mat4;

    /// Right-handed perspective projection with clip depth in `[0, 1]`
    ///
    /// The camera looks down -Z. Y is not flipped here: the frame recorder
    /// negates the viewport height instead.
    fn perspective_rh_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Column-major array layout as consumed by GLSL `mat4`
    fn to_cols_array(&self) -> [[f32; 4]; 4];
}

impl Mat4Ext for Mat4 {
    fn rotation_y(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::y_axis(), angle)
    }

    fn perspective_rh_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let focal = 1.0 / (fov_y * 0.5).tan();
        let depth_range = near - far;

        let mut result = Mat4::zeros();
        result[(0, 0)] = focal / aspect;
        result[(1, 1)] = focal;
        result[(2, 2)] = far / depth_range;
        result[(2, 3)] = near * far / depth_range;
        result[(3, 2)] = -1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    fn to_cols_array(&self) -> [[f32; 4]; 4] {
        let mut columns = [[0.0; 4]; 4];
        for (col, column) in columns.iter_mut().enumerate() {
            for (row, value) in column.iter_mut().enumerate() {
                *value = self[(row, col)];
            }
        }
        columns
    }
}
