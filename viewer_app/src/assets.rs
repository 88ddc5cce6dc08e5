//! Mesh and texture provisioning

use mesh_renderer::prelude::{Mesh, TextureData, Vertex};
use std::path::Path;

use crate::error::{AppError, AppResult};

const LIGHT: [u8; 4] = [230, 230, 230, 255];
const DARK: [u8; 4] = [48, 10, 36, 255];

/// Decode an image file into RGBA8 texture data
pub fn load_texture(path: &Path) -> AppResult<TextureData> {
    let image = image::open(path)
        .map_err(|source| AppError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();

    let (width, height) = image.dimensions();
    log::info!("Loaded texture {:?} ({}x{})", path, width, height);
    Ok(TextureData::new(width, height, image.into_raw())?)
}

/// Configured texture, or a checkerboard when none is set
pub fn texture_or_default(path: Option<&Path>) -> AppResult<TextureData> {
    match path {
        Some(path) => load_texture(path),
        None => Ok(TextureData::checkerboard(8, LIGHT, DARK)?),
    }
}

/// Unit cube centred on the origin, four vertices per face
pub fn cube() -> AppResult<Mesh> {
    // (normal, u axis, v axis) per face
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u_axis, v_axis) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in corners {
            let position = [0, 1, 2].map(|i| 0.5 * (normal[i] + su * u_axis[i] + sv * v_axis[i]));
            let uv = [(su + 1.0) * 0.5, (1.0 - sv) * 0.5];
            vertices.push(Vertex::new(position, normal, uv));
        }
        indices.extend([base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    Ok(Mesh::new(vertices, indices)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_shape() {
        let cube = cube().unwrap();
        assert_eq!(cube.vertices().len(), 24);
        assert_eq!(cube.index_count(), 36);
        for vertex in cube.vertices() {
            for coord in vertex.position {
                assert_eq!(coord.abs(), 0.5);
            }
            assert!(vertex.uv.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn test_cube_triangles_face_outward() {
        let cube = cube().unwrap();
        let position = |i: u32| cube.vertices()[i as usize].position;

        for triangle in cube.indices().chunks(3) {
            let (a, b, c) = (position(triangle[0]), position(triangle[1]), position(triangle[2]));
            let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
            let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
            let cross = [u[1] * v[2] - u[2] * v[1], u[2] * v[0] - u[0] * v[2], u[0] * v[1] - u[1] * v[0]];
            let centroid = [0, 1, 2].map(|i| (a[i] + b[i] + c[i]) / 3.0);

            // Counter-clockwise from outside: the winding normal points away from the centre
            let outward: f32 = (0..3).map(|i| cross[i] * centroid[i]).sum();
            assert!(outward > 0.0, "triangle {:?} is wound inward", triangle);
        }
    }

    #[test]
    fn test_default_texture_is_checkerboard() {
        let texture = texture_or_default(None).unwrap();
        assert_eq!((texture.width(), texture.height()), (8, 8));
        assert_eq!(&texture.pixels()[0..4], &LIGHT);
        assert_eq!(&texture.pixels()[4..8], &DARK);
    }

    #[test]
    fn test_png_round_trip() {
        let path = std::env::temp_dir().join(format!("viewer_app_{}_texture.png", std::process::id()));
        let pixels = vec![255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 0];
        image::RgbaImage::from_raw(2, 2, pixels.clone()).unwrap().save(&path).unwrap();

        let texture = load_texture(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!((texture.width(), texture.height()), (2, 2));
        assert_eq!(texture.pixels(), pixels.as_slice());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let result = load_texture(Path::new("does/not/exist.png"));
        assert!(matches!(result, Err(AppError::Image { .. })));
    }
}
