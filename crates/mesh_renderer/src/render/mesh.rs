//! Mesh data
//!
//! Pre-triangulated geometry as it is laid out in the vertex storage buffer.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Mesh validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// The mesh has no vertices
    #[error("Mesh has no vertices")]
    NoVertices,

    /// The mesh has no indices
    #[error("Mesh has no indices")]
    NoIndices,

    /// Index count is not a whole number of triangles
    #[error("Index count {count} is not a multiple of 3")]
    NotTriangulated {
        /// Number of indices supplied
        count: usize,
    },

    /// An index points past the end of the vertex array
    #[error("Index {index} at position {position} exceeds vertex count {vertex_count}")]
    IndexOutOfRange {
        /// Offending index value
        index: u32,
        /// Position of the index in the index array
        position: usize,
        /// Number of vertices in the mesh
        vertex_count: usize,
    },
}

/// Vertex as read by the vertex shader from binding 0
///
/// Six tightly packed 4-byte words: three position floats, the packed normal,
/// two uv floats. Shaders read it as scalars (`float px, py, pz; uint normal;
/// float u, v;`), since a std430 `vec3` member would pad the stride to 32.
///
/// Triangles are front facing when counter-clockwise seen from outside.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub position: [f32; 3],
    /// Normal packed as four signed 8-bit components (xyz, w unused)
    pub normal: u32,
    /// Texture coordinates
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a vertex from an unpacked normal
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal: pack_normal(normal),
            uv,
        }
    }
}

/// Pack a unit normal into 8-bit snorm components, x in the lowest byte
pub fn pack_normal(normal: [f32; 3]) -> u32 {
    let quantize = |v: f32| -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let q = (v.clamp(-1.0, 1.0) * 127.0).round() as i8;
        u32::from(q.to_ne_bytes()[0])
    };
    quantize(normal[0]) | (quantize(normal[1]) << 8) | (quantize(normal[2]) << 16)
}

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh, rejecting empty or malformed index data
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self, MeshError> {
        if vertices.is_empty() {
            return Err(MeshError::NoVertices);
        }
        if indices.is_empty() {
            return Err(MeshError::NoIndices);
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::NotTriangulated { count: indices.len() });
        }
        if let Some((position, &index)) = indices
            .iter()
            .enumerate()
            .find(|&(_, &index)| index as usize >= vertices.len())
        {
            return Err(MeshError::IndexOutOfRange {
                index,
                position,
                vertex_count: vertices.len(),
            });
        }

        Ok(Self { vertices, indices })
    }

    /// Unit quad in the XY plane facing +Z, two triangles
    pub fn quad() -> Self {
        let normal = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-0.5, -0.5, 0.0], normal, [0.0, 1.0]),
            Vertex::new([0.5, -0.5, 0.0], normal, [1.0, 1.0]),
            Vertex::new([0.5, 0.5, 0.0], normal, [1.0, 0.0]),
            Vertex::new([-0.5, 0.5, 0.0], normal, [0.0, 0.0]),
        ];
        Self {
            vertices,
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Vertex array
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Index array
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of indices drawn per frame
    pub fn index_count(&self) -> u32 {
        u32::try_from(self.indices.len()).unwrap_or(u32::MAX)
    }

    /// Vertex data as raw bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as raw bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
