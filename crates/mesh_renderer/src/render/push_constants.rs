//! Per-frame push constant block

use bytemuck::{Pod, Zeroable};

/// Data pushed to the vertex stage once per frame
///
/// Matches the shader block `{ vec4 aux; mat4 transform; }` (80 bytes).
/// `transform` is column-major: `transform[c]` is column `c`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PushConstantBlock {
    /// Auxiliary values supplied by the transform source
    pub aux: [f32; 4],
    /// Projection * view * model
    pub transform: [[f32; 4]; 4],
}

impl PushConstantBlock {
    /// Byte size of the block, the size of the pipeline's push constant range
    pub const SIZE: u32 = std::mem::size_of::<Self>() as u32;

    /// Build a block from its parts
    pub fn new(aux: [f32; 4], transform: [[f32; 4]; 4]) -> Self {
        Self { aux, transform }
    }

    /// Identity transform, zero aux
    pub fn identity() -> Self {
        Self {
            aux: [0.0; 4],
            transform: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Raw bytes for `cmd_push_constants`
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for PushConstantBlock {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_is_80_bytes() {
        assert_eq!(PushConstantBlock::SIZE, 80);
        assert_eq!(PushConstantBlock::identity().as_bytes().len(), 80);
    }

    #[test]
    fn test_aux_precedes_transform() {
        let block = PushConstantBlock::new([1.0, 2.0, 3.0, 4.0], PushConstantBlock::identity().transform);
        let floats: &[f32] = bytemuck::cast_slice(block.as_bytes());

        assert_eq!(&floats[0..4], &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(floats[4], 1.0);
        assert_eq!(floats[5], 0.0);
        assert_eq!(floats[19], 1.0);
    }
}
