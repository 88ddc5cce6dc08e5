//! Texture pixel data
//!
//! Flat RGBA8 pixels, validated before anything touches the GPU.

use thiserror::Error;

/// Texture validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// Width or height is zero
    #[error("Texture dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Pixel buffer length does not equal width * height * 4
    #[error("Texture {width}x{height} needs {expected} bytes, got {actual}")]
    SizeMismatch {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Required byte length
        expected: usize,
        /// Supplied byte length
        actual: usize,
    },
}

/// RGBA8 texture ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl TextureData {
    /// Bytes per RGBA8 texel
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Wrap an RGBA8 buffer, checking its length against the dimensions
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptyDimensions { width, height });
        }

        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL;
        if pixels.len() != expected {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self { width, height, pixels })
    }

    /// Checkerboard of `size` x `size` texels alternating between two colors
    pub fn checkerboard(size: u32, even: [u8; 4], odd: [u8; 4]) -> Result<Self, TextureError> {
        let pixels = (0..size)
            .flat_map(|y| (0..size).map(move |x| (x, y)))
            .flat_map(|(x, y)| if (x + y) % 2 == 0 { even } else { odd })
            .collect();
        Self::new(size, size, pixels)
    }

    /// Width in texels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, row-major
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Byte size of the pixel data
    pub fn byte_size(&self) -> u64 {
        self.pixels.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_exact_length() {
        let texture = TextureData::new(2, 3, vec![0; 24]).unwrap();
        assert_eq!(texture.width(), 2);
        assert_eq!(texture.height(), 3);
        assert_eq!(texture.byte_size(), 24);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(
            TextureData::new(2, 2, vec![0; 15]),
            Err(TextureError::SizeMismatch { width: 2, height: 2, expected: 16, actual: 15 })
        );
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        assert_eq!(
            TextureData::new(0, 4, Vec::new()),
            Err(TextureError::EmptyDimensions { width: 0, height: 4 })
        );
    }

    #[test]
    fn test_checkerboard_alternates() {
        let white = [255, 255, 255, 255];
        let black = [0, 0, 0, 255];
        let texture = TextureData::checkerboard(2, white, black).unwrap();

        assert_eq!(&texture.pixels()[0..4], &white);
        assert_eq!(&texture.pixels()[4..8], &black);
        assert_eq!(&texture.pixels()[8..12], &black);
        assert_eq!(&texture.pixels()[12..16], &white);
    }
}
