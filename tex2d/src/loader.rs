//! Image decoding for the loader front-ends
//!
//! Loaders only need "bytes or path in, tightly packed RGBA8 out". The
//! [`Decoder`] trait is that boundary; [`ImageDecoder`] implements it with the
//! `image` crate.

use crate::error::DecodeError;
use std::path::Path;

/// Decoded pixels, always four 8-bit channels per pixel with no row padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wrap an `image` RGBA buffer
    pub fn from_rgba8(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }
}

/// Turns encoded image data into RGBA8 pixels
pub trait Decoder {
    /// Decode the file at `path`
    fn decode_file(&self, path: &Path) -> Result<DecodedImage, DecodeError>;

    /// Decode an in-memory encoded image
    fn decode_memory(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;
}

/// [`Decoder`] backed by the `image` crate
///
/// The container format is guessed from the content, not the file
/// extension. Source images with fewer channels are expanded to RGBA.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn decode_file(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        let bytes = std::fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode_memory(&bytes)
    }

    fn decode_memory(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let image = image::load_from_memory(bytes)?;
        Ok(DecodedImage::from_rgba8(image.into_rgba8()))
    }
}

impl<D: Decoder + ?Sized> Decoder for &D {
    fn decode_file(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        (**self).decode_file(path)
    }

    fn decode_memory(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        (**self).decode_memory(bytes)
    }
}
