//! Error types for texture management
//!
//! Every failure is logged where it happens; the error is still returned so the
//! caller can decide whether "no visible change" is good enough.

use crate::cache::AssetId;
use crate::format::PixelFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for texture operations
pub type TextureResult<T> = Result<T, TextureError>;

/// Errors reported by a [`GraphicsBackend`](crate::GraphicsBackend)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The requested size or format cannot be created on this device
    #[error("Unsupported image: {0}")]
    Unsupported(String),

    /// The device ran out of memory
    #[error("Out of device memory")]
    OutOfMemory,

    /// A map was requested on an allocation created without CPU write access
    #[error("Image is not CPU-writable")]
    NotWritable,

    /// Any other device-level failure
    #[error("Device error: {0}")]
    Device(String),
}

/// Errors produced while decoding image bytes into RGBA8 pixels
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not an image the decoder understands
    #[error("Failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors that can occur while creating, uploading or binding textures
#[derive(Error, Debug)]
pub enum TextureError {
    /// Source bytes could not be interpreted as an image
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The backend could not create the image or its view
    #[error("Texture allocation failed: {0}")]
    Allocation(#[source] BackendError),

    /// The backend could not map a writable allocation
    #[error("Failed to map texture for writing: {0}")]
    Map(#[source] BackendError),

    /// Width or height is zero
    #[error("Texture dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    /// The byte size of a `width` x `height` image does not fit in memory
    #[error("Texture size overflows: {width}x{height} {format:?}")]
    SizeOverflow {
        width: u32,
        height: u32,
        format: PixelFormat,
    },

    /// The source buffer holds fewer bytes than `width * height * bytes_per_pixel`
    #[error("Source buffer too small: expected {expected} bytes, got {actual}")]
    SourceTooSmall { expected: usize, actual: usize },

    /// An in-place update asked for a different format than the allocation uses
    #[error("Format mismatch: allocation is {allocated:?}, upload is {requested:?}")]
    FormatMismatch {
        allocated: PixelFormat,
        requested: PixelFormat,
    },

    /// The backend returned a mapped region that cannot hold the upload
    #[error("Mapped region too small: pitch {row_pitch} for rows of {row_bytes} bytes x {rows}")]
    MappedRegionTooSmall {
        row_pitch: usize,
        row_bytes: usize,
        rows: usize,
    },

    /// The handle does not refer to a live texture
    #[error("Unknown texture: {0}")]
    UnknownTexture(AssetId),
}

impl TextureError {
    /// True for failures that left the GPU side untouched apart from logging
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, TextureError::Allocation(_) | TextureError::Map(_))
    }
}
