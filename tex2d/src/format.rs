//! Pixel format catalog
//!
//! Maps the abstract [`PixelFormat`] an application uploads with to the
//! [`NativeFormat`] a backend allocates, and to the byte size of one pixel.
//! Both lookups are total: anything unrecognized falls back to 8-bit RGBA.

/// Pixel layout of a source buffer handed to an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    /// Four 8-bit unsigned normalized channels
    #[default]
    Rgba32,
    /// Four 16-bit float channels
    Rgba64,
    /// Four 32-bit float channels
    Rgba128,
    /// A raw format value this catalog does not know
    Unknown(u32),
}

impl PixelFormat {
    /// Convert a raw format value (0 = rgba32, 1 = rgba64, 2 = rgba128)
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => PixelFormat::Rgba32,
            1 => PixelFormat::Rgba64,
            2 => PixelFormat::Rgba128,
            other => PixelFormat::Unknown(other),
        }
    }

    /// Backend format this pixel format is allocated as
    pub fn native(self) -> NativeFormat {
        native_format(self)
    }

    /// Size of one pixel in bytes
    pub fn bytes_per_pixel(self) -> usize {
        bytes_per_pixel(self)
    }
}

/// GPU-side texel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NativeFormat {
    #[default]
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
}

impl NativeFormat {
    /// Size of one texel in bytes
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            NativeFormat::Rgba8Unorm => 4,
            NativeFormat::Rgba16Float => 8,
            NativeFormat::Rgba32Float => 16,
        }
    }
}

/// Native format for `format`; unknown values map to [`NativeFormat::Rgba8Unorm`]
pub fn native_format(format: PixelFormat) -> NativeFormat {
    match format {
        PixelFormat::Rgba32 => NativeFormat::Rgba8Unorm,
        PixelFormat::Rgba64 => NativeFormat::Rgba16Float,
        PixelFormat::Rgba128 => NativeFormat::Rgba32Float,
        PixelFormat::Unknown(_) => NativeFormat::Rgba8Unorm,
    }
}

/// Bytes per pixel for `format`, always in agreement with [`native_format`]
pub fn bytes_per_pixel(format: PixelFormat) -> usize {
    native_format(format).bytes_per_pixel()
}

/// Row pitch of a tightly packed buffer; `None` if it does not fit in `usize`
pub fn tight_row_pitch(format: PixelFormat, width: u32) -> Option<usize> {
    bytes_per_pixel(format).checked_mul(usize::try_from(width).ok()?)
}

/// Byte size of a tightly packed `width` x `height` buffer
pub fn image_byte_size(format: PixelFormat, width: u32, height: u32) -> Option<usize> {
    tight_row_pitch(format, width)?.checked_mul(usize::try_from(height).ok()?)
}
