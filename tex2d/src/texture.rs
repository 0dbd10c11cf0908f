//! Texture state and the upload state machine
//!
//! A [`Texture`] owns at most one image/view pair on the backend. Every call
//! to [`Texture::set_colors`] either writes into the existing allocation or
//! replaces it, following these rules:
//!
//! - a change of width or height always reallocates;
//! - an allocation that is not CPU-writable is reallocated, because it
//!   cannot be mapped;
//! - once an allocation has been replaced, every later allocation is made
//!   CPU-writable (`mutable_memory`), so alternating same-size updates do not
//!   bounce between reallocation and failed maps.

use crate::backend::{GraphicsBackend, ImageDesc, ImageUsage, ViewDesc};
use crate::config::{FormatChangePolicy, TextureConfig};
use crate::error::{BackendError, TextureError, TextureResult};
use crate::format::{self, NativeFormat, PixelFormat};
use std::fmt;

/// Result of a successful upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// First allocation of this texture
    Created,
    /// An existing allocation was replaced
    Recreated,
    /// Pixels were written into the existing allocation
    Updated,
}

/// A validated `set_colors` request
struct Upload<'a> {
    width: u32,
    height: u32,
    row_bytes: usize,
    source: &'a [u8],
    format: PixelFormat,
}

/// Image and view allocated together
///
/// Keeping both in one value makes "a view exists iff an image exists"
/// hold by construction.
pub struct GpuImage<B: GraphicsBackend> {
    pub image: B::Image,
    pub view: B::View,
    pub usage: ImageUsage,
    pub format: PixelFormat,
}

/// A 2-D texture and its GPU allocation
pub struct Texture<B: GraphicsBackend> {
    identifier: Option<String>,
    width: u32,
    height: u32,
    gpu: Option<GpuImage<B>>,
    mutable_memory: bool,
}

impl<B: GraphicsBackend> fmt::Debug for Texture<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("identifier", &self.identifier)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("usage", &self.usage())
            .field("pixel_format", &self.pixel_format())
            .field("mutable_memory", &self.mutable_memory)
            .finish()
    }
}

impl<B: GraphicsBackend> Default for Texture<B> {
    fn default() -> Self {
        Self {
            identifier: None,
            width: 0,
            height: 0,
            gpu: None,
            mutable_memory: false,
        }
    }
}

impl<B: GraphicsBackend> Texture<B> {
    /// Create an empty texture with no GPU resources
    pub fn new(identifier: Option<&str>) -> Self {
        Self {
            identifier: identifier.filter(|s| !s.is_empty()).map(str::to_owned),
            ..Self::default()
        }
    }

    /// Identifier used for deduplication, if any
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Width of the current allocation in pixels (0 before the first upload)
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the current allocation in pixels (0 before the first upload)
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Format of the current allocation
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.gpu.as_ref().map(|g| g.format)
    }

    /// Whether later allocations are created CPU-writable
    pub fn is_mutable(&self) -> bool {
        self.mutable_memory
    }

    /// Whether an image (and therefore a view) is allocated
    pub fn is_allocated(&self) -> bool {
        self.gpu.is_some()
    }

    /// Backend image, if allocated
    pub fn image(&self) -> Option<&B::Image> {
        self.gpu.as_ref().map(|g| &g.image)
    }

    /// Sampling view, if allocated
    pub fn view(&self) -> Option<&B::View> {
        self.gpu.as_ref().map(|g| &g.view)
    }

    /// Usage the current allocation was created with
    pub fn usage(&self) -> Option<ImageUsage> {
        self.gpu.as_ref().map(|g| g.usage)
    }

    /// Native format for `format`
    pub fn get_native_format(format: PixelFormat) -> NativeFormat {
        format::native_format(format)
    }

    /// Byte size of one pixel of `format`
    pub fn format_byte_size(format: PixelFormat) -> usize {
        format::bytes_per_pixel(format)
    }

    /// Replace the texture contents with `source`, a tightly packed buffer of
    /// `width * height` pixels in `format`
    pub fn set_colors(
        &mut self,
        backend: &mut B,
        config: &TextureConfig,
        width: u32,
        height: u32,
        source: &[u8],
        format: PixelFormat,
    ) -> TextureResult<UploadOutcome> {
        if width == 0 || height == 0 {
            tracing::warn!(target: "tex2d", "set_colors: rejected empty size {}x{}", width, height);
            return Err(TextureError::EmptyDimensions { width, height });
        }
        let (Some(row_bytes), Some(expected)) = (
            format::tight_row_pitch(format, width),
            format::image_byte_size(format, width, height),
        ) else {
            tracing::warn!(
                target: "tex2d",
                "set_colors: {}x{} {:?} overflows the addressable size",
                width, height, format
            );
            return Err(TextureError::SizeOverflow {
                width,
                height,
                format,
            });
        };
        if source.len() < expected {
            tracing::warn!(
                target: "tex2d",
                "set_colors: source holds {} bytes, {}x{} {:?} needs {}",
                source.len(), width, height, format, expected
            );
            return Err(TextureError::SourceTooSmall {
                expected,
                actual: source.len(),
            });
        }

        let upload = Upload {
            width,
            height,
            row_bytes,
            source,
            format,
        };
        if self.needs_recreate(config, &upload) {
            self.recreate(backend, config, &upload)
        } else {
            self.update_in_place(backend, &upload)
        }
    }

    fn needs_recreate(&self, config: &TextureConfig, upload: &Upload<'_>) -> bool {
        let Some(gpu) = &self.gpu else {
            return true;
        };
        upload.width != self.width
            || upload.height != self.height
            || !gpu.usage.is_cpu_writable()
            || (config.format_change == FormatChangePolicy::Recreate && gpu.format != upload.format)
    }

    fn recreate(
        &mut self,
        backend: &mut B,
        config: &TextureConfig,
        upload: &Upload<'_>,
    ) -> TextureResult<UploadOutcome> {
        let &Upload {
            width,
            height,
            row_bytes,
            source,
            format,
        } = upload;
        let replacing = self.gpu.is_some();
        let writable = self.mutable_memory || (replacing && config.upgrade_to_dynamic);
        let usage = if writable {
            ImageUsage::Dynamic
        } else {
            ImageUsage::Default
        };

        let desc = ImageDesc::texture_2d(width, height, format::native_format(format), usage);

        tracing::debug!(
            target: "tex2d",
            "{} texture {:?}: {}x{} {:?} usage={:?}",
            if replacing { "Recreate" } else { "Create" },
            self.identifier, width, height, desc.format, usage
        );

        // The old allocation is only released once the new pair exists, so a
        // failed create leaves the texture exactly as it was.
        let image = backend.create_image(&desc, source, row_bytes).map_err(|e| {
            tracing::error!(target: "tex2d", "Create texture error for {:?}: {}", self.identifier, e);
            TextureError::Allocation(e)
        })?;
        let view = match backend.create_view(&image, &ViewDesc::full(&desc)) {
            Ok(view) => view,
            Err(e) => {
                tracing::error!(target: "tex2d", "Create texture view error for {:?}: {}", self.identifier, e);
                backend.release_image(image);
                return Err(TextureError::Allocation(e));
            }
        };

        if let Some(old) = self.gpu.take() {
            backend.release_view(old.view);
            backend.release_image(old.image);
        }
        self.gpu = Some(GpuImage {
            image,
            view,
            usage,
            format,
        });
        self.mutable_memory = writable;
        self.width = width;
        self.height = height;

        Ok(if replacing {
            UploadOutcome::Recreated
        } else {
            UploadOutcome::Created
        })
    }

    fn update_in_place(
        &mut self,
        backend: &mut B,
        upload: &Upload<'_>,
    ) -> TextureResult<UploadOutcome> {
        let &Upload {
            width,
            height,
            row_bytes,
            source,
            format,
        } = upload;
        let Some(gpu) = &self.gpu else {
            return Err(TextureError::Allocation(BackendError::Device(
                "no allocation to update".to_string(),
            )));
        };
        if gpu.format != format {
            tracing::warn!(
                target: "tex2d",
                "set_colors on {:?}: allocation is {:?}, upload is {:?}",
                self.identifier, gpu.format, format
            );
            return Err(TextureError::FormatMismatch {
                allocated: gpu.format,
                requested: format,
            });
        }

        self.width = width;
        self.height = height;

        let rows = height as usize;

        let copied = {
            let mapped = backend.map_for_write(&gpu.image).map_err(|e| {
                tracing::error!(target: "tex2d", "Failed mapping texture {:?}: {}", self.identifier, e);
                TextureError::Map(e)
            })?;
            copy_rows(mapped.data, mapped.row_pitch, source, row_bytes, row_bytes, rows)
        };
        backend.unmap(&gpu.image);

        copied.inspect_err(|e| {
            tracing::error!(target: "tex2d", "Upload into {:?} failed: {}", self.identifier, e);
        })?;
        Ok(UploadOutcome::Updated)
    }

    /// Attach this texture's view to `slot`; a texture without an allocation clears it
    pub fn bind(&self, backend: &mut B, slot: u32) {
        tracing::trace!(target: "tex2d", "bind {:?} -> slot {}", self.identifier, slot);
        backend.bind_to_slot(self.view(), slot);
    }

    /// Release the view, then the image, and reset to the empty state
    pub fn destroy(&mut self, backend: &mut B) {
        if let Some(gpu) = self.gpu.take() {
            tracing::debug!(target: "tex2d", "Destroy texture {:?}", self.identifier);
            backend.release_view(gpu.view);
            backend.release_image(gpu.image);
        }
        *self = Self::default();
    }
}

/// Copy `rows` scanlines of `row_bytes` bytes between buffers with
/// independent row pitches
///
/// Bytes of `dst` between the end of one row and the start of the next are
/// left untouched.
pub fn copy_rows(
    dst: &mut [u8],
    dst_pitch: usize,
    src: &[u8],
    src_pitch: usize,
    row_bytes: usize,
    rows: usize,
) -> TextureResult<()> {
    if rows == 0 || row_bytes == 0 {
        return Ok(());
    }
    let too_small = || TextureError::MappedRegionTooSmall {
        row_pitch: dst_pitch,
        row_bytes,
        rows,
    };
    let span = |pitch: usize| {
        pitch
            .checked_mul(rows - 1)
            .and_then(|n| n.checked_add(row_bytes))
    };
    match span(dst_pitch) {
        Some(needed) if dst_pitch >= row_bytes && dst.len() >= needed => {}
        _ => return Err(too_small()),
    }
    match span(src_pitch) {
        Some(needed) if src_pitch >= row_bytes && src.len() >= needed => {}
        needed => {
            return Err(TextureError::SourceTooSmall {
                expected: needed.unwrap_or(usize::MAX),
                actual: src.len(),
            });
        }
    }

    for row in 0..rows {
        let dst_off = row * dst_pitch;
        let src_off = row * src_pitch;
        dst[dst_off..dst_off + row_bytes].copy_from_slice(&src[src_off..src_off + row_bytes]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_rows_respects_destination_pitch() {
        // 2x2 RGBA source, destination pitch of 12 bytes (one pixel of padding)
        let src: [u8; 16] = [
            1, 2, 3, 4, 5, 6, 7, 8, //
            9, 10, 11, 12, 13, 14, 15, 16,
        ];
        let mut dst = [0xAAu8; 24];
        copy_rows(&mut dst, 12, &src, 8, 8, 2).expect("copy");

        assert_eq!(&dst[0..8], &src[0..8]);
        assert_eq!(&dst[8..12], &[0xAA; 4]);
        assert_eq!(&dst[12..20], &src[8..16]);
        assert_eq!(&dst[20..24], &[0xAA; 4]);
    }

    #[test]
    fn copy_rows_accepts_unpadded_last_row() {
        let src = [7u8; 8];
        let mut dst = [0u8; 16 + 4];
        copy_rows(&mut dst, 16, &src, 4, 4, 2).expect("copy");
        assert_eq!(&dst[0..4], &[7; 4]);
        assert_eq!(&dst[16..20], &[7; 4]);
    }

    #[test]
    fn copy_rows_rejects_narrow_destination() {
        let src = [0u8; 16];
        let mut dst = [0u8; 16];
        let err = copy_rows(&mut dst, 4, &src, 8, 8, 2).unwrap_err();
        assert!(matches!(err, TextureError::MappedRegionTooSmall { .. }));

        let err = copy_rows(&mut dst[..10], 8, &src, 8, 8, 2).unwrap_err();
        assert!(matches!(err, TextureError::MappedRegionTooSmall { .. }));
    }

    #[test]
    fn copy_rows_rejects_short_source() {
        let src = [0u8; 10];
        let mut dst = [0u8; 32];
        let err = copy_rows(&mut dst, 16, &src, 8, 8, 2).unwrap_err();
        assert!(matches!(
            err,
            TextureError::SourceTooSmall {
                expected: 16,
                actual: 10
            }
        ));
    }

    #[test]
    fn copy_rows_with_nothing_to_copy_is_ok() {
        let mut dst: [u8; 0] = [];
        copy_rows(&mut dst, 0, &[], 0, 0, 4).expect("empty copy");
        copy_rows(&mut dst, 0, &[], 0, 16, 0).expect("zero rows");
    }
}
