//! Graphics backend contract
//!
//! The texture state machine never talks to a device directly. It goes
//! through [`GraphicsBackend`], which a real renderer implements over its
//! device/context objects and tests implement over plain memory
//! (see [`HeadlessBackend`](crate::HeadlessBackend)).

use crate::error::BackendError;
use crate::format::NativeFormat;
use bitflags::bitflags;

/// Memory mode of an image allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageUsage {
    /// GPU-only memory, contents fixed at creation
    #[default]
    Default,
    /// CPU-writable memory that can be mapped with write-discard
    Dynamic,
}

impl ImageUsage {
    /// Whether images with this usage accept `map_for_write`
    pub fn is_cpu_writable(self) -> bool {
        matches!(self, ImageUsage::Dynamic)
    }
}

bitflags! {
    /// Pipeline stages an image can be bound to
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct BindFlags: u32 {
        /// Sampled from shaders
        const SHADER_READ = 1 << 0;
    }
}

/// Description of a 2-D image allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub sample_count: u32,
    pub format: NativeFormat,
    pub usage: ImageUsage,
    pub bind: BindFlags,
}

impl ImageDesc {
    /// Single-mip, single-layer, non-multisampled shader-readable image
    pub fn texture_2d(width: u32, height: u32, format: NativeFormat, usage: ImageUsage) -> Self {
        Self {
            width,
            height,
            mip_levels: 1,
            array_layers: 1,
            sample_count: 1,
            format,
            usage,
            bind: BindFlags::SHADER_READ,
        }
    }

    /// Row pitch of a tightly packed buffer for this image; `None` on overflow
    pub fn tight_row_pitch(&self) -> Option<usize> {
        self.format
            .bytes_per_pixel()
            .checked_mul(usize::try_from(self.width).ok()?)
    }
}

/// Description of a sampling view over an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewDesc {
    pub format: NativeFormat,
    pub base_mip_level: u32,
    pub mip_levels: u32,
}

impl ViewDesc {
    /// View covering every mip level of an image created from `desc`
    pub fn full(desc: &ImageDesc) -> Self {
        Self {
            format: desc.format,
            base_mip_level: 0,
            mip_levels: desc.mip_levels,
        }
    }
}

/// CPU-visible memory of a mapped image
///
/// `row_pitch` is the distance between scanlines in `data` and may be larger
/// than a tightly packed row.
#[derive(Debug)]
pub struct MappedImage<'a> {
    pub data: &'a mut [u8],
    pub row_pitch: usize,
}

/// Device operations the texture core relies on
///
/// All calls happen on the thread that owns the device and complete
/// synchronously from the caller's point of view.
pub trait GraphicsBackend {
    /// Owned image allocation
    type Image;
    /// Owned sampling view over an [`Image`](Self::Image)
    type View;

    /// Create an image whose initial contents are `initial`, laid out with `row_pitch`
    fn create_image(
        &mut self,
        desc: &ImageDesc,
        initial: &[u8],
        row_pitch: usize,
    ) -> Result<Self::Image, BackendError>;

    /// Create a view for sampling `image`
    fn create_view(&mut self, image: &Self::Image, desc: &ViewDesc)
    -> Result<Self::View, BackendError>;

    /// Map `image` for write-discard access; previous contents are undefined
    fn map_for_write(&mut self, image: &Self::Image) -> Result<MappedImage<'_>, BackendError>;

    /// Finish a write started with [`map_for_write`](Self::map_for_write)
    fn unmap(&mut self, image: &Self::Image);

    /// Attach `view` to a pipeline sampling slot, or clear the slot with `None`
    fn bind_to_slot(&mut self, view: Option<&Self::View>, slot: u32);

    /// Release a view
    fn release_view(&mut self, view: Self::View);

    /// Release an image; its views must have been released first
    fn release_image(&mut self, image: Self::Image);
}
