//! CPU-only graphics backend
//!
//! [`HeadlessBackend`] keeps image contents in plain memory. Rows are padded
//! to a configurable alignment, so mapped regions report a row pitch larger
//! than a tightly packed row just like real drivers do. It counts every call
//! and can be told to fail the next create, view or map, which makes it the
//! backend of choice for tests and offline tools.

use crate::backend::{GraphicsBackend, ImageDesc, ImageUsage, MappedImage, ViewDesc};
use crate::error::BackendError;
use crate::texture::copy_rows;
use std::collections::{BTreeMap, HashMap};

/// Byte written over an image's storage when it is mapped with write-discard
pub const DISCARD_FILL: u8 = 0xCD;

/// Configuration for [`HeadlessBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessConfig {
    /// Row pitch alignment in bytes (default: 256)
    pub row_alignment: usize,
    /// Largest width or height accepted (default: 16384)
    pub max_dimension: u32,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            row_alignment: 256,
            max_dimension: 16384,
        }
    }
}

impl HeadlessConfig {
    /// Set the row pitch alignment
    pub fn with_row_alignment(mut self, alignment: usize) -> Self {
        self.row_alignment = alignment.max(1);
        self
    }

    /// Set the largest accepted dimension
    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max;
        self
    }
}

/// Call counters of a [`HeadlessBackend`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub images_created: usize,
    pub images_released: usize,
    pub views_created: usize,
    pub views_released: usize,
    pub maps: usize,
    pub unmaps: usize,
    pub binds: usize,
}

/// Image handle issued by [`HeadlessBackend`]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HeadlessImage {
    id: u64,
    desc: ImageDesc,
}

impl HeadlessImage {
    /// Allocation identity; a recreated image always gets a new id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Description the image was created with
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }
}

/// View handle issued by [`HeadlessBackend`]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HeadlessView {
    id: u64,
    image_id: u64,
}

impl HeadlessView {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Id of the image this view samples
    pub fn image_id(&self) -> u64 {
        self.image_id
    }
}

#[derive(Debug)]
struct Storage {
    desc: ImageDesc,
    row_pitch: usize,
    bytes: Vec<u8>,
}

/// Graphics backend backed by system memory
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    config: HeadlessConfig,
    images: HashMap<u64, Storage>,
    views: HashMap<u64, u64>,
    slots: BTreeMap<u32, u64>,
    next_id: u64,
    stats: HeadlessStats,
    mapped: Option<u64>,
    fail_next_create: Option<BackendError>,
    fail_next_view: Option<BackendError>,
    fail_next_map: Option<BackendError>,
    short_next_map: Option<usize>,
}

impl HeadlessBackend {
    /// Backend with the default configuration
    pub fn new() -> Self {
        Self::with_config(HeadlessConfig::default())
    }

    /// Backend with a custom configuration
    pub fn with_config(config: HeadlessConfig) -> Self {
        Self {
            config,
            next_id: 1,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &HeadlessConfig {
        &self.config
    }

    /// Call counters so far
    pub fn stats(&self) -> HeadlessStats {
        self.stats
    }

    /// Number of images created and not yet released
    pub fn live_images(&self) -> usize {
        self.images.len()
    }

    /// Number of views created and not yet released
    pub fn live_views(&self) -> usize {
        self.views.len()
    }

    /// Make the next `create_image` fail with `error`
    pub fn fail_next_create(&mut self, error: BackendError) {
        self.fail_next_create = Some(error);
    }

    /// Make the next `create_view` fail with `error`
    pub fn fail_next_view(&mut self, error: BackendError) {
        self.fail_next_view = Some(error);
    }

    /// Make the next `map_for_write` fail with `error`
    pub fn fail_next_map(&mut self, error: BackendError) {
        self.fail_next_map = Some(error);
    }

    /// Make the next successful `map_for_write` report `row_pitch` and hand
    /// out only `row_pitch * height` bytes, like a driver with a narrower layout
    pub fn short_next_map(&mut self, row_pitch: usize) {
        self.short_next_map = Some(row_pitch);
    }

    /// Row pitch of a live image's storage
    pub fn row_pitch(&self, image: &HeadlessImage) -> Option<usize> {
        self.images.get(&image.id).map(|s| s.row_pitch)
    }

    /// Tightly packed copy of a live image's contents
    pub fn read_pixels(&self, image: &HeadlessImage) -> Option<Vec<u8>> {
        let storage = self.images.get(&image.id)?;
        let row_bytes = storage.desc.tight_row_pitch()?;
        let rows = storage.desc.height as usize;
        let mut out = vec![0u8; row_bytes.checked_mul(rows)?];
        copy_rows(&mut out, row_bytes, &storage.bytes, storage.row_pitch, row_bytes, rows).ok()?;
        Some(out)
    }

    /// Raw storage of a live image including row padding
    pub fn raw_storage(&self, image: &HeadlessImage) -> Option<&[u8]> {
        self.images.get(&image.id).map(|s| s.bytes.as_slice())
    }

    /// Id of the view bound to `slot`
    pub fn bound_view(&self, slot: u32) -> Option<u64> {
        self.slots.get(&slot).copied()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    fn aligned_pitch(&self, row_bytes: usize) -> usize {
        let align = self.config.row_alignment.max(1);
        row_bytes.div_ceil(align) * align
    }
}

impl GraphicsBackend for HeadlessBackend {
    type Image = HeadlessImage;
    type View = HeadlessView;

    fn create_image(
        &mut self,
        desc: &ImageDesc,
        initial: &[u8],
        row_pitch: usize,
    ) -> Result<HeadlessImage, BackendError> {
        if let Some(error) = self.fail_next_create.take() {
            return Err(error);
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::Unsupported(format!(
                "empty image {}x{}",
                desc.width, desc.height
            )));
        }
        if desc.width > self.config.max_dimension || desc.height > self.config.max_dimension {
            return Err(BackendError::Unsupported(format!(
                "{}x{} exceeds the maximum dimension {}",
                desc.width, desc.height, self.config.max_dimension
            )));
        }
        if desc.mip_levels != 1 || desc.array_layers != 1 || desc.sample_count != 1 {
            return Err(BackendError::Unsupported(
                "only single-mip, single-layer, single-sample images".to_string(),
            ));
        }

        let overflow = || {
            BackendError::Unsupported(format!(
                "{}x{} {:?} overflows the addressable size",
                desc.width, desc.height, desc.format
            ))
        };
        let row_bytes = desc.tight_row_pitch().ok_or_else(overflow)?;
        let rows = desc.height as usize;
        let pitch = self.aligned_pitch(row_bytes);
        let mut bytes = vec![0u8; pitch.checked_mul(rows).ok_or_else(overflow)?];
        copy_rows(&mut bytes, pitch, initial, row_pitch, row_bytes, rows)
            .map_err(|e| BackendError::Device(e.to_string()))?;

        let id = self.next_id();
        self.images.insert(
            id,
            Storage {
                desc: *desc,
                row_pitch: pitch,
                bytes,
            },
        );
        self.stats.images_created += 1;
        Ok(HeadlessImage { id, desc: *desc })
    }

    fn create_view(
        &mut self,
        image: &HeadlessImage,
        desc: &ViewDesc,
    ) -> Result<HeadlessView, BackendError> {
        if let Some(error) = self.fail_next_view.take() {
            return Err(error);
        }
        let storage = self
            .images
            .get(&image.id)
            .ok_or_else(|| BackendError::Device(format!("image {} was released", image.id)))?;
        if desc.format != storage.desc.format
            || desc.base_mip_level + desc.mip_levels > storage.desc.mip_levels
        {
            return Err(BackendError::Unsupported(
                "view does not match its image".to_string(),
            ));
        }

        let id = self.next_id();
        self.views.insert(id, image.id);
        self.stats.views_created += 1;
        Ok(HeadlessView {
            id,
            image_id: image.id,
        })
    }

    fn map_for_write(&mut self, image: &HeadlessImage) -> Result<MappedImage<'_>, BackendError> {
        if let Some(error) = self.fail_next_map.take() {
            return Err(error);
        }
        if self.mapped.is_some() {
            return Err(BackendError::Device("another image is mapped".to_string()));
        }
        let storage = self
            .images
            .get_mut(&image.id)
            .ok_or_else(|| BackendError::Device(format!("image {} was released", image.id)))?;
        if storage.desc.usage != ImageUsage::Dynamic {
            return Err(BackendError::NotWritable);
        }

        storage.bytes.fill(DISCARD_FILL);
        let (row_pitch, len) = match self.short_next_map.take() {
            Some(pitch) => {
                let rows = storage.desc.height as usize;
                (pitch, storage.bytes.len().min(pitch.saturating_mul(rows)))
            }
            None => (storage.row_pitch, storage.bytes.len()),
        };
        self.mapped = Some(image.id);
        self.stats.maps += 1;
        Ok(MappedImage {
            data: &mut storage.bytes[..len],
            row_pitch,
        })
    }

    fn unmap(&mut self, image: &HeadlessImage) {
        if self.mapped == Some(image.id) {
            self.mapped = None;
            self.stats.unmaps += 1;
        } else {
            tracing::warn!(target: "tex2d", "unmap of image {} which is not mapped", image.id);
        }
    }

    fn bind_to_slot(&mut self, view: Option<&HeadlessView>, slot: u32) {
        self.stats.binds += 1;
        match view {
            Some(view) => {
                self.slots.insert(slot, view.id);
            }
            None => {
                self.slots.remove(&slot);
            }
        }
    }

    fn release_view(&mut self, view: HeadlessView) {
        if self.views.remove(&view.id).is_some() {
            self.stats.views_released += 1;
        }
        self.slots.retain(|_, bound| *bound != view.id);
    }

    fn release_image(&mut self, image: HeadlessImage) {
        if self.views.values().any(|owner| *owner == image.id) {
            tracing::warn!(target: "tex2d", "image {} released while views are alive", image.id);
        }
        if self.images.remove(&image.id).is_some() {
            self.stats.images_released += 1;
        }
        if self.mapped == Some(image.id) {
            self.mapped = None;
        }
    }
}
