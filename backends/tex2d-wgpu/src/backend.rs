//! WGPU implementation of the tex2d backend contract
//!
//! Images are plain `wgpu::Texture`s. WGPU has no host-mappable textures, so
//! dynamic images are written through a CPU staging area whose rows are
//! padded to [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`]; `unmap` flushes it with
//! `Queue::write_texture`.
//!
//! Binding a view to a slot builds a bind group (texture at binding 0,
//! sampler at binding 1) that render code fetches with
//! [`WgpuBackend::slot_bind_group`].

use crate::error::{InitError, InitResult};
use crate::format::{padded_row_pitch, wgpu_format};
use std::collections::HashMap;
use tex2d::{BackendError, BindFlags, GraphicsBackend, ImageDesc, ImageUsage, MappedImage, NativeFormat, ViewDesc};
use wgpu::*;

const DEFAULT_SLOT_COUNT: u32 = 16;

/// Initialization data for [`WgpuBackend`]
#[derive(Debug, Clone)]
pub struct WgpuInitInfo {
    pub device: Device,
    pub queue: Queue,
    /// Number of sampling slots exposed by [`WgpuBackend::slot_bind_group`]
    pub slot_count: u32,
    /// Prefix for debug labels of created objects
    pub label: Option<String>,
}

impl WgpuInitInfo {
    /// Create new initialization info with default slot count
    pub fn new(device: Device, queue: Queue) -> Self {
        Self {
            device,
            queue,
            slot_count: DEFAULT_SLOT_COUNT,
            label: None,
        }
    }

    /// Set the number of sampling slots
    pub fn with_slot_count(mut self, slot_count: u32) -> Self {
        self.slot_count = slot_count;
        self
    }

    /// Set the debug label prefix
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// GPU image created by [`WgpuBackend`]
#[derive(Debug)]
pub struct WgpuImage {
    texture: Texture,
    id: u64,
    usage: ImageUsage,
    format: NativeFormat,
    width: u32,
    height: u32,
}

impl WgpuImage {
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn usage(&self) -> ImageUsage {
        self.usage
    }

    pub fn format(&self) -> NativeFormat {
        self.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Sampling view created by [`WgpuBackend`]
#[derive(Debug)]
pub struct WgpuView {
    view: TextureView,
    id: u64,
    format: NativeFormat,
}

impl WgpuView {
    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// CPU side of a dynamic image
#[derive(Debug)]
struct Staging {
    bytes: Vec<u8>,
    row_pitch: usize,
}

#[derive(Debug)]
struct SlotBinding {
    view_id: u64,
    bind_group: BindGroup,
}

/// Sampler and layout for one class of sample types
#[derive(Debug)]
struct SamplingResources {
    sampler: Sampler,
    layout: BindGroupLayout,
}

impl SamplingResources {
    fn new(device: &Device, label: &str, filterable: bool) -> Self {
        let filter = if filterable {
            FilterMode::Linear
        } else {
            FilterMode::Nearest
        };
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        let sampler_binding = if filterable {
            SamplerBindingType::Filtering
        } else {
            SamplerBindingType::NonFiltering
        };
        let layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some(&format!("{label} Image Bind Group Layout")),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        multisampled: false,
                        sample_type: TextureSampleType::Float { filterable },
                        view_dimension: TextureViewDimension::D2,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(sampler_binding),
                    count: None,
                },
            ],
        });

        Self { sampler, layout }
    }
}

/// [`GraphicsBackend`] over a WGPU device and queue
#[derive(Debug)]
pub struct WgpuBackend {
    device: Device,
    queue: Queue,
    label: String,
    filtering: SamplingResources,
    // Rgba32Float is not filterable without an optional device feature.
    non_filtering: SamplingResources,
    slots: Vec<Option<SlotBinding>>,
    staging: HashMap<u64, Staging>,
    mapped: Option<u64>,
    next_id: u64,
    max_dimension: u32,
}

impl WgpuBackend {
    /// Create a backend over an existing device
    pub fn new(init_info: WgpuInitInfo) -> Self {
        let WgpuInitInfo {
            device,
            queue,
            slot_count,
            label,
        } = init_info;
        let label = label.unwrap_or_else(|| "tex2d".to_string());
        let filtering = SamplingResources::new(&device, &label, true);
        let non_filtering = SamplingResources::new(&device, &format!("{label} Unfiltered"), false);
        let max_dimension = device.limits().max_texture_dimension_2d;

        tracing::debug!(
            target: "tex2d-wgpu",
            "WGPU backend ready: {} slots, max texture dimension {}",
            slot_count,
            max_dimension
        );

        Self {
            device,
            queue,
            label,
            filtering,
            non_filtering,
            slots: (0..slot_count).map(|_| None).collect(),
            staging: HashMap::new(),
            mapped: None,
            next_id: 1,
            max_dimension,
        }
    }

    /// Acquire a device without a surface and create a backend over it
    ///
    /// Blocks on adapter and device requests; meant for tools and tests.
    pub fn headless(slot_count: u32) -> InitResult<Self> {
        let instance = Instance::new(InstanceDescriptor::new_without_display_handle());
        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| InitError::NoAdapter(e.to_string()))?;
        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor::default()))
            .map_err(|e| InitError::RequestDevice(e.to_string()))?;

        tracing::info!(target: "tex2d-wgpu", "Using adapter {:?}", adapter.get_info().name);
        Ok(Self::new(
            WgpuInitInfo::new(device, queue).with_slot_count(slot_count),
        ))
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Number of sampling slots
    pub fn slot_count(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Bind group for whatever is bound to `slot`
    pub fn slot_bind_group(&self, slot: u32) -> Option<&BindGroup> {
        self.slots
            .get(slot as usize)?
            .as_ref()
            .map(|binding| &binding.bind_group)
    }

    /// Layout of bind groups returned for filterable formats
    pub fn image_bind_group_layout(&self) -> &BindGroupLayout {
        &self.filtering.layout
    }

    /// Layout of bind groups returned for [`NativeFormat::Rgba32Float`] images
    pub fn unfiltered_image_bind_group_layout(&self) -> &BindGroupLayout {
        &self.non_filtering.layout
    }

    fn sampling_for(&self, format: NativeFormat) -> &SamplingResources {
        match format {
            NativeFormat::Rgba32Float => &self.non_filtering,
            NativeFormat::Rgba8Unorm | NativeFormat::Rgba16Float => &self.filtering,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn validate(&self, desc: &ImageDesc) -> Result<(), BackendError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::Unsupported(format!(
                "empty image {}x{}",
                desc.width, desc.height
            )));
        }
        if desc.width > self.max_dimension || desc.height > self.max_dimension {
            return Err(BackendError::Unsupported(format!(
                "{}x{} exceeds the device limit of {}",
                desc.width, desc.height, self.max_dimension
            )));
        }
        if desc.mip_levels != 1 || desc.array_layers != 1 || desc.sample_count != 1 {
            return Err(BackendError::Unsupported(
                "only single-mip, single-layer, single-sample images are supported".to_string(),
            ));
        }
        Ok(())
    }

    fn write_rows(&self, texture: &Texture, data: &[u8], row_pitch: usize, width: u32, height: u32) {
        self.queue.write_texture(
            TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            data,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row_pitch as u32),
                rows_per_image: Some(height),
            },
            Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

impl GraphicsBackend for WgpuBackend {
    type Image = WgpuImage;
    type View = WgpuView;

    fn create_image(
        &mut self,
        desc: &ImageDesc,
        initial: &[u8],
        row_pitch: usize,
    ) -> Result<WgpuImage, BackendError> {
        self.validate(desc)?;
        let row_bytes = desc.tight_row_pitch().ok_or_else(|| {
            BackendError::Unsupported(format!("{}x{} overflows the addressable size", desc.width, desc.height))
        })?;
        let rows = desc.height as usize;
        let covered = row_pitch
            .checked_mul(rows - 1)
            .and_then(|n| n.checked_add(row_bytes));
        if row_pitch < row_bytes || covered.is_none_or(|needed| initial.len() < needed) {
            return Err(BackendError::Device(format!(
                "initial data of {} bytes with pitch {} does not cover {}x{}",
                initial.len(),
                row_pitch,
                desc.width,
                desc.height
            )));
        }

        let id = self.allocate_id();
        let mut usage = TextureUsages::COPY_DST;
        if desc.bind.contains(BindFlags::SHADER_READ) {
            usage |= TextureUsages::TEXTURE_BINDING;
        }
        let texture = self.device.create_texture(&TextureDescriptor {
            label: Some(&format!("{} Image #{}", self.label, id)),
            size: Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: wgpu_format(desc.format),
            usage,
            view_formats: &[],
        });

        // write_texture needs every row, including the last, at full pitch
        // once the pitch is larger than the row.
        let padded = padded_row_pitch(row_bytes);
        if row_pitch == padded || row_pitch == row_bytes {
            let needed = row_pitch * rows;
            if initial.len() >= needed {
                self.write_rows(&texture, &initial[..needed], row_pitch, desc.width, desc.height);
            } else {
                let mut buf = vec![0u8; needed];
                buf[..initial.len()].copy_from_slice(initial);
                self.write_rows(&texture, &buf, row_pitch, desc.width, desc.height);
            }
        } else {
            let mut buf = vec![0u8; padded * rows];
            tex2d::copy_rows(&mut buf, padded, initial, row_pitch, row_bytes, rows)
                .map_err(|e| BackendError::Device(e.to_string()))?;
            self.write_rows(&texture, &buf, padded, desc.width, desc.height);
        }

        if desc.usage.is_cpu_writable() {
            self.staging.insert(
                id,
                Staging {
                    bytes: Vec::new(),
                    row_pitch: padded,
                },
            );
        }

        if cfg!(debug_assertions) {
            tracing::debug!(
                target: "tex2d-wgpu",
                "Create image #{}: {}x{} {:?} {:?}",
                id,
                desc.width,
                desc.height,
                desc.format,
                desc.usage
            );
        }

        Ok(WgpuImage {
            texture,
            id,
            usage: desc.usage,
            format: desc.format,
            width: desc.width,
            height: desc.height,
        })
    }

    fn create_view(&mut self, image: &WgpuImage, desc: &ViewDesc) -> Result<WgpuView, BackendError> {
        if desc.format != image.format {
            return Err(BackendError::Unsupported(format!(
                "view format {:?} differs from image format {:?}",
                desc.format, image.format
            )));
        }
        let view = image.texture.create_view(&TextureViewDescriptor {
            label: Some(&format!("{} View of #{}", self.label, image.id)),
            format: Some(wgpu_format(desc.format)),
            dimension: Some(TextureViewDimension::D2),
            base_mip_level: desc.base_mip_level,
            mip_level_count: Some(desc.mip_levels),
            ..Default::default()
        });
        let id = self.allocate_id();
        Ok(WgpuView {
            view,
            id,
            format: desc.format,
        })
    }

    fn map_for_write(&mut self, image: &WgpuImage) -> Result<MappedImage<'_>, BackendError> {
        if !image.usage.is_cpu_writable() {
            return Err(BackendError::NotWritable);
        }
        if let Some(mapped) = self.mapped {
            return Err(BackendError::Device(format!(
                "image #{} is already mapped",
                mapped
            )));
        }
        let staging = self
            .staging
            .get_mut(&image.id)
            .ok_or(BackendError::NotWritable)?;

        // Write-discard: the previous contents are not preserved.
        let size = staging.row_pitch * image.height as usize;
        staging.bytes.clear();
        staging.bytes.resize(size, 0);
        self.mapped = Some(image.id);

        Ok(MappedImage {
            data: &mut staging.bytes,
            row_pitch: staging.row_pitch,
        })
    }

    fn unmap(&mut self, image: &WgpuImage) {
        if self.mapped != Some(image.id) {
            tracing::warn!(target: "tex2d-wgpu", "unmap of image #{} that is not mapped", image.id);
            return;
        }
        self.mapped = None;
        if let Some(staging) = self.staging.get(&image.id) {
            self.write_rows(
                &image.texture,
                &staging.bytes,
                staging.row_pitch,
                image.width,
                image.height,
            );
        }
    }

    fn bind_to_slot(&mut self, view: Option<&WgpuView>, slot: u32) {
        if slot as usize >= self.slots.len() {
            tracing::warn!(
                target: "tex2d-wgpu",
                "slot {} out of range ({} slots); ignoring bind",
                slot,
                self.slots.len()
            );
            return;
        }

        let binding = view.map(|view| {
            let sampling = self.sampling_for(view.format);
            let bind_group = self.device.create_bind_group(&BindGroupDescriptor {
                label: Some(&format!("{} Slot {} Bind Group", self.label, slot)),
                layout: &sampling.layout,
                entries: &[
                    BindGroupEntry {
                        binding: 0,
                        resource: BindingResource::TextureView(&view.view),
                    },
                    BindGroupEntry {
                        binding: 1,
                        resource: BindingResource::Sampler(&sampling.sampler),
                    },
                ],
            });
            SlotBinding {
                view_id: view.id,
                bind_group,
            }
        });
        self.slots[slot as usize] = binding;
    }

    fn release_view(&mut self, view: WgpuView) {
        // Bind groups keep the view alive; drop the ones that reference it.
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|binding| binding.view_id == view.id) {
                *slot = None;
            }
        }
    }

    fn release_image(&mut self, image: WgpuImage) {
        self.staging.remove(&image.id);
        if self.mapped == Some(image.id) {
            self.mapped = None;
        }
        if cfg!(debug_assertions) {
            tracing::debug!(target: "tex2d-wgpu", "Destroy image #{}", image.id);
        }
        image.texture.destroy();
    }
}
