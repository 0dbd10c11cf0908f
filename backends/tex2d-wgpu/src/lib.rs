//! WGPU backend for tex2d
//!
//! This crate implements [`tex2d::GraphicsBackend`] on top of WGPU so the
//! texture manager can drive real GPU allocations.
//!
//! # Features
//!
//! - **Immutable and dynamic images**: GPU-only images are never mapped;
//!   dynamic images get a CPU staging area flushed with `Queue::write_texture`
//! - **Aligned row pitch**: staging rows are padded to
//!   [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`], so uploads exercise the
//!   pitch-aware copy path
//! - **Slot table**: bound views are turned into bind groups a render pass
//!   can set directly
//!
//! # Example
//!
//! ```rust,no_run
//! use tex2d::{PixelFormat, TextureManager};
//! use tex2d_wgpu::{WgpuBackend, WgpuInitInfo};
//!
//! # fn example(device: wgpu::Device, queue: wgpu::Queue) -> Result<(), Box<dyn std::error::Error>> {
//! let backend = WgpuBackend::new(WgpuInitInfo::new(device, queue).with_slot_count(8));
//! let mut textures = TextureManager::new(backend);
//!
//! let brick = textures.create_from_file("assets/brick.png")?;
//! textures.bind(Some(brick), 0)?;
//!
//! // In your render pass:
//! // if let Some(group) = textures.backend().slot_bind_group(0) {
//! //     pass.set_bind_group(1, group, &[]);
//! // }
//! # Ok(())
//! # }
//! ```

// Module declarations
mod backend;
mod error;
mod format;

// Re-exports
pub use backend::*;
pub use error::*;
pub use format::*;
