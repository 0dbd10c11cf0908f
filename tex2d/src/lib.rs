//! 2-D texture management for real-time renderers
//!
//! This crate turns raw pixel data (decoded image files or procedurally
//! generated buffers) into GPU-resident textures, keeps them in sync when
//! their contents or size change, and binds them to pipeline slots.
//!
//! # Features
//!
//! - **Upload state machine**: reuses an allocation when it can, reallocates
//!   when it must, and remembers when a texture needs CPU-writable memory
//! - **Pitch-aware copies**: in-place updates honour the row pitch the
//!   backend reports for mapped memory
//! - **Identity cache**: textures loaded under the same identifier are shared
//!   and reference counted
//! - **Backend agnostic**: everything device-specific sits behind
//!   [`GraphicsBackend`]; [`HeadlessBackend`] runs without a GPU
//!
//! # Example
//!
//! ```rust
//! use tex2d::{HeadlessBackend, PixelFormat, TextureManager, UploadOutcome};
//!
//! # fn main() -> Result<(), tex2d::TextureError> {
//! let mut textures = TextureManager::new(HeadlessBackend::new());
//!
//! let checker = textures.create(Some("checker"));
//! let pixels = vec![255u8; 32 * 32 * 4];
//! assert_eq!(
//!     textures.set_colors(checker, 32, 32, &pixels, PixelFormat::Rgba32)?,
//!     UploadOutcome::Created
//! );
//!
//! textures.bind(Some(checker), 0)?;
//! // ... draw ...
//! textures.bind(None, 0)?;
//!
//! textures.release(checker)?;
//! # Ok(())
//! # }
//! ```

// Module declarations
mod backend;
mod cache;
mod config;
mod error;
mod format;
mod headless;
mod loader;
mod manager;
mod texture;

// Re-exports
pub use backend::*;
pub use cache::*;
pub use config::*;
pub use error::*;
pub use format::*;
pub use headless::*;
pub use loader::*;
pub use manager::*;
pub use texture::*;
