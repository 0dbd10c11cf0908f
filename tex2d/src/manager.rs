//! Texture manager: identity cache, loaders, binding and teardown
//!
//! [`TextureManager`] is the entry point applications use. It owns the
//! graphics backend and a registry of textures keyed by identifier, and
//! routes every operation on a [`TextureId`] to the right [`Texture`].
//! One manager is created at startup and lives on the render thread.

use crate::backend::GraphicsBackend;
use crate::cache::{AssetId, AssetRegistry, Released};
use crate::config::TextureConfig;
use crate::error::{TextureError, TextureResult};
use crate::format::PixelFormat;
use crate::loader::{DecodedImage, Decoder, ImageDecoder};
use crate::texture::{Texture, UploadOutcome};
use std::cell::Cell;
use std::marker::PhantomData;
use std::path::Path;

/// Handle to a texture owned by a [`TextureManager`]
pub type TextureId = AssetId;

/// Owns the backend and every texture created through it
pub struct TextureManager<B: GraphicsBackend, D: Decoder = ImageDecoder> {
    backend: B,
    decoder: D,
    config: TextureConfig,
    textures: AssetRegistry<Texture<B>>,
    // Single-threaded by contract: shareable only behind external synchronization.
    _not_sync: PhantomData<Cell<()>>,
}

impl<B: GraphicsBackend> TextureManager<B> {
    /// Create a manager that decodes with [`ImageDecoder`]
    pub fn new(backend: B) -> Self {
        Self::with_decoder(backend, ImageDecoder)
    }
}

impl<B: GraphicsBackend, D: Decoder> TextureManager<B, D> {
    /// Create a manager with a custom decoder
    pub fn with_decoder(backend: B, decoder: D) -> Self {
        Self {
            backend,
            decoder,
            config: TextureConfig::default(),
            textures: AssetRegistry::new(),
            _not_sync: PhantomData,
        }
    }

    /// Replace the upload configuration
    pub fn with_config(mut self, config: TextureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TextureConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Allocate an empty texture (no GPU resources yet)
    ///
    /// If `identifier` already names a live texture, that texture is returned
    /// with one more reference.
    pub fn create(&mut self, identifier: Option<&str>) -> TextureId {
        self.textures.allocate(identifier, Texture::new(identifier))
    }

    /// Look up a texture by identifier, adding a reference on a hit
    pub fn find(&mut self, identifier: &str) -> Option<TextureId> {
        self.textures.find(identifier)
    }

    /// Load a texture from an image file, keyed by its path
    ///
    /// A path that is already loaded returns the cached texture without
    /// reading the file again. UTF-8 paths are keyed by their text; see
    /// [`path_identifier`] for the others.
    pub fn create_from_file(&mut self, path: impl AsRef<Path>) -> TextureResult<TextureId> {
        let path = path.as_ref();
        let identifier = path_identifier(path);
        if let Some(id) = self.find(&identifier) {
            tracing::debug!(target: "tex2d", "create_from_file: cache hit for '{}' -> {}", identifier, id);
            return Ok(id);
        }

        let decoded = self.decoder.decode_file(path).inspect_err(|e| {
            tracing::warn!(target: "tex2d", "Failed to load texture '{}': {}", identifier, e);
        })?;
        self.register_decoded(&identifier, decoded)
    }

    /// Load a texture from encoded image bytes, keyed by `identifier`
    pub fn create_from_memory(&mut self, identifier: &str, bytes: &[u8]) -> TextureResult<TextureId> {
        if let Some(id) = self.find(identifier) {
            tracing::debug!(target: "tex2d", "create_from_memory: cache hit for '{}' -> {}", identifier, id);
            return Ok(id);
        }

        let decoded = self.decoder.decode_memory(bytes).inspect_err(|e| {
            tracing::warn!(target: "tex2d", "Failed to decode texture '{}': {}", identifier, e);
        })?;
        self.register_decoded(identifier, decoded)
    }

    fn register_decoded(&mut self, identifier: &str, decoded: DecodedImage) -> TextureResult<TextureId> {
        let id = self.create(Some(identifier));
        let uploaded = self.set_colors(
            id,
            decoded.width,
            decoded.height,
            &decoded.pixels,
            PixelFormat::Rgba32,
        );
        drop(decoded);

        match uploaded {
            Ok(_) => Ok(id),
            Err(e) => {
                // Nothing outside this call has seen the handle yet.
                self.release(id)?;
                Err(e)
            }
        }
    }

    /// Upload `source` into a texture, reallocating it when needed
    pub fn set_colors(
        &mut self,
        id: TextureId,
        width: u32,
        height: u32,
        source: &[u8],
        format: PixelFormat,
    ) -> TextureResult<UploadOutcome> {
        let texture = self
            .textures
            .get_mut(id)
            .ok_or(TextureError::UnknownTexture(id))?;
        texture.set_colors(&mut self.backend, &self.config, width, height, source, format)
    }

    /// Attach a texture to a sampling slot; `None` clears the slot
    pub fn bind(&mut self, id: Option<TextureId>, slot: u32) -> TextureResult<()> {
        match id {
            Some(id) => {
                let texture = self.textures.get(id).ok_or(TextureError::UnknownTexture(id))?;
                texture.bind(&mut self.backend, slot);
            }
            None => {
                tracing::trace!(target: "tex2d", "unbind slot {}", slot);
                self.backend.bind_to_slot(None, slot);
            }
        }
        Ok(())
    }

    /// Add a reference for a caller that shares `id`
    pub fn add_ref(&mut self, id: TextureId) -> TextureResult<()> {
        if self.textures.add_ref(id) {
            Ok(())
        } else {
            Err(TextureError::UnknownTexture(id))
        }
    }

    /// Drop one reference; the last one destroys the texture
    ///
    /// Returns `true` if this call destroyed it.
    pub fn release(&mut self, id: TextureId) -> TextureResult<bool> {
        match self.textures.release(id) {
            Some(Released::Alive { remaining }) => {
                tracing::trace!(target: "tex2d", "release {}: {} references left", id, remaining);
                Ok(false)
            }
            Some(Released::Last(mut texture)) => {
                texture.destroy(&mut self.backend);
                Ok(true)
            }
            None => Err(TextureError::UnknownTexture(id)),
        }
    }

    /// Borrow a live texture
    pub fn texture(&self, id: TextureId) -> Option<&Texture<B>> {
        self.textures.get(id)
    }

    /// Current reference count of a live texture
    pub fn ref_count(&self, id: TextureId) -> Option<u32> {
        self.textures.ref_count(id)
    }

    /// Whether `identifier` names a live texture (does not add a reference)
    pub fn contains(&self, identifier: &str) -> bool {
        self.textures.contains_identifier(identifier)
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Destroy every texture regardless of outstanding references
    pub fn shutdown(&mut self) {
        let remaining = self.textures.len();
        if remaining > 0 {
            tracing::debug!(target: "tex2d", "Shutting down with {} live textures", remaining);
        }
        let textures: Vec<_> = self.textures.drain().collect();
        for (_, mut texture) in textures {
            texture.destroy(&mut self.backend);
        }
    }
}

/// Cache identifier for a file path
///
/// UTF-8 paths map to their own text. Any other path maps to a NUL followed
/// by its escaped platform bytes; real paths cannot contain NUL, so distinct
/// paths never share an identifier.
pub fn path_identifier(path: &Path) -> String {
    match path.to_str() {
        Some(text) => text.to_owned(),
        None => format!(
            "\0{}",
            path.as_os_str().as_encoded_bytes().escape_ascii()
        ),
    }
}

impl<B: GraphicsBackend, D: Decoder> Drop for TextureManager<B, D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
