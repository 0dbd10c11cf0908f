//! Lifecycle tests for the texture manager
//!
//! These run against the headless backend and check the upload state
//! machine, the identity cache and teardown end to end.

use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tex2d::{
    BackendError, DecodeError, DecodedImage, Decoder, FormatChangePolicy, HeadlessBackend,
    HeadlessConfig, ImageDecoder, ImageUsage, PixelFormat, TextureConfig, TextureError,
    TextureManager, UploadOutcome,
};

/// Decoder serving files from memory and counting how often it runs
#[derive(Default)]
struct CountingDecoder {
    files: HashMap<PathBuf, Vec<u8>>,
    calls: Cell<usize>,
}

impl CountingDecoder {
    fn with_file(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(PathBuf::from(path), bytes);
        self
    }

    fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Decoder for CountingDecoder {
    fn decode_file(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        self.calls.set(self.calls.get() + 1);
        match self.files.get(path) {
            Some(bytes) => ImageDecoder.decode_memory(bytes),
            None => Err(DecodeError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }

    fn decode_memory(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        self.calls.set(self.calls.get() + 1);
        ImageDecoder.decode_memory(bytes)
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([x as u8, y as u8, (x ^ y) as u8, 255])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

fn pattern(width: u32, height: u32, seed: u8) -> Vec<u8> {
    (0..width * height * 4)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

fn image_id(manager: &TextureManager<HeadlessBackend, impl Decoder>, id: tex2d::TextureId) -> u64 {
    manager
        .texture(id)
        .and_then(|t| t.image())
        .map(|image| image.id())
        .expect("texture has an allocation")
}

#[test]
fn loading_the_same_file_twice_shares_one_texture() {
    let decoder = CountingDecoder::default().with_file("brick.png", png_bytes(64, 64));
    let mut manager = TextureManager::with_decoder(HeadlessBackend::new(), decoder);

    let first = manager.create_from_file("brick.png").expect("first load");
    let second = manager.create_from_file("brick.png").expect("second load");

    assert_eq!(first, second);
    assert_eq!(manager.ref_count(first), Some(2));
    assert_eq!(manager.decoder().calls(), 1);
    assert_eq!(manager.backend().stats().images_created, 1);

    let texture = manager.texture(first).expect("live");
    assert_eq!(texture.identifier(), Some("brick.png"));
    assert_eq!((texture.width(), texture.height()), (64, 64));
    assert_eq!(texture.pixel_format(), Some(PixelFormat::Rgba32));
}

#[test]
fn every_cache_hit_adds_one_reference() {
    let bytes = png_bytes(4, 4);
    let mut manager = TextureManager::with_decoder(HeadlessBackend::new(), CountingDecoder::default());

    let id = manager.create_from_memory("ui/icon", &bytes).expect("load");
    for expected in 2..=5 {
        assert_eq!(manager.create_from_memory("ui/icon", &bytes).expect("hit"), id);
        assert_eq!(manager.ref_count(id), Some(expected));
    }
    assert_eq!(manager.decoder().calls(), 1);
}

#[test]
fn decode_failure_leaves_no_cache_entry() {
    let mut manager = TextureManager::with_decoder(HeadlessBackend::new(), CountingDecoder::default());

    let err = manager
        .create_from_memory("sprite", b"not an image")
        .unwrap_err();
    assert!(matches!(err, TextureError::Decode(_)));
    assert!(!manager.contains("sprite"));
    assert_eq!(manager.texture_count(), 0);
    assert_eq!(manager.backend().stats().images_created, 0);

    let id = manager
        .create_from_memory("sprite", &png_bytes(8, 8))
        .expect("second attempt decodes normally");
    assert_eq!(manager.decoder().calls(), 2);
    assert_eq!(manager.ref_count(id), Some(1));
    assert_eq!(manager.backend().stats().images_created, 1);
}

#[test]
fn missing_file_yields_no_texture() {
    let mut manager = TextureManager::with_decoder(HeadlessBackend::new(), CountingDecoder::default());
    let err = manager.create_from_file("missing.png").unwrap_err();
    assert!(matches!(err, TextureError::Decode(DecodeError::Io { .. })));
    assert!(!manager.contains("missing.png"));
}

#[test]
fn failed_upload_during_load_unregisters_the_texture() {
    let mut manager = TextureManager::with_decoder(HeadlessBackend::new(), CountingDecoder::default());
    manager.backend_mut().fail_next_create(BackendError::OutOfMemory);

    let err = manager
        .create_from_memory("big", &png_bytes(2, 2))
        .unwrap_err();
    assert!(matches!(err, TextureError::Allocation(BackendError::OutOfMemory)));
    assert!(!manager.contains("big"));
    assert_eq!(manager.texture_count(), 0);
}

#[test]
fn second_same_size_upload_upgrades_then_updates_in_place() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    let buf_a = pattern(32, 32, 1);
    let buf_b = pattern(32, 32, 2);
    let buf_c = pattern(32, 32, 3);

    assert_eq!(
        manager.set_colors(tex, 32, 32, &buf_a, PixelFormat::Rgba32).unwrap(),
        UploadOutcome::Created
    );
    assert_eq!(manager.texture(tex).unwrap().usage(), Some(ImageUsage::Default));
    assert!(!manager.texture(tex).unwrap().is_mutable());

    // GPU-only memory cannot be mapped, so the first rewrite reallocates as dynamic.
    assert_eq!(
        manager.set_colors(tex, 32, 32, &buf_b, PixelFormat::Rgba32).unwrap(),
        UploadOutcome::Recreated
    );
    assert_eq!(manager.texture(tex).unwrap().usage(), Some(ImageUsage::Dynamic));
    assert!(manager.texture(tex).unwrap().is_mutable());
    let image = manager.texture(tex).unwrap().image().unwrap();
    assert_eq!(manager.backend().read_pixels(image), Some(buf_b));

    let before = image_id(&manager, tex);
    assert_eq!(
        manager.set_colors(tex, 32, 32, &buf_c, PixelFormat::Rgba32).unwrap(),
        UploadOutcome::Updated
    );
    assert_eq!(image_id(&manager, tex), before);
    let image = manager.texture(tex).unwrap().image().unwrap();
    assert_eq!(manager.backend().read_pixels(image), Some(buf_c));
}

#[test]
fn writable_texture_keeps_its_allocation_for_same_size_updates() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    manager.set_colors(tex, 16, 8, &pattern(16, 8, 0), PixelFormat::Rgba32).unwrap();
    manager.set_colors(tex, 16, 8, &pattern(16, 8, 1), PixelFormat::Rgba32).unwrap();
    assert_eq!(manager.backend().stats().images_created, 2);

    let allocation = image_id(&manager, tex);
    for seed in 2..12 {
        assert_eq!(
            manager.set_colors(tex, 16, 8, &pattern(16, 8, seed), PixelFormat::Rgba32).unwrap(),
            UploadOutcome::Updated
        );
    }
    assert_eq!(image_id(&manager, tex), allocation);
    assert_eq!(manager.backend().stats().images_created, 2);
    assert_eq!(manager.backend().stats().maps, 10);
    assert_eq!(manager.backend().stats().unmaps, 10);
}

#[test]
fn resizing_releases_the_old_allocation() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    manager.set_colors(tex, 4, 4, &pattern(4, 4, 0), PixelFormat::Rgba32).unwrap();
    manager.set_colors(tex, 4, 4, &pattern(4, 4, 1), PixelFormat::Rgba32).unwrap();
    let old = image_id(&manager, tex);

    assert_eq!(
        manager.set_colors(tex, 8, 2, &pattern(8, 2, 2), PixelFormat::Rgba32).unwrap(),
        UploadOutcome::Recreated
    );
    let texture = manager.texture(tex).unwrap();
    assert_ne!(texture.image().unwrap().id(), old);
    assert_eq!((texture.width(), texture.height()), (8, 2));
    assert_eq!(texture.usage(), Some(ImageUsage::Dynamic));
    assert_eq!(manager.backend().live_images(), 1);
    assert_eq!(manager.backend().live_views(), 1);
    assert_eq!(manager.backend().stats().images_released, 2);
}

#[test]
fn in_place_update_honours_destination_row_pitch() {
    // 3 pixels * 4 bytes = 12 byte rows stored at a 64 byte pitch
    let backend = HeadlessBackend::with_config(HeadlessConfig::default().with_row_alignment(64));
    let mut manager = TextureManager::new(backend);
    let tex = manager.create(None);
    manager.set_colors(tex, 3, 4, &pattern(3, 4, 0), PixelFormat::Rgba32).unwrap();
    manager.set_colors(tex, 3, 4, &pattern(3, 4, 1), PixelFormat::Rgba32).unwrap();

    let rows: Vec<u8> = (0..4u8).flat_map(|row| [row + 1; 12]).collect();
    assert_eq!(
        manager.set_colors(tex, 3, 4, &rows, PixelFormat::Rgba32).unwrap(),
        UploadOutcome::Updated
    );

    let image = manager.texture(tex).unwrap().image().unwrap();
    assert_eq!(manager.backend().row_pitch(image), Some(64));
    let raw = manager.backend().raw_storage(image).unwrap();
    for row in 0..4usize {
        let start = row * 64;
        assert_eq!(&raw[start..start + 12], &[row as u8 + 1; 12][..], "row {}", row);
        assert!(
            raw[start + 12..start + 64].iter().all(|b| *b == tex2d::DISCARD_FILL),
            "padding of row {} was overwritten",
            row
        );
    }
    assert_eq!(manager.backend().read_pixels(image), Some(rows));
}

#[test]
fn wide_formats_use_their_own_pixel_size() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    let texels = vec![0x3Cu8; 5 * 3 * 16];
    manager.set_colors(tex, 5, 3, &texels, PixelFormat::Rgba128).unwrap();
    manager.set_colors(tex, 5, 3, &texels, PixelFormat::Rgba128).unwrap();
    assert_eq!(
        manager.set_colors(tex, 5, 3, &texels, PixelFormat::Rgba128).unwrap(),
        UploadOutcome::Updated
    );

    let image = manager.texture(tex).unwrap().image().unwrap();
    assert_eq!(image.desc().format, tex2d::NativeFormat::Rgba32Float);
    assert_eq!(manager.backend().read_pixels(image), Some(texels));
}

#[test]
fn failed_first_allocation_leaves_texture_empty() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(Some("retry"));
    manager.backend_mut().fail_next_create(BackendError::Unsupported("format".into()));

    let err = manager
        .set_colors(tex, 4, 4, &pattern(4, 4, 0), PixelFormat::Rgba32)
        .unwrap_err();
    assert!(err.is_backend_failure());
    let texture = manager.texture(tex).unwrap();
    assert!(!texture.is_allocated());
    assert_eq!((texture.width(), texture.height()), (0, 0));
    assert_eq!(manager.ref_count(tex), Some(1));

    assert_eq!(
        manager.set_colors(tex, 4, 4, &pattern(4, 4, 0), PixelFormat::Rgba32).unwrap(),
        UploadOutcome::Created
    );
}

#[test]
fn failed_reallocation_keeps_the_previous_allocation() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    let original = pattern(4, 4, 9);
    manager.set_colors(tex, 4, 4, &original, PixelFormat::Rgba32).unwrap();
    let before = image_id(&manager, tex);

    manager.backend_mut().fail_next_create(BackendError::OutOfMemory);
    let err = manager
        .set_colors(tex, 64, 64, &pattern(64, 64, 0), PixelFormat::Rgba32)
        .unwrap_err();
    assert!(matches!(err, TextureError::Allocation(BackendError::OutOfMemory)));

    let texture = manager.texture(tex).unwrap();
    assert_eq!((texture.width(), texture.height()), (4, 4));
    assert_eq!(texture.image().unwrap().id(), before);
    assert_eq!(manager.backend().read_pixels(texture.image().unwrap()), Some(original));
    assert_eq!(manager.backend().live_images(), 1);
}

#[test]
fn failed_view_creation_releases_the_new_image() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    manager.backend_mut().fail_next_view(BackendError::Device("view".into()));

    assert!(manager.set_colors(tex, 2, 2, &pattern(2, 2, 0), PixelFormat::Rgba32).is_err());
    assert!(!manager.texture(tex).unwrap().is_allocated());
    assert_eq!(manager.backend().live_images(), 0);
    assert_eq!(manager.backend().live_views(), 0);
}

#[test]
fn map_failure_is_reported_without_touching_references() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    manager.set_colors(tex, 2, 2, &pattern(2, 2, 0), PixelFormat::Rgba32).unwrap();
    manager.set_colors(tex, 2, 2, &pattern(2, 2, 1), PixelFormat::Rgba32).unwrap();
    let allocation = image_id(&manager, tex);

    manager.backend_mut().fail_next_map(BackendError::Device("lost".into()));
    let err = manager
        .set_colors(tex, 2, 2, &pattern(2, 2, 2), PixelFormat::Rgba32)
        .unwrap_err();
    assert!(matches!(err, TextureError::Map(_)));

    let texture = manager.texture(tex).unwrap();
    assert_eq!((texture.width(), texture.height()), (2, 2));
    assert_eq!(image_id(&manager, tex), allocation);
    assert_eq!(manager.ref_count(tex), Some(1));
    assert_eq!(manager.backend().stats().unmaps, 0);
}

#[test]
fn short_mapped_region_is_reported_and_still_unmapped() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    manager.set_colors(tex, 4, 2, &pattern(4, 2, 0), PixelFormat::Rgba32).unwrap();
    manager.set_colors(tex, 4, 2, &pattern(4, 2, 1), PixelFormat::Rgba32).unwrap();
    let unmaps = manager.backend().stats().unmaps;

    // A tight row is 16 bytes.
    manager.backend_mut().short_next_map(12);
    let err = manager
        .set_colors(tex, 4, 2, &pattern(4, 2, 2), PixelFormat::Rgba32)
        .unwrap_err();
    assert!(matches!(
        err,
        TextureError::MappedRegionTooSmall {
            row_pitch: 12,
            row_bytes: 16,
            rows: 2
        }
    ));
    assert_eq!(manager.backend().stats().unmaps, unmaps + 1);

    let next = pattern(4, 2, 3);
    assert_eq!(
        manager.set_colors(tex, 4, 2, &next, PixelFormat::Rgba32).unwrap(),
        UploadOutcome::Updated
    );
    let texture = manager.texture(tex).unwrap();
    assert_eq!(manager.backend().read_pixels(texture.image().unwrap()).unwrap(), next);
}

#[test]
fn overflowing_dimensions_are_rejected_before_reaching_the_backend() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);

    let err = manager
        .set_colors(tex, 1 << 30, 1 << 30, &[], PixelFormat::Rgba128)
        .unwrap_err();
    assert!(matches!(
        err,
        TextureError::SizeOverflow {
            width: 0x4000_0000,
            height: 0x4000_0000,
            format: PixelFormat::Rgba128
        }
    ));
    assert_eq!(manager.backend().stats().images_created, 0);
    assert!(!manager.texture(tex).unwrap().is_allocated());
}

#[test]
fn invalid_uploads_are_rejected_before_reaching_the_backend() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);

    assert!(matches!(
        manager.set_colors(tex, 0, 4, &[], PixelFormat::Rgba32),
        Err(TextureError::EmptyDimensions { width: 0, height: 4 })
    ));
    assert!(matches!(
        manager.set_colors(tex, 2, 2, &[0; 15], PixelFormat::Rgba32),
        Err(TextureError::SourceTooSmall {
            expected: 16,
            actual: 15
        })
    ));
    assert_eq!(manager.backend().stats().images_created, 0);
}

#[test]
fn format_change_is_rejected_by_default() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    manager.set_colors(tex, 2, 2, &[0; 16], PixelFormat::Rgba32).unwrap();
    manager.set_colors(tex, 2, 2, &[0; 16], PixelFormat::Rgba32).unwrap();

    let err = manager
        .set_colors(tex, 2, 2, &[0; 32], PixelFormat::Rgba64)
        .unwrap_err();
    assert!(matches!(
        err,
        TextureError::FormatMismatch {
            allocated: PixelFormat::Rgba32,
            requested: PixelFormat::Rgba64
        }
    ));
    assert_eq!(manager.backend().stats().maps, 0);
    assert_eq!(manager.texture(tex).unwrap().pixel_format(), Some(PixelFormat::Rgba32));
}

#[test]
fn format_change_can_reallocate() {
    let config = TextureConfig::new().with_format_change(FormatChangePolicy::Recreate);
    let mut manager = TextureManager::new(HeadlessBackend::new()).with_config(config);
    let tex = manager.create(None);
    manager.set_colors(tex, 2, 2, &[0; 16], PixelFormat::Rgba32).unwrap();
    manager.set_colors(tex, 2, 2, &[0; 16], PixelFormat::Rgba32).unwrap();

    assert_eq!(
        manager.set_colors(tex, 2, 2, &[7; 32], PixelFormat::Rgba64).unwrap(),
        UploadOutcome::Recreated
    );
    let texture = manager.texture(tex).unwrap();
    assert_eq!(texture.pixel_format(), Some(PixelFormat::Rgba64));
    assert_eq!(texture.usage(), Some(ImageUsage::Dynamic));
}

#[test]
fn without_upgrade_every_rewrite_reallocates() {
    let config = TextureConfig::new().with_upgrade_to_dynamic(false);
    let mut manager = TextureManager::new(HeadlessBackend::new()).with_config(config);
    let tex = manager.create(None);

    for _ in 0..3 {
        manager.set_colors(tex, 2, 2, &[1; 16], PixelFormat::Rgba32).unwrap();
    }
    assert_eq!(manager.backend().stats().images_created, 3);
    assert_eq!(manager.backend().stats().maps, 0);
    assert!(!manager.texture(tex).unwrap().is_mutable());
}

#[test]
fn destroy_runs_once_on_the_last_release() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(Some("shared"));
    manager.set_colors(tex, 2, 2, &[0; 16], PixelFormat::Rgba32).unwrap();
    manager.add_ref(tex).unwrap();
    assert_eq!(manager.find("shared"), Some(tex));
    assert_eq!(manager.ref_count(tex), Some(3));

    assert!(!manager.release(tex).unwrap());
    assert!(!manager.release(tex).unwrap());
    assert_eq!(manager.backend().stats().images_released, 0);
    assert!(manager.contains("shared"));

    assert!(manager.release(tex).unwrap());
    let stats = manager.backend().stats();
    assert_eq!(stats.images_released, 1);
    assert_eq!(stats.views_released, 1);
    assert!(!manager.contains("shared"));
    assert_eq!(manager.find("shared"), None);
    assert!(manager.release(tex).is_err());
    assert_eq!(manager.backend().stats().images_released, 1);
}

#[test]
fn binding_attaches_and_clears_slots_without_touching_references() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    manager.set_colors(tex, 2, 2, &[0; 16], PixelFormat::Rgba32).unwrap();
    let image = image_id(&manager, tex);

    manager.bind(Some(tex), 2).unwrap();
    let bound = manager.backend().bound_view(2).expect("slot 2 bound");
    let view = manager.texture(tex).unwrap().view().unwrap();
    assert_eq!(bound, view.id());
    assert_eq!(view.image_id(), image);

    manager.bind(None, 2).unwrap();
    assert_eq!(manager.backend().bound_view(2), None);
    assert_eq!(manager.ref_count(tex), Some(1));

    let empty = manager.create(None);
    manager.bind(Some(tex), 5).unwrap();
    manager.bind(Some(empty), 5).unwrap();
    assert_eq!(manager.backend().bound_view(5), None);
    assert_eq!(manager.ref_count(empty), Some(1));
}

#[test]
fn releasing_a_bound_texture_clears_its_slot() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(None);
    manager.set_colors(tex, 1, 1, &[0; 4], PixelFormat::Rgba32).unwrap();
    manager.bind(Some(tex), 0).unwrap();

    manager.release(tex).unwrap();
    assert_eq!(manager.backend().bound_view(0), None);
}

#[test]
fn dropping_the_manager_destroys_remaining_textures() {
    let mut manager = TextureManager::new(HeadlessBackend::new());
    let tex = manager.create(Some("leaked"));
    manager.set_colors(tex, 1, 1, &[0; 4], PixelFormat::Rgba32).unwrap();
    manager.add_ref(tex).unwrap();

    manager.shutdown();
    assert_eq!(manager.backend().live_images(), 0);
    assert_eq!(manager.texture_count(), 0);
    assert!(manager.texture(tex).is_none());
}

#[test]
fn loads_a_real_file_from_disk() {
    let dir = std::env::temp_dir().join(format!("tex2d-lifecycle-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("tile.png");
    std::fs::write(&path, png_bytes(5, 7)).expect("write png");

    let mut manager = TextureManager::new(HeadlessBackend::new());
    let id = manager.create_from_file(&path).expect("load from disk");
    let again = manager.create_from_file(&path).expect("cached");
    assert_eq!(id, again);

    let texture = manager.texture(id).unwrap();
    assert_eq!((texture.width(), texture.height()), (5, 7));
    assert_eq!(texture.identifier(), Some(&*path.to_string_lossy()));

    let pixels = manager.backend().read_pixels(texture.image().unwrap()).unwrap();
    // Pixel (4, 6) of the generated image
    let offset = (6 * 5 + 4) * 4;
    assert_eq!(&pixels[offset..offset + 4], &[4, 6, 4 ^ 6, 255]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn distinct_non_utf8_paths_load_distinct_textures() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let a = Path::new(OsStr::from_bytes(b"tile-\xff.png"));
    let b = Path::new(OsStr::from_bytes(b"tile-\xfe.png"));
    assert_eq!(a.to_string_lossy(), b.to_string_lossy());

    let mut decoder = CountingDecoder::default();
    decoder.files.insert(a.to_path_buf(), png_bytes(2, 2));
    decoder.files.insert(b.to_path_buf(), png_bytes(3, 3));
    let mut manager = TextureManager::with_decoder(HeadlessBackend::new(), decoder);

    let first = manager.create_from_file(a).expect("load a");
    let second = manager.create_from_file(b).expect("load b");
    assert_ne!(first, second);
    assert_eq!(manager.texture(second).unwrap().width(), 3);
    assert_eq!(manager.decoder().calls(), 2);

    assert_eq!(manager.create_from_file(a).expect("cached a"), first);
    assert_eq!(manager.decoder().calls(), 2);
}
