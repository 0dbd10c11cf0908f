//! Animate a procedural texture, resizing it halfway through
//!
//! Each frame re-uploads the pixels. The log shows the first upload
//! creating the texture, the second moving it to CPU-writable memory,
//! and later frames updating it in place until the size changes.

use std::error::Error;
use tex2d::{GraphicsBackend, PixelFormat, TextureManager, UploadOutcome};

const FRAMES: u8 = 8;

fn run<B: GraphicsBackend>(backend: B) -> Result<(), Box<dyn Error>> {
    let mut textures = TextureManager::new(backend);
    let id = textures.create(Some("procedural"));

    for frame in 0..FRAMES {
        let size = if frame < FRAMES / 2 { 64 } else { 96 };
        let pixels = tex2d_demos::checkerboard(size, size, 8, frame.wrapping_mul(30));
        let outcome = textures.set_colors(id, size, size, &pixels, PixelFormat::Rgba32)?;
        match outcome {
            UploadOutcome::Updated => tracing::debug!("frame {}: updated in place", frame),
            other => tracing::info!("frame {}: {:?} at {}x{}", frame, other, size, size),
        }
        textures.bind(Some(id), 0)?;
    }

    let texture = textures.texture(id).ok_or("texture vanished")?;
    tracing::info!(
        "final: {}x{} mutable={} usage={:?}",
        texture.width(),
        texture.height(),
        texture.is_mutable(),
        texture.usage()
    );
    textures.release(id)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tex2d_demos::init_tracing();

    #[cfg(feature = "wgpu")]
    {
        run(tex2d_wgpu::WgpuBackend::headless(4)?)
    }

    #[cfg(not(feature = "wgpu"))]
    {
        run(tex2d::HeadlessBackend::new())
    }
}
