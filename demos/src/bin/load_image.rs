//! Load image files into textures, twice, to show the identity cache
//!
//! Usage: `load_image <path>...`

use std::error::Error;
use tex2d::{GraphicsBackend, TextureManager};

fn run<B: GraphicsBackend>(backend: B, paths: &[String]) -> Result<(), Box<dyn Error>> {
    let mut textures = TextureManager::new(backend);
    let mut ids = Vec::new();

    for path in paths {
        match textures.create_from_file(path) {
            Ok(id) => {
                let texture = textures.texture(id).ok_or("texture vanished")?;
                tracing::info!(
                    "{} -> {} ({}x{}, {:?})",
                    path,
                    id,
                    texture.width(),
                    texture.height(),
                    texture.pixel_format()
                );
                ids.push(id);
            }
            Err(e) => tracing::error!("{}: {}", path, e),
        }
    }

    // Loading the same paths again hits the cache.
    for path in paths {
        if let Ok(id) = textures.create_from_file(path) {
            tracing::info!("{} cached as {} with {:?} refs", path, id, textures.ref_count(id));
            ids.push(id);
        }
    }

    for (slot, id) in ids.iter().enumerate() {
        textures.bind(Some(*id), slot as u32)?;
    }
    for slot in 0..ids.len() {
        textures.bind(None, slot as u32)?;
    }

    for id in ids {
        if textures.release(id)? {
            tracing::info!("{} destroyed", id);
        }
    }
    tracing::info!("{} textures still live", textures.texture_count());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tex2d_demos::init_tracing();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: load_image <path>...");
        std::process::exit(2);
    }

    #[cfg(feature = "wgpu")]
    {
        let backend = tex2d_wgpu::WgpuBackend::headless(16)?;
        run(backend, &paths)
    }

    #[cfg(not(feature = "wgpu"))]
    {
        run(tex2d::HeadlessBackend::new(), &paths)
    }
}
