//! Shared setup for the tex2d demos

use tracing_subscriber::{EnvFilter, fmt};

/// Initialize a tracing subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tex2d=debug,tex2d_wgpu=debug,tex2d-wgpu=debug,info".into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Checkerboard of `cell`-sized squares, tinted by `phase`
pub fn checkerboard(width: u32, height: u32, cell: u32, phase: u8) -> Vec<u8> {
    let cell = cell.max(1);
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            let value = if on { 255u8 } else { 32 };
            pixels.extend_from_slice(&[value, value.wrapping_add(phase), phase, 255]);
        }
    }
    pixels
}
