//! Format and layout helpers shared by the WGPU backend

use tex2d::NativeFormat;

/// WGPU texel format for a native format
pub fn wgpu_format(format: NativeFormat) -> wgpu::TextureFormat {
    match format {
        NativeFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        NativeFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        NativeFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
    }
}

/// Row pitch rounded up to [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`] (256 bytes)
pub fn padded_row_pitch(row_bytes: usize) -> usize {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    row_bytes.div_ceil(align) * align
}
