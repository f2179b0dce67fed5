//! Copying render targets back to the host and decoding them.

use std::io::Cursor;

use crate::camera::depth_to_world_z;
use crate::context::GpuContext;
use crate::error::{GpuError, GpuResult};
use crate::targets::GpuTarget;

/// Bytes per RGBA8 texel.
const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of a texture-to-buffer copy, rounded up to the 256-byte
/// alignment wgpu requires.
#[must_use]
pub const fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop the per-row padding of a copied texture.
#[must_use]
pub fn strip_padding(data: &[u8], width: u32, height: u32, padded_row: u32) -> Vec<u8> {
    let row = (width * BYTES_PER_PIXEL) as usize;
    let padded_row = padded_row as usize;
    let mut out = Vec::with_capacity(row * height as usize);
    for chunk in data.chunks(padded_row).take(height as usize) {
        out.extend_from_slice(&chunk[..row.min(chunk.len())]);
    }
    out
}

/// Read a target's color texture as tightly packed RGBA8 rows, top row
/// first.
///
/// # Errors
///
/// Returns [`GpuError::BufferMapping`] if the staging buffer cannot be
/// mapped.
pub fn read_target(ctx: &GpuContext, target: &GpuTarget) -> GpuResult<Vec<u8>> {
    let padded_row = padded_bytes_per_row(target.width);
    let size = u64::from(padded_row) * u64::from(target.height);

    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("slice_staging"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("slice_readback"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(target.height),
            },
        },
        wgpu::Extent3d {
            width: target.width,
            height: target.height,
            depth_or_array_layers: 1,
        },
    );
    ctx.queue.submit([encoder.finish()]);

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    ctx.device.poll(wgpu::Maintain::Wait);

    rx.recv()
        .map_err(|_| GpuError::BufferMapping("channel closed".into()))?
        .map_err(|e| GpuError::BufferMapping(format!("{e:?}")))?;

    let data = slice.get_mapped_range();
    let pixels = strip_padding(&data, target.width, target.height, padded_row);
    drop(data);
    staging.unmap();

    Ok(pixels)
}

/// A single-channel slice raster, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// One luminance byte per pixel.
    pub pixels: Vec<u8>,
}

impl SliceImage {
    /// Keep the red channel of tightly packed RGBA8 data.
    #[must_use]
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Self {
        Self {
            width,
            height,
            pixels: rgba
                .chunks_exact(BYTES_PER_PIXEL as usize)
                .map(|px| px[0])
                .collect(),
        }
    }

    /// Whether the pixel at `(x, y)` is exposed.
    #[must_use]
    pub fn is_white(&self, x: u32, y: u32) -> bool {
        let i = y as usize * self.width as usize + x as usize;
        self.pixels.get(i).is_some_and(|&v| v > 127)
    }

    /// Number of exposed pixels.
    #[must_use]
    pub fn white_pixel_count(&self) -> usize {
        self.pixels.iter().filter(|&&v| v > 127).count()
    }

    /// Encode as an 8-bit greyscale PNG.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::ImageEncode`] if the buffer does not match the
    /// dimensions or encoding fails.
    pub fn to_png(&self) -> GpuResult<Vec<u8>> {
        let image = image::GrayImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| {
                GpuError::ImageEncode(format!(
                    "{} bytes do not form a {}x{} image",
                    self.pixels.len(),
                    self.width,
                    self.height
                ))
            })?;
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, image::ImageFormat::Png)
            .map_err(|e| GpuError::ImageEncode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

/// Weights that undo the RGBA depth packing.
const UNPACK: [f64; 4] = [1.0, 1.0 / 255.0, 1.0 / 65025.0, 1.0 / 16_581_375.0];

/// Decode one packed depth texel into normalized depth.
///
/// `None` for the white clear color, meaning no surface was drawn.
#[must_use]
pub fn unpack_depth(texel: [u8; 4], to_fixed: f64) -> Option<f64> {
    if texel[0] == u8::MAX {
        return None;
    }
    let packed: f64 = texel
        .iter()
        .zip(UNPACK)
        .map(|(&byte, weight)| f64::from(byte) / 255.0 * weight)
        .sum();
    Some(packed / to_fixed)
}

/// World Z of the highest surface per pixel, as seen from above.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Height in mm per pixel, `None` where nothing was drawn.
    pub heights: Vec<Option<f64>>,
}

impl DepthMap {
    /// Decode tightly packed RGBA8 depth data rendered by the slice camera
    /// over a volume of height `volume_height`.
    #[must_use]
    pub fn decode(width: u32, height: u32, rgba: &[u8], to_fixed: f64, volume_height: f64) -> Self {
        let heights = rgba
            .chunks_exact(BYTES_PER_PIXEL as usize)
            .map(|px| {
                unpack_depth([px[0], px[1], px[2], px[3]], to_fixed)
                    .map(|ndc| depth_to_world_z(ndc, volume_height))
            })
            .collect();
        Self {
            width,
            height,
            heights,
        }
    }

    /// Height at `(x, y)`.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        let i = y as usize * self.width as usize + x as usize;
        self.heights.get(i).copied().flatten()
    }

    /// Highest surface in the map.
    #[must_use]
    pub fn max_height(&self) -> Option<f64> {
        self.heights.iter().flatten().copied().reduce(f64::max)
    }
}
