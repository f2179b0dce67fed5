//! Named off-screen render targets with index-swapping ping-pong.
//!
//! Targets live in an arena and are addressed by [`TargetKey`]. Swapping
//! two keys exchanges arena indices only; passes resolve keys to views at
//! bind time, so nothing holds a handle across a swap or a reallocation.

use tracing::debug;

use crate::context::{GpuContext, target_bytes};
use crate::error::{GpuError, GpuResult};

/// Names of the engine's working targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKey {
    /// Inside/outside mask of the current slice.
    Mask,
    /// Intermediate output of multi-pass operations.
    Scratch,
    /// General purpose.
    Temp1,
    /// General purpose.
    Temp2,
    /// General purpose.
    Temp3,
}

impl TargetKey {
    /// Every key, in arena order.
    pub const ALL: [Self; 5] = [
        Self::Mask,
        Self::Scratch,
        Self::Temp1,
        Self::Temp2,
        Self::Temp3,
    ];

    const fn slot(self) -> usize {
        match self {
            Self::Mask => 0,
            Self::Scratch => 1,
            Self::Temp1 => 2,
            Self::Temp2 => 3,
            Self::Temp3 => 4,
        }
    }

    /// Label used for GPU debug names.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mask => "mask",
            Self::Scratch => "scratch",
            Self::Temp1 => "temp1",
            Self::Temp2 => "temp2",
            Self::Temp3 => "temp3",
        }
    }
}

/// Five same-sized targets addressed by key.
#[derive(Debug)]
pub struct RenderTargets<T> {
    slots: Vec<T>,
    index: [usize; 5],
    width: u32,
    height: u32,
}

impl<T> RenderTargets<T> {
    /// Build one target per key with `make(key, width, height)`.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by `make`.
    pub fn allocate<E>(
        width: u32,
        height: u32,
        mut make: impl FnMut(TargetKey, u32, u32) -> Result<T, E>,
    ) -> Result<Self, E> {
        let slots = TargetKey::ALL
            .iter()
            .map(|&key| make(key, width, height))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self {
            slots,
            index: [0, 1, 2, 3, 4],
            width,
            height,
        })
    }

    /// The target currently named `key`.
    #[must_use]
    pub fn get(&self, key: TargetKey) -> &T {
        &self.slots[self.index[key.slot()]]
    }

    /// Exchange the targets behind two names.
    pub fn swap(&mut self, a: TargetKey, b: TargetKey) {
        self.index.swap(a.slot(), b.slot());
    }

    /// Common size of every target.
    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Color format of every render target.
///
/// The intersection pass counts surfaces in 1/255 steps per channel, so a
/// pixel stays correct only while at most [`MAX_STACKED_SURFACES`] faces of
/// each orientation lie above the slice plane. Beyond that the counts
/// saturate and the inside test can flip.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Surfaces of one orientation a single pixel can count above the slice
/// plane before the [`TARGET_FORMAT`] channel saturates.
pub const MAX_STACKED_SURFACES: u32 = 255;

/// Depth format paired with every render target.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// An RGBA8 color texture with its own depth buffer.
#[derive(Debug)]
pub struct GpuTarget {
    /// Color texture.
    pub texture: wgpu::Texture,
    /// View of the color texture.
    pub view: wgpu::TextureView,
    /// View of the paired depth texture.
    pub depth_view: wgpu::TextureView,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl GpuTarget {
    /// Allocate a target.
    ///
    /// # Errors
    ///
    /// [`GpuError::InvalidSize`] for zero sizes or sizes above the device
    /// limit; [`GpuError::OutOfMemory`] when the device cannot allocate.
    pub fn new(ctx: &GpuContext, label: &str, width: u32, height: u32) -> GpuResult<Self> {
        ctx.check_target_size(width, height)?;

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        ctx.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label}_depth")),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        if pollster::block_on(ctx.device.pop_error_scope()).is_some() {
            return Err(GpuError::OutOfMemory {
                required: target_bytes(width, height),
                available: ctx.estimate_available_memory(),
            });
        }

        Ok(Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            texture,
            width,
            height,
        })
    }

    /// Allocate the five named working targets.
    ///
    /// # Errors
    ///
    /// See [`GpuTarget::new`].
    pub fn allocate_set(
        ctx: &GpuContext,
        width: u32,
        height: u32,
    ) -> GpuResult<RenderTargets<Self>> {
        debug!(width, height, "allocating render targets");
        RenderTargets::allocate(width, height, |key, w, h| {
            Self::new(ctx, &format!("target_{}", key.label()), w, h)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Fake {
        key: TargetKey,
        width: u32,
        height: u32,
    }

    fn fakes(width: u32, height: u32) -> RenderTargets<Fake> {
        RenderTargets::allocate(width, height, |key, width, height| {
            Ok::<_, ()>(Fake { key, width, height })
        })
        .unwrap()
    }

    #[test]
    fn test_stacked_surface_limit_matches_channel_depth() {
        assert_eq!(TARGET_FORMAT.block_copy_size(None), Some(4));
        let step = 1.0_f32 / 255.0;
        #[allow(clippy::cast_precision_loss)]
        let full = step * MAX_STACKED_SURFACES as f32;
        assert!((full - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_every_key_resolves_to_its_own_target() {
        let targets = fakes(4, 2);
        for key in TargetKey::ALL {
            assert_eq!(targets.get(key).key, key);
        }
    }

    #[test]
    fn test_all_targets_share_size() {
        let targets = fakes(1280, 800);
        assert_eq!(targets.size(), (1280, 800));
        for key in TargetKey::ALL {
            let t = targets.get(key);
            assert_eq!((t.width, t.height), (1280, 800));
        }
    }

    #[test]
    fn test_swap_exchanges_names() {
        let mut targets = fakes(4, 4);
        targets.swap(TargetKey::Temp1, TargetKey::Scratch);
        assert_eq!(targets.get(TargetKey::Temp1).key, TargetKey::Scratch);
        assert_eq!(targets.get(TargetKey::Scratch).key, TargetKey::Temp1);
        assert_eq!(targets.get(TargetKey::Mask).key, TargetKey::Mask);

        targets.swap(TargetKey::Scratch, TargetKey::Temp1);
        assert_eq!(targets.get(TargetKey::Temp1).key, TargetKey::Temp1);
    }

    #[test]
    fn test_swap_with_self_is_noop() {
        let mut targets = fakes(4, 4);
        targets.swap(TargetKey::Mask, TargetKey::Mask);
        assert_eq!(targets.get(TargetKey::Mask).key, TargetKey::Mask);
    }

    #[test]
    fn test_allocation_error_propagates() {
        let result: Result<RenderTargets<Fake>, &str> =
            RenderTargets::allocate(4, 4, |key, _, _| {
                if key == TargetKey::Temp2 {
                    Err("out of memory")
                } else {
                    Ok(Fake {
                        key,
                        width: 4,
                        height: 4,
                    })
                }
            });
        assert_eq!(result.unwrap_err(), "out of memory");
    }

    #[test]
    fn test_labels_unique() {
        let mut labels: Vec<_> = TargetKey::ALL.iter().map(|k| k.label()).collect();
        labels.dedup();
        assert_eq!(labels.len(), 5);
    }
}
