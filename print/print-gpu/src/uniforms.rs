//! One typed uniform record per program.
//!
//! Each record knows its [`ProgramKind`], the textures it samples and how
//! to lay itself out for the GPU. A record cannot be bound without every
//! field set, so no draw can run with a missing uniform.

use bytemuck::{Pod, Zeroable};
use print_scene::ProgramKind;

use crate::targets::TargetKey;

/// Output raster size pushed into programs that read neighbouring texels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ViewSize {
    /// Create a view size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn as_i32(self) -> (i32, i32) {
        (
            i32::try_from(self.width).unwrap_or(i32::MAX),
            i32::try_from(self.height).unwrap_or(i32::MAX),
        )
    }
}

/// Typed uniforms of a program.
pub trait ProgramUniforms {
    /// Uniform buffer layout (group 1, binding 0).
    type Gpu: Pod;

    /// Program these uniforms belong to.
    const KIND: ProgramKind;

    /// GPU layout of the current values.
    fn to_gpu(&self) -> Self::Gpu;

    /// Targets sampled, in binding order starting at binding 1.
    fn sources(&self) -> Vec<TargetKey> {
        Vec::new()
    }

    /// Update the view dimensions after a resolution change.
    fn set_view(&mut self, _view: ViewSize) {}
}

/// Flat white silhouette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlatUniforms {
    /// Only draw surfaces whose outside faces the camera.
    pub facing_only: bool,
}

/// GPU layout of [`FlatUniforms`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuFlatParams {
    facing_only: u32,
    _pad: [u32; 3],
}

impl ProgramUniforms for FlatUniforms {
    type Gpu = GpuFlatParams;
    const KIND: ProgramKind = ProgramKind::Flat;

    fn to_gpu(&self) -> GpuFlatParams {
        GpuFlatParams {
            facing_only: u32::from(self.facing_only),
            _pad: [0; 3],
        }
    }
}

/// Depth packed into RGBA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthUniforms {
    /// Scale applied before packing so depth `1.0` stays below the wrap.
    pub to_fixed: f32,
}

/// Default depth scale, `255 / 256`.
pub const DEPTH_TO_FIXED: f32 = 255.0 / 256.0;

impl Default for DepthUniforms {
    fn default() -> Self {
        Self {
            to_fixed: DEPTH_TO_FIXED,
        }
    }
}

/// GPU layout of [`DepthUniforms`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuDepthParams {
    to_fixed: f32,
    _pad: [f32; 3],
}

impl ProgramUniforms for DepthUniforms {
    type Gpu = GpuDepthParams;
    const KIND: ProgramKind = ProgramKind::Depth;

    fn to_gpu(&self) -> GpuDepthParams {
        GpuDepthParams {
            to_fixed: self.to_fixed,
            _pad: [0.0; 3],
        }
    }
}

/// Face parity above the slice plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntersectionUniforms {
    /// Normalized slice height.
    pub cutoff: f32,
}

/// GPU layout of [`IntersectionUniforms`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuIntersectionParams {
    cutoff: f32,
    _pad: [f32; 3],
}

impl ProgramUniforms for IntersectionUniforms {
    type Gpu = GpuIntersectionParams;
    const KIND: ProgramKind = ProgramKind::Intersection;

    fn to_gpu(&self) -> GpuIntersectionParams {
        GpuIntersectionParams {
            cutoff: self.cutoff,
            _pad: [0.0; 3],
        }
    }
}

/// Inside/outside mask below the slice plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceUniforms {
    /// Normalized slice height.
    pub cutoff: f32,
    /// Target holding the intersection parity.
    pub parity: TargetKey,
    /// Draw the grey lattice overlay.
    pub lattice: bool,
    /// Raster size.
    pub view: ViewSize,
}

impl Default for SliceUniforms {
    fn default() -> Self {
        Self {
            cutoff: 0.0,
            parity: TargetKey::Scratch,
            lattice: false,
            view: ViewSize::default(),
        }
    }
}

/// GPU layout of [`SliceUniforms`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuSliceParams {
    cutoff: f32,
    lattice: u32,
    view_width: i32,
    view_height: i32,
}

impl ProgramUniforms for SliceUniforms {
    type Gpu = GpuSliceParams;
    const KIND: ProgramKind = ProgramKind::Slice;

    fn to_gpu(&self) -> GpuSliceParams {
        let (view_width, view_height) = self.view.as_i32();
        GpuSliceParams {
            cutoff: self.cutoff,
            lattice: u32::from(self.lattice),
            view_width,
            view_height,
        }
    }

    fn sources(&self) -> Vec<TargetKey> {
        vec![self.parity]
    }

    fn set_view(&mut self, view: ViewSize) {
        self.view = view;
    }
}

/// Disk-shaped min/max filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErodeDilateUniforms {
    /// Max filter when true, min filter otherwise.
    pub dilate: bool,
    /// Disk radius in pixels.
    pub pixel_radius: u32,
    /// Target filtered.
    pub source: TargetKey,
    /// Raster size.
    pub view: ViewSize,
}

impl Default for ErodeDilateUniforms {
    fn default() -> Self {
        Self {
            dilate: true,
            pixel_radius: 0,
            source: TargetKey::Temp1,
            view: ViewSize::default(),
        }
    }
}

/// GPU layout of [`ErodeDilateUniforms`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuErodeDilateParams {
    dilate: u32,
    pixel_radius: i32,
    view_width: i32,
    view_height: i32,
}

impl ProgramUniforms for ErodeDilateUniforms {
    type Gpu = GpuErodeDilateParams;
    const KIND: ProgramKind = ProgramKind::ErodeDilate;

    fn to_gpu(&self) -> GpuErodeDilateParams {
        let (view_width, view_height) = self.view.as_i32();
        GpuErodeDilateParams {
            dilate: u32::from(self.dilate),
            pixel_radius: i32::try_from(self.pixel_radius).unwrap_or(i32::MAX),
            view_width,
            view_height,
        }
    }

    fn sources(&self) -> Vec<TargetKey> {
        vec![self.source]
    }

    fn set_view(&mut self, view: ViewSize) {
        self.view = view;
    }
}

/// Texel-exact copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopyUniforms {
    /// Target copied.
    pub source: TargetKey,
    /// Raster size.
    pub view: ViewSize,
}

impl Default for CopyUniforms {
    fn default() -> Self {
        Self {
            source: TargetKey::Mask,
            view: ViewSize::default(),
        }
    }
}

/// GPU layout of [`CopyUniforms`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuCopyParams {
    view_width: i32,
    view_height: i32,
    _pad: [i32; 2],
}

impl ProgramUniforms for CopyUniforms {
    type Gpu = GpuCopyParams;
    const KIND: ProgramKind = ProgramKind::Copy;

    fn to_gpu(&self) -> GpuCopyParams {
        let (view_width, view_height) = self.view.as_i32();
        GpuCopyParams {
            view_width,
            view_height,
            _pad: [0; 2],
        }
    }

    fn sources(&self) -> Vec<TargetKey> {
        vec![self.source]
    }

    fn set_view(&mut self, view: ViewSize) {
        self.view = view;
    }
}

/// Pixel-wise boolean operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BoolOp {
    /// White where exactly one source is white.
    #[default]
    Xor,
    /// White where either source is white.
    Or,
    /// White where both sources are white.
    And,
}

impl BoolOp {
    /// Reference result for one pixel.
    #[must_use]
    pub const fn apply(self, a: bool, b: bool) -> bool {
        match self {
            Self::Xor => a != b,
            Self::Or => a || b,
            Self::And => a && b,
        }
    }

    const fn code(self) -> u32 {
        match self {
            Self::Xor => 0,
            Self::Or => 1,
            Self::And => 2,
        }
    }
}

/// Boolean combine of two targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoolUniforms {
    /// Operator.
    pub op: BoolOp,
    /// First operand.
    pub first: TargetKey,
    /// Second operand.
    pub second: TargetKey,
    /// Raster size.
    pub view: ViewSize,
}

impl Default for BoolUniforms {
    fn default() -> Self {
        Self {
            op: BoolOp::Xor,
            first: TargetKey::Mask,
            second: TargetKey::Temp1,
            view: ViewSize::default(),
        }
    }
}

/// GPU layout of [`BoolUniforms`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuBoolParams {
    op: u32,
    view_width: i32,
    view_height: i32,
    _pad: u32,
}

impl ProgramUniforms for BoolUniforms {
    type Gpu = GpuBoolParams;
    const KIND: ProgramKind = ProgramKind::BoolCombine;

    fn to_gpu(&self) -> GpuBoolParams {
        let (view_width, view_height) = self.view.as_i32();
        GpuBoolParams {
            op: self.op.code(),
            view_width,
            view_height,
            _pad: 0,
        }
    }

    fn sources(&self) -> Vec<TargetKey> {
        vec![self.first, self.second]
    }

    fn set_view(&mut self, view: ViewSize) {
        self.view = view;
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layouts_are_16_bytes() {
        assert_eq!(std::mem::size_of::<GpuFlatParams>(), 16);
        assert_eq!(std::mem::size_of::<GpuDepthParams>(), 16);
        assert_eq!(std::mem::size_of::<GpuIntersectionParams>(), 16);
        assert_eq!(std::mem::size_of::<GpuSliceParams>(), 16);
        assert_eq!(std::mem::size_of::<GpuErodeDilateParams>(), 16);
        assert_eq!(std::mem::size_of::<GpuCopyParams>(), 16);
        assert_eq!(std::mem::size_of::<GpuBoolParams>(), 16);
    }

    #[test]
    fn test_slice_uniforms_gpu_layout() {
        let u = SliceUniforms {
            cutoff: 0.5,
            parity: TargetKey::Scratch,
            lattice: true,
            view: ViewSize::new(360, 240),
        };
        let gpu = u.to_gpu();
        assert_eq!(gpu.cutoff, 0.5);
        assert_eq!(gpu.lattice, 1);
        assert_eq!((gpu.view_width, gpu.view_height), (360, 240));
        assert_eq!(u.sources(), vec![TargetKey::Scratch]);
    }

    #[test]
    fn test_set_view_updates_image_programs() {
        let view = ViewSize::new(1280, 800);
        let mut copy = CopyUniforms::default();
        copy.set_view(view);
        assert_eq!(copy.to_gpu().view_width, 1280);

        let mut flat = FlatUniforms::default();
        flat.set_view(view);
        assert_eq!(flat, FlatUniforms::default());
    }

    #[test]
    fn test_bool_op_truth_table() {
        let cases = [(false, false), (false, true), (true, false), (true, true)];
        let xor: Vec<_> = cases.iter().map(|&(a, b)| BoolOp::Xor.apply(a, b)).collect();
        let or: Vec<_> = cases.iter().map(|&(a, b)| BoolOp::Or.apply(a, b)).collect();
        let and: Vec<_> = cases.iter().map(|&(a, b)| BoolOp::And.apply(a, b)).collect();
        assert_eq!(xor, [false, true, true, false]);
        assert_eq!(or, [false, true, true, true]);
        assert_eq!(and, [false, false, false, true]);
    }

    #[test]
    fn test_bool_sources_in_binding_order() {
        let u = BoolUniforms {
            op: BoolOp::Or,
            first: TargetKey::Temp1,
            second: TargetKey::Temp3,
            view: ViewSize::default(),
        };
        assert_eq!(u.sources(), vec![TargetKey::Temp1, TargetKey::Temp3]);
        assert_eq!(u.to_gpu().op, 1);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(FlatUniforms::KIND, ProgramKind::Flat);
        assert_eq!(BoolUniforms::KIND, ProgramKind::BoolCombine);
        assert!(SliceUniforms::KIND.draws_objects());
        assert!(!ErodeDilateUniforms::KIND.draws_objects());
    }
}
