//! Identifiers of the GPU programs a scene can be rendered with.

use std::fmt;

/// A GPU program that can replace every object's normal material while the
/// scene is being sliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Unlit white silhouette.
    Flat,
    /// Fragment depth packed into RGBA.
    Depth,
    /// Front/back face parity above the slice plane.
    Intersection,
    /// Binary inside/outside mask below the slice plane.
    Slice,
    /// Disk-shaped morphological min/max filter.
    ErodeDilate,
    /// Texel-exact blit.
    Copy,
    /// Pixel-wise xor / or / and of two masks.
    BoolCombine,
}

impl ProgramKind {
    /// Every program kind.
    pub const ALL: [Self; 7] = [
        Self::Flat,
        Self::Depth,
        Self::Intersection,
        Self::Slice,
        Self::ErodeDilate,
        Self::Copy,
        Self::BoolCombine,
    ];

    /// Short lowercase label, also used for GPU debug labels.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Depth => "depth",
            Self::Intersection => "intersection",
            Self::Slice => "slice",
            Self::ErodeDilate => "erode_dilate",
            Self::Copy => "copy",
            Self::BoolCombine => "bool_combine",
        }
    }

    /// True for programs drawn over the scene's objects; false for image
    /// passes drawn over a full-frame quad.
    #[must_use]
    pub const fn draws_objects(self) -> bool {
        matches!(
            self,
            Self::Flat | Self::Depth | Self::Intersection | Self::Slice
        )
    }
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
