//! Pixel pitch and morphology radii derived from the output resolution.

/// Largest radius a single erode/dilate pass handles. Larger radii are
/// split into several passes.
pub const MAX_PASS_RADIUS: u32 = 10;

/// Smallest shell erosion in pixels. A thinner disk element does not keep
/// the eroded region 4-connected.
pub const MIN_SHELL_PIXELS: u32 = 3;

/// Pixel pitch plus the raft and shell radii at that pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelGeometry {
    /// Millimeters covered by one pixel along X.
    pub pixel_width_mm: f64,
    /// Millimeters covered by one pixel along Y.
    pub pixel_height_mm: f64,
    /// Raft dilation radius in pixels.
    pub raft_dilate_px: u32,
    /// Shell erosion radius in pixels, `0` when shelling is off.
    pub shell_erode_px: u32,
}

impl PixelGeometry {
    /// Nominal geometry before the first render: pitches as given, no
    /// morphology.
    #[must_use]
    pub const fn nominal(pixel_width_mm: f64, pixel_height_mm: f64) -> Self {
        Self {
            pixel_width_mm,
            pixel_height_mm,
            raft_dilate_px: 0,
            shell_erode_px: 0,
        }
    }

    /// Recompute for a `width` x `height` raster over a
    /// `volume_width` x `volume_depth` footprint.
    ///
    /// A non-positive `raft_outset_mm` disables dilation; a non-positive
    /// `shell_inset_mm` disables shelling. Enabled shelling never erodes
    /// fewer than [`MIN_SHELL_PIXELS`].
    #[must_use]
    pub fn derive(
        volume_width: f64,
        volume_depth: f64,
        width: u32,
        height: u32,
        raft_outset_mm: f64,
        shell_inset_mm: f64,
    ) -> Self {
        let pixel_width_mm = volume_width / f64::from(width);
        let pixel_height_mm = volume_depth / f64::from(height);

        let raft_dilate_px = if raft_outset_mm > 0.0 {
            mm_to_px(raft_outset_mm, pixel_width_mm)
        } else {
            0
        };
        let shell_erode_px = if shell_inset_mm > 0.0 {
            mm_to_px(shell_inset_mm, pixel_width_mm).max(MIN_SHELL_PIXELS)
        } else {
            0
        };

        Self {
            pixel_width_mm,
            pixel_height_mm,
            raft_dilate_px,
            shell_erode_px,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
// Callers pass positive distances; the saturating cast clamps anything absurd.
fn mm_to_px(mm: f64, pitch_mm: f64) -> u32 {
    (mm / pitch_mm).round() as u32
}

/// Split a morphology radius into per-pass radii of at most
/// [`MAX_PASS_RADIUS`], remainder first.
///
/// ```
/// use print_gpu::geometry::pass_radii;
///
/// assert_eq!(pass_radii(23), vec![3, 10, 10]);
/// assert_eq!(pass_radii(20), vec![10, 10]);
/// assert!(pass_radii(0).is_empty());
/// ```
#[must_use]
pub fn pass_radii(total: u32) -> Vec<u32> {
    let mut passes = Vec::new();
    let mut remaining = total;
    while remaining > 0 {
        let pixels = match remaining % MAX_PASS_RADIUS {
            0 => MAX_PASS_RADIUS,
            r => r,
        };
        passes.push(pixels);
        remaining -= pixels;
    }
    passes
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_derive_pitch() {
        let g = PixelGeometry::derive(36.0, 24.0, 360, 240, 1.0, 0.0);
        assert_relative_eq!(g.pixel_width_mm, 0.1);
        assert_relative_eq!(g.pixel_height_mm, 0.1);
        assert_eq!(g.raft_dilate_px, 10);
        assert_eq!(g.shell_erode_px, 0);
    }

    #[test]
    fn test_shell_clamped_to_minimum() {
        // 0.12 mm at 0.1 mm/px rounds to 1 px.
        let g = PixelGeometry::derive(36.0, 24.0, 360, 240, 0.0, 0.12);
        assert_eq!(g.shell_erode_px, MIN_SHELL_PIXELS);
        let g = PixelGeometry::derive(36.0, 24.0, 360, 240, 0.0, 0.0001);
        assert_eq!(g.shell_erode_px, MIN_SHELL_PIXELS);
    }

    #[test]
    fn test_shell_above_minimum_not_clamped() {
        let g = PixelGeometry::derive(36.0, 24.0, 360, 240, 0.0, 0.8);
        assert_eq!(g.shell_erode_px, 8);
    }

    #[test]
    fn test_disabled_morphology() {
        let g = PixelGeometry::derive(36.0, 24.0, 360, 240, -1.0, -1.0);
        assert_eq!(g.raft_dilate_px, 0);
        assert_eq!(g.shell_erode_px, 0);
    }

    #[test]
    fn test_pitch_follows_resolution() {
        let coarse = PixelGeometry::derive(96.0, 60.0, 640, 400, 1.0, 0.0);
        let fine = PixelGeometry::derive(96.0, 60.0, 1280, 800, 1.0, 0.0);
        assert_relative_eq!(coarse.pixel_width_mm, 2.0 * fine.pixel_width_mm);
        assert_eq!(fine.raft_dilate_px, 13);
        assert_eq!(coarse.raft_dilate_px, 7);
    }

    #[test]
    fn test_pass_radii() {
        assert_eq!(pass_radii(1), vec![1]);
        assert_eq!(pass_radii(10), vec![10]);
        assert_eq!(pass_radii(11), vec![1, 10]);
        assert_eq!(pass_radii(35), vec![5, 10, 10, 10]);
    }
}
