//! Property tests for pixel geometry and pass splitting.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use print_gpu::{MAX_PASS_RADIUS, MIN_SHELL_PIXELS, PixelGeometry, pass_radii, slice_cutoff};
use proptest::prelude::*;

proptest! {
    #[test]
    fn pass_radii_cover_total(total in 0u32..500) {
        let passes = pass_radii(total);
        prop_assert_eq!(passes.iter().sum::<u32>(), total);
        prop_assert!(passes.iter().all(|&r| r >= 1 && r <= MAX_PASS_RADIUS));
        // Only the first pass may be partial.
        prop_assert!(passes.iter().skip(1).all(|&r| r == MAX_PASS_RADIUS));
    }

    #[test]
    fn shell_never_below_minimum(
        inset in 1e-4f64..5.0,
        width in 100u32..4000,
        height in 100u32..4000,
    ) {
        let g = PixelGeometry::derive(96.0, 60.0, width, height, 0.0, inset);
        prop_assert!(g.shell_erode_px >= MIN_SHELL_PIXELS);
    }

    #[test]
    fn disabled_shell_is_zero(inset in -5.0f64..=0.0) {
        let g = PixelGeometry::derive(96.0, 60.0, 1280, 800, 1.0, inset);
        prop_assert_eq!(g.shell_erode_px, 0);
    }

    #[test]
    fn cutoff_increases_with_z(h in 1.0f64..200.0, a in 0.0f64..1.0, b in 0.0f64..1.0) {
        let (lo, hi) = if a < b { (a * h, b * h) } else { (b * h, a * h) };
        prop_assert!(slice_cutoff(lo, h) <= slice_cutoff(hi, h));
        prop_assert!(slice_cutoff(hi, h) <= 1.0);
    }
}
