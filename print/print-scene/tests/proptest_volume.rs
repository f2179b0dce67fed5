//! Property-based tests for print volume bounds and scene state restoration.
//!
//! Run with: cargo test -p print-scene -- proptest

#![allow(clippy::unwrap_used, clippy::expect_used)]

use nalgebra::Point3;
use print_scene::{PrintVolume, ProgramKind, Scene, SceneState};
use proptest::prelude::*;

fn arb_dim() -> impl Strategy<Value = f64> {
    1.0e-3..1.0e4f64
}

fn arb_state() -> impl Strategy<Value = SceneState> {
    (
        any::<bool>(),
        any::<bool>(),
        prop::option::of(prop::sample::select(ProgramKind::ALL.to_vec())),
    )
        .prop_map(|(volume_visible, objects_visible, override_program)| SceneState {
            volume_visible,
            objects_visible,
            override_program,
        })
}

proptest! {
    #[test]
    fn resize_sets_exact_bounds(
        (w0, d0, h0) in (arb_dim(), arb_dim(), arb_dim()),
        (w, d, h) in (arb_dim(), arb_dim(), arb_dim()),
    ) {
        let mut volume = PrintVolume::new(w0, d0, h0).unwrap();
        volume.resize(w, d, h).unwrap();
        let bbox = volume.bounding_box();
        prop_assert_eq!(bbox.min, Point3::new(-w / 2.0, -d / 2.0, 0.0));
        prop_assert_eq!(bbox.max, Point3::new(w / 2.0, d / 2.0, h));
    }

    #[test]
    fn non_positive_resize_is_rejected(w in -1.0e4..=0.0f64, d in arb_dim(), h in arb_dim()) {
        let mut volume = PrintVolume::new(1.0, 1.0, 1.0).unwrap();
        prop_assert!(volume.resize(w, d, h).is_err());
        prop_assert!(volume.resize(d, w, h).is_err());
        prop_assert!(volume.resize(d, h, w).is_err());
        prop_assert_eq!(volume.width(), 1.0);
    }

    #[test]
    fn override_scope_restores_any_state(before in arb_state(), during in arb_state()) {
        let scene = Scene::new(PrintVolume::new(10.0, 10.0, 10.0).unwrap());
        scene.restore(before);
        scene.with_override(|s| s.restore(during));
        prop_assert_eq!(scene.state(), before);
    }
}
