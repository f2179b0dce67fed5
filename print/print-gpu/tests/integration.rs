//! Integration tests for print-gpu.
//!
//! Tests marked with `#[ignore]` require a GPU and should be run with:
//! ```bash
//! cargo test -p print-gpu -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::f64::consts::PI;

use nalgebra::{Point3, Vector3};
use print_gpu::{
    GpuContext, GpuError, OrthoCamera, PixelGeometry, RenderTargets, SliceImage, SlicingEngine,
    TargetKey, pass_radii, slice_cutoff,
};
use print_scene::{PrintObject, PrintVolume, Scene, SceneState, TriangleMesh};

/// 36 x 24 x 50 mm volume with a 10 mm ball centered at z = 20.
fn sphere_scene() -> Scene {
    let mut scene = Scene::new(PrintVolume::new(36.0, 24.0, 50.0).unwrap());
    scene.add_object(
        PrintObject::new("ball", TriangleMesh::uv_sphere(10.0, 64, 32))
            .at(Vector3::new(0.0, 0.0, 20.0)),
    );
    scene
}

/// Engine at 0.1 mm per pixel with a 1.5 mm raft grown by 1 mm.
fn engine(scene: &Scene, shell_inset_mm: f64) -> SlicingEngine<'_> {
    let mut engine = SlicingEngine::new(scene, 0.1, 0.1, 1.5, 1.0, shell_inset_mm).unwrap();
    engine.set_size(360, 240).unwrap();
    engine
}

/// Area in pixels of a disk of radius `r` mm at 0.1 mm per pixel.
fn disk_pixels(r: f64) -> f64 {
    PI * r * r / 0.01
}

fn assert_close(actual: usize, expected: f64, tolerance: f64) {
    #[allow(clippy::cast_precision_loss)]
    let ratio = actual as f64 / expected;
    assert!(
        (ratio - 1.0).abs() <= tolerance,
        "expected ~{expected:.0} px, got {actual} (ratio {ratio:.3})"
    );
}

// ============================================================================
// Non-GPU tests (always run)
// ============================================================================

#[test]
fn test_gpu_context_availability_check() {
    let _available = GpuContext::is_available();
}

#[test]
fn test_projector_geometry() {
    let g = PixelGeometry::derive(96.0, 60.0, 1280, 800, 1.0, 0.1);
    assert!((g.pixel_width_mm - 0.075).abs() < 1e-12);
    assert!((g.pixel_height_mm - 0.075).abs() < 1e-12);
    assert_eq!(g.raft_dilate_px, 13);
    assert_eq!(g.shell_erode_px, 3);
    assert_eq!(pass_radii(g.raft_dilate_px), vec![3, 10]);
}

#[test]
fn test_slice_plane_depth_matches_cutoff() {
    let camera = OrthoCamera::slice(18.0, 12.0, 50.0);
    for z in [0.025, 1.5, 20.0, 25.0] {
        let p = camera.project(&Point3::new(1.0, 1.0, z));
        assert!((p.z - (1.0 - slice_cutoff(z, 50.0))).abs() < 1e-9);
    }
}

#[test]
fn test_target_set_after_resize() {
    #[derive(Debug)]
    struct Target {
        width: u32,
        height: u32,
    }

    let make = |_, width, height| Ok::<_, ()>(Target { width, height });
    let mut targets = RenderTargets::allocate(1, 1, make).unwrap();
    targets.swap(TargetKey::Temp1, TargetKey::Scratch);

    targets = RenderTargets::allocate(1280, 800, make).unwrap();
    for key in TargetKey::ALL {
        let t = targets.get(key);
        assert_eq!((t.width, t.height), (1280, 800));
    }
}

#[test]
fn test_slice_image_png() {
    let image = SliceImage {
        width: 4,
        height: 2,
        pixels: vec![0, 255, 255, 0, 255, 0, 0, 255],
    };
    let png = image.to_png().unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_luma8();
    assert_eq!(decoded.dimensions(), (4, 2));
    assert_eq!(decoded.into_raw(), image.pixels);
}

// ============================================================================
// GPU tests (require GPU, run with --ignored)
// ============================================================================

#[test]
#[ignore = "Requires GPU"]
fn test_slice_through_sphere_matches_cross_section() {
    let scene = sphere_scene();
    let mut engine = engine(&scene, 0.0);

    let mask = engine.slice_at_to_mask(25.0).unwrap();
    assert_eq!((mask.width, mask.height), (360, 240));
    // Cross-section radius at 5 mm above the center: sqrt(100 - 25).
    assert_close(mask.white_pixel_count(), disk_pixels(75.0_f64.sqrt()), 0.03);
}

#[test]
#[ignore = "Requires GPU"]
fn test_slice_outside_object_is_black() {
    let scene = sphere_scene();
    let mut engine = engine(&scene, 0.0);
    assert_eq!(engine.slice_at_to_mask(35.0).unwrap().white_pixel_count(), 0);
    assert_eq!(engine.slice_at_to_mask(5.0).unwrap().white_pixel_count(), 0);
}

#[test]
#[ignore = "Requires GPU"]
fn test_raft_is_dilated_silhouette() {
    let scene = sphere_scene();
    let mut engine = engine(&scene, 0.0);

    let mask = engine.slice_at_to_mask(0.025).unwrap();
    assert_eq!(engine.raft_dilate_pixels(), 10);
    assert_close(mask.white_pixel_count(), disk_pixels(11.0), 0.03);
}

#[test]
#[ignore = "Requires GPU"]
fn test_raft_boundary_is_inclusive() {
    let scene = sphere_scene();
    let mut engine = engine(&scene, 0.0);

    // The ball does not reach z = 1.5, so only the raft path draws anything.
    let at_raft = engine.slice_at_to_mask(1.5).unwrap();
    assert_close(at_raft.white_pixel_count(), disk_pixels(11.0), 0.03);
    let above = engine.slice_at_to_mask(1.5 + 0.025).unwrap();
    assert_eq!(above.white_pixel_count(), 0);
}

#[test]
#[ignore = "Requires GPU"]
fn test_scene_state_restored_after_slicing() {
    let scene = sphere_scene();
    let mut engine = engine(&scene, 1.0).with_z_shell(true);

    engine.slice_at(0.025).unwrap();
    assert_eq!(scene.state(), SceneState::default());
    engine.slice_at(25.0).unwrap();
    assert_eq!(scene.state(), SceneState::default());
    engine.render_depth_map().unwrap();
    assert_eq!(scene.state(), SceneState::default());
}

#[test]
#[ignore = "Requires GPU"]
fn test_shell_leaves_a_ring() {
    let scene = sphere_scene();
    let mut solid = engine(&scene, 0.0);
    let mut hollow = engine(&scene, 1.0);

    let full = solid.slice_at_to_mask(25.0).unwrap().white_pixel_count();
    let ring = hollow.slice_at_to_mask(25.0).unwrap().white_pixel_count();
    assert_eq!(hollow.shell_erode_pixels(), 10);
    assert!(ring > 0);
    assert!(ring < full);

    let outer: f64 = 75.0_f64.sqrt();
    let expected = disk_pixels(outer) - disk_pixels(outer - 1.0);
    assert_close(ring, expected, 0.1);
}

#[test]
#[ignore = "Requires GPU"]
fn test_z_shell_fills_near_top() {
    let scene = sphere_scene();
    let mut xy_only = engine(&scene, 1.0);
    let mut with_z = engine(&scene, 1.0).with_z_shell(true);

    // 0.5 mm below the top every pixel of the section is under the surface.
    let ring = xy_only.slice_at_to_mask(29.5).unwrap().white_pixel_count();
    let filled = with_z.slice_at_to_mask(29.5).unwrap().white_pixel_count();
    let section = disk_pixels((100.0_f64 - 9.5 * 9.5).sqrt());
    assert!(filled > ring);
    assert_close(filled, section, 0.1);
}

#[test]
#[ignore = "Requires GPU"]
fn test_resize_reallocates_targets() {
    let scene = sphere_scene();
    let mut engine = engine(&scene, 0.0);
    engine.slice_at(25.0).unwrap();
    assert_eq!(engine.target_size(), Some((360, 240)));

    engine.set_size(720, 480).unwrap();
    let mask = engine.slice_at_to_mask(25.0).unwrap();
    assert_eq!(engine.target_size(), Some((720, 480)));
    assert!((engine.pixel_width_mm() - 0.05).abs() < 1e-12);
    assert_eq!(engine.raft_dilate_pixels(), 20);
    // Four times the pixels for the same area.
    assert_close(mask.white_pixel_count(), 4.0 * disk_pixels(75.0_f64.sqrt()), 0.03);
}

#[test]
#[ignore = "Requires GPU"]
fn test_zero_size_rejected() {
    let scene = sphere_scene();
    let mut engine = engine(&scene, 0.0);
    assert!(matches!(
        engine.set_size(0, 240),
        Err(GpuError::InvalidSize { width: 0, height: 240 })
    ));
    assert_eq!(engine.output_size(), (360, 240));
}

#[test]
#[ignore = "Requires GPU"]
fn test_png_output() {
    let scene = sphere_scene();
    let mut engine = engine(&scene, 0.0);
    let png = engine.slice_at_to_image(25.0).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_luma8();
    assert_eq!(decoded.dimensions(), (360, 240));
    // Center of the ball is inside, the corner is not.
    assert_eq!(decoded.get_pixel(180, 120).0[0], 255);
    assert_eq!(decoded.get_pixel(0, 0).0[0], 0);
}

#[test]
#[ignore = "Requires GPU"]
fn test_depth_map_finds_top_of_sphere() {
    let scene = sphere_scene();
    let mut engine = engine(&scene, 0.0);
    let depth = engine.render_depth_map().unwrap();
    let top = depth.max_height().unwrap();
    assert!((top - 30.0).abs() < 0.05, "top at {top}");
    assert_eq!(depth.get(0, 0), None);
}

#[test]
#[ignore = "Requires GPU"]
fn test_empty_scene_slices_black() {
    let scene = Scene::new(PrintVolume::new(36.0, 24.0, 50.0).unwrap());
    let mut engine = engine(&scene, 0.0);
    assert_eq!(engine.slice_at_to_mask(0.025).unwrap().white_pixel_count(), 0);
    assert_eq!(engine.slice_at_to_mask(10.0).unwrap().white_pixel_count(), 0);
}
