//! Orthographic cameras that map the print volume onto the output raster.
//!
//! The slice camera sits above the volume looking down `-Z`. Normalized
//! depth is linear in world Z:
//!
//! ```text
//! ndc(zw) = (H - zw) / (FAR_Z_PADDING + H)
//! ```
//!
//! so the slice plane at height `z` lands at `1 - slice_cutoff(z, H)`.

use bytemuck::{Pod, Zeroable};
use nalgebra::{Isometry3, Matrix4, Point3, Vector3};

/// Extra depth range below the platform so geometry at `z = 0` is never
/// on the far plane.
pub const FAR_Z_PADDING: f64 = 1.0;

/// Distance from the camera to the top of the volume.
pub const CAMERA_NEAR: f64 = 1.0;

/// Height of the full-frame quad used by image passes.
pub const SLICER_BACKGROUND_Z: f64 = -0.1;

/// An orthographic camera.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthoCamera {
    /// Camera position.
    pub eye: Point3<f64>,
    /// Point looked at.
    pub target: Point3<f64>,
    /// Up direction.
    pub up: Vector3<f64>,
    /// Half the frustum width in mm.
    pub half_width: f64,
    /// Half the frustum height in mm.
    pub half_height: f64,
    /// Near plane distance.
    pub near: f64,
    /// Far plane distance.
    pub far: f64,
    /// Mirror Y in clip space. Used by the camera below the platform so its
    /// image lines up with the one from above.
    pub flip_y: bool,
}

impl OrthoCamera {
    /// Camera above a volume of height `volume_height`, looking straight
    /// down, with depth covering the full volume plus [`FAR_Z_PADDING`].
    #[must_use]
    pub fn slice(half_width: f64, half_height: f64, volume_height: f64) -> Self {
        Self {
            eye: Point3::new(0.0, 0.0, volume_height + CAMERA_NEAR),
            target: Point3::new(0.0, 0.0, volume_height),
            up: Vector3::y(),
            half_width,
            half_height,
            near: CAMERA_NEAR,
            far: FAR_Z_PADDING + volume_height + CAMERA_NEAR,
            flip_y: false,
        }
    }

    /// Camera above the volume that only sees the band `[z, z + thickness]`.
    #[must_use]
    pub fn band_from_above(
        half_width: f64,
        half_height: f64,
        volume_height: f64,
        z: f64,
        thickness: f64,
    ) -> Self {
        let eye_z = volume_height + CAMERA_NEAR;
        Self {
            near: (eye_z - (z + thickness)).max(f64::EPSILON),
            far: eye_z - z,
            ..Self::slice(half_width, half_height, volume_height)
        }
    }

    /// Camera below the platform looking up that only sees the band
    /// `[z - thickness, z]`. Pixels line up with [`OrthoCamera::slice`].
    #[must_use]
    pub fn band_from_below(half_width: f64, half_height: f64, z: f64, thickness: f64) -> Self {
        Self {
            eye: Point3::new(0.0, 0.0, -CAMERA_NEAR),
            target: Point3::new(0.0, 0.0, 0.0),
            // Looking up +Z with -Y up keeps +X to the right.
            up: -Vector3::y(),
            half_width,
            half_height,
            near: (z - thickness + CAMERA_NEAR).max(f64::EPSILON),
            far: z + CAMERA_NEAR,
            flip_y: true,
        }
    }

    /// World to view transform.
    #[must_use]
    pub fn view(&self) -> Matrix4<f64> {
        Isometry3::look_at_rh(&self.eye, &self.target, &self.up).to_homogeneous()
    }

    /// Orthographic projection into wgpu clip space (depth in `[0, 1]`).
    #[must_use]
    #[rustfmt::skip]
    pub fn projection(&self) -> Matrix4<f64> {
        let sy = if self.flip_y { -1.0 } else { 1.0 };
        let depth = self.far - self.near;
        Matrix4::new(
            1.0 / self.half_width, 0.0, 0.0, 0.0,
            0.0, sy / self.half_height, 0.0, 0.0,
            0.0, 0.0, -1.0 / depth, -self.near / depth,
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// Combined projection * view.
    #[must_use]
    pub fn view_proj(&self) -> Matrix4<f64> {
        self.projection() * self.view()
    }

    /// Project a world point to normalized device coordinates.
    #[must_use]
    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        self.view_proj().transform_point(point)
    }
}

/// Half extents of a frustum that fits a `volume_width` x `volume_depth`
/// footprint into a `width` x `height` pixel raster without distortion.
///
/// The larger of the two mm-per-pixel ratios is used for both axes.
#[must_use]
pub fn fit_frustum(volume_width: f64, volume_depth: f64, width: u32, height: u32) -> (f64, f64) {
    let (w, h) = (f64::from(width), f64::from(height));
    let scale = (volume_width / w).max(volume_depth / h);
    (scale * w / 2.0, scale * h / 2.0)
}

/// Normalized height of the slice plane, `(pad + z) / (pad + H)`.
#[must_use]
pub fn slice_cutoff(z: f64, volume_height: f64) -> f64 {
    (FAR_Z_PADDING + z) / (FAR_Z_PADDING + volume_height)
}

/// World Z of a slice-camera depth value.
#[must_use]
pub fn depth_to_world_z(ndc_depth: f64, volume_height: f64) -> f64 {
    volume_height - ndc_depth * (FAR_Z_PADDING + volume_height)
}

/// Camera uniform shared by every program (group 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    /// Column-major projection * view.
    pub view_proj: [[f32; 4]; 4],
    /// 1 when the projection mirrors Y.
    pub flip: u32,
    _pad: [u32; 3],
}

impl CameraUniform {
    /// Build from a camera.
    #[must_use]
    pub fn from_camera(camera: &OrthoCamera) -> Self {
        Self {
            view_proj: camera.view_proj().cast::<f32>().into(),
            flip: u32::from(camera.flip_y),
            _pad: [0; 3],
        }
    }
}
