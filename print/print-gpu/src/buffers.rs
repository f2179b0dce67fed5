//! Vertex and index buffers for scene geometry and the image-pass quad.

use print_scene::{Scene, SceneError, TriangleMesh};
use tracing::debug;
use wgpu::util::DeviceExt;
use wgpu::{Buffer, BufferUsages};

use crate::camera::SLICER_BACKGROUND_Z;
use crate::context::GpuContext;
use crate::error::{GpuError, GpuResult};

/// Half extent of the background quad, far outside any print volume.
pub const BACKGROUND_HALF_EXTENT: f32 = 5000.0;

/// Indexed triangle geometry resident on the GPU.
#[derive(Debug)]
pub struct GeometryBuffers {
    /// `[f32; 3]` positions.
    pub vertices: Buffer,
    /// `u32` triangle indices.
    pub indices: Buffer,
    /// Number of indices to draw.
    pub index_count: u32,
}

/// CPU-side world-space geometry of every object in a scene, flattened
/// into one vertex and index list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGeometry {
    /// World positions.
    pub positions: Vec<[f32; 3]>,
    /// Triangle indices into `positions`.
    pub indices: Vec<u32>,
}

impl SceneGeometry {
    /// Collect every object's triangles translated into world space.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::InvalidScene`] if a face indexes past its mesh's
    /// vertices, and [`GpuError::Execution`] if the scene has more vertices
    /// than a `u32` index can address.
    #[allow(clippy::cast_possible_truncation)]
    // Positions are uploaded as f32.
    pub fn collect(scene: &Scene) -> GpuResult<Self> {
        let mut geometry = Self::default();
        for object in scene.objects() {
            let mesh: &TriangleMesh = &object.mesh;
            if let Some((face, index)) = mesh.first_invalid_face() {
                return Err(SceneError::InvalidFace {
                    object: object.name.clone(),
                    face,
                    index,
                    vertices: mesh.vertices.len(),
                }
                .into());
            }
            let base = u32::try_from(geometry.positions.len())
                .map_err(|_| GpuError::Execution("scene has too many vertices".into()))?;
            geometry.positions.extend(mesh.vertices.iter().map(|v| {
                let p = v + object.position;
                [p.x as f32, p.y as f32, p.z as f32]
            }));
            geometry
                .indices
                .extend(mesh.faces.iter().flatten().map(|&i| base + i));
        }
        Ok(geometry)
    }

    /// Number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Upload to the GPU, `None` when there is nothing to draw.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::Execution`] if the index count overflows `u32`.
    pub fn upload(&self, ctx: &GpuContext, label: &str) -> GpuResult<Option<GeometryBuffers>> {
        if self.indices.is_empty() {
            return Ok(None);
        }
        let index_count = u32::try_from(self.indices.len())
            .map_err(|_| GpuError::Execution("too many indices".into()))?;

        let vertices = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}_vertices")),
                contents: bytemuck::cast_slice(&self.positions),
                usage: BufferUsages::VERTEX,
            });
        let indices = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}_indices")),
                contents: bytemuck::cast_slice(&self.indices),
                usage: BufferUsages::INDEX,
            });

        debug!(
            label,
            triangles = self.triangle_count(),
            bytes = vertices.size() + indices.size(),
            "geometry uploaded"
        );

        Ok(Some(GeometryBuffers {
            vertices,
            indices,
            index_count,
        }))
    }
}

/// Quad covering the whole view just below the platform. Image passes draw
/// it so every output pixel runs the fragment stage once.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn background_quad() -> SceneGeometry {
    let e = BACKGROUND_HALF_EXTENT;
    let z = SLICER_BACKGROUND_Z as f32;
    SceneGeometry {
        positions: vec![[-e, -e, z], [e, -e, z], [e, e, z], [-e, e, z]],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}
