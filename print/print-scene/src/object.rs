//! Printable objects placed in the scene.

use nalgebra::Vector3;

use crate::bounds::Aabb;
use crate::mesh::TriangleMesh;

/// A mesh placed in the print volume by a translation.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintObject {
    /// Display name.
    pub name: String,
    /// World-space translation applied to every vertex, mm.
    pub position: Vector3<f64>,
    /// Object-local geometry.
    pub mesh: TriangleMesh,
}

impl PrintObject {
    /// Place `mesh` at the origin.
    #[must_use]
    pub fn new(name: impl Into<String>, mesh: TriangleMesh) -> Self {
        Self {
            name: name.into(),
            position: Vector3::zeros(),
            mesh,
        }
    }

    /// Builder-style placement.
    #[must_use]
    pub fn at(mut self, position: Vector3<f64>) -> Self {
        self.position = position;
        self
    }

    /// Bounds of the local geometry.
    #[must_use]
    pub fn local_bounding_box(&self) -> Aabb {
        self.mesh.bounding_box()
    }

    /// Bounds after applying `position`.
    #[must_use]
    pub fn world_bounding_box(&self) -> Aabb {
        self.local_bounding_box().translated(&self.position)
    }

    /// Highest world Z reached by the geometry, `position.z + bbox.max.z`.
    ///
    /// `None` for an empty mesh.
    #[must_use]
    pub fn top_z(&self) -> Option<f64> {
        let bbox = self.local_bounding_box();
        (!bbox.is_empty()).then(|| self.position.z + bbox.max.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_bounds_follow_position() {
        let obj = PrintObject::new("sphere", TriangleMesh::uv_sphere(10.0, 16, 8))
            .at(Vector3::new(1.0, 2.0, 20.0));
        let bbox = obj.world_bounding_box();
        assert!((bbox.max.z - 30.0).abs() < 1e-9);
        assert!((bbox.min.z - 10.0).abs() < 1e-9);
        assert_eq!(obj.top_z(), Some(bbox.max.z));
    }

    #[test]
    fn test_empty_object_has_no_top() {
        let obj = PrintObject::new("empty", TriangleMesh::default());
        assert_eq!(obj.top_z(), None);
    }
}
