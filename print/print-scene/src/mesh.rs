//! Indexed triangle meshes.
//!
//! Faces wind counter-clockwise when seen from outside the solid, so face
//! normals point outward. The slicer relies on this to tell the inside of a
//! solid from the outside.

use std::f64::consts::PI;

use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;

/// A triangle mesh in object-local millimeter coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3<f64>>,
    /// Triangles as indices into `vertices`, CCW from outside.
    pub faces: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create a mesh from raw buffers.
    #[must_use]
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Axis-aligned bounds of the vertices.
    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter())
    }

    /// Number of triangles.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True if the mesh has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Iterate triangles as vertex triples. Faces with out-of-range indices
    /// are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f64>; 3]> + '_ {
        self.faces.iter().filter_map(|face| {
            let a = self.vertices.get(face[0] as usize)?;
            let b = self.vertices.get(face[1] as usize)?;
            let c = self.vertices.get(face[2] as usize)?;
            Some([*a, *b, *c])
        })
    }

    /// First face index and vertex index that fall outside `vertices`.
    #[must_use]
    pub fn first_invalid_face(&self) -> Option<(usize, u32)> {
        let len = self.vertices.len();
        self.faces.iter().enumerate().find_map(|(f, face)| {
            face.iter()
                .find(|&&i| i as usize >= len)
                .map(|&i| (f, i))
        })
    }

    /// Signed enclosed volume in mm³. Positive for outward-facing winding.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)) / 6.0)
            .sum()
    }

    /// Axis-aligned box centered on the origin.
    #[must_use]
    pub fn cuboid(size: Vector3<f64>) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Point3::new(-h.x, -h.y, -h.z),
            Point3::new(h.x, -h.y, -h.z),
            Point3::new(h.x, h.y, -h.z),
            Point3::new(-h.x, h.y, -h.z),
            Point3::new(-h.x, -h.y, h.z),
            Point3::new(h.x, -h.y, h.z),
            Point3::new(h.x, h.y, h.z),
            Point3::new(-h.x, h.y, h.z),
        ];
        let faces = vec![
            // -Z
            [0, 2, 1],
            [0, 3, 2],
            // +Z
            [4, 5, 6],
            [4, 6, 7],
            // -Y
            [0, 1, 5],
            [0, 5, 4],
            // +Y
            [2, 3, 7],
            [2, 7, 6],
            // -X
            [0, 4, 7],
            [0, 7, 3],
            // +X
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self { vertices, faces }
    }

    /// Latitude/longitude sphere centered on the origin.
    ///
    /// `segments` is clamped to at least 3 and `rings` to at least 2.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn uv_sphere(radius: f64, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut vertices = Vec::with_capacity((segments * (rings - 1) + 2) as usize);
        vertices.push(Point3::new(0.0, 0.0, radius));
        for ring in 1..rings {
            let theta = PI * f64::from(ring) / f64::from(rings);
            let (sin_t, cos_t) = theta.sin_cos();
            for seg in 0..segments {
                let phi = 2.0 * PI * f64::from(seg) / f64::from(segments);
                let (sin_p, cos_p) = phi.sin_cos();
                vertices.push(Point3::new(
                    radius * sin_t * cos_p,
                    radius * sin_t * sin_p,
                    radius * cos_t,
                ));
            }
        }
        vertices.push(Point3::new(0.0, 0.0, -radius));
        let south = vertices.len() as u32 - 1;

        let ring_start = |ring: u32| 1 + (ring - 1) * segments;
        let mut faces = Vec::with_capacity((2 * segments * (rings - 1)) as usize);

        for seg in 0..segments {
            let next = (seg + 1) % segments;
            faces.push([0, ring_start(1) + seg, ring_start(1) + next]);
        }
        for ring in 1..rings - 1 {
            let upper = ring_start(ring);
            let lower = ring_start(ring + 1);
            for seg in 0..segments {
                let next = (seg + 1) % segments;
                faces.push([upper + seg, lower + seg, lower + next]);
                faces.push([upper + seg, lower + next, upper + next]);
            }
        }
        let last = ring_start(rings - 1);
        for seg in 0..segments {
            let next = (seg + 1) % segments;
            faces.push([south, last + next, last + seg]);
        }

        Self { vertices, faces }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cuboid_bounds_and_volume() {
        let mesh = TriangleMesh::cuboid(Vector3::new(2.0, 4.0, 6.0));
        let bbox = mesh.bounding_box();
        assert_eq!(bbox.min, Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(bbox.max, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.face_count(), 12);
        assert_relative_eq!(mesh.signed_volume(), 48.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sphere_is_outward_and_closed() {
        let mesh = TriangleMesh::uv_sphere(10.0, 64, 32);
        let exact = 4.0 / 3.0 * PI * 1000.0;
        let volume = mesh.signed_volume();
        assert!(volume > 0.0, "sphere winding must face outward");
        assert!((volume - exact).abs() / exact < 0.02);

        let bbox = mesh.bounding_box();
        assert_relative_eq!(bbox.max.z, 10.0);
        assert_relative_eq!(bbox.min.z, -10.0);
        assert_eq!(mesh.vertices.len(), 64 * 31 + 2);
        assert_eq!(mesh.face_count(), 2 * 64 * 31);
    }

    #[test]
    fn test_sphere_clamps_degenerate_resolution() {
        let mesh = TriangleMesh::uv_sphere(1.0, 0, 0);
        assert_eq!(mesh.vertices.len(), 3 + 2);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_triangles_skip_bad_indices() {
        let mesh = TriangleMesh::new(
            vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            vec![[0, 1, 2], [0, 1, 9]],
        );
        assert_eq!(mesh.triangles().count(), 1);
        assert_eq!(mesh.first_invalid_face(), Some((1, 9)));
    }

    #[test]
    fn test_generated_meshes_have_valid_faces() {
        assert_eq!(TriangleMesh::cuboid(Vector3::new(1.0, 1.0, 1.0)).first_invalid_face(), None);
        assert_eq!(TriangleMesh::uv_sphere(1.0, 8, 4).first_invalid_face(), None);
    }

    #[test]
    fn test_empty_mesh_bounds() {
        assert!(TriangleMesh::default().bounding_box().is_empty());
        assert!(TriangleMesh::default().is_empty());
    }
}
