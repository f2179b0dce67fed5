//! Axis-aligned boxes in scene millimeters.

use nalgebra::{Point3, Vector3};

/// Axis-aligned box. `min > max` on any axis means empty.
///
/// ```
/// use nalgebra::Point3;
/// use print_scene::Aabb;
///
/// let pts = [Point3::new(-1.0, 0.0, 2.0), Point3::new(3.0, 4.0, 5.0)];
/// let aabb = Aabb::from_points(pts.iter());
/// assert_eq!(aabb.max.z, 5.0);
/// assert_eq!(aabb.size().x, 4.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Lower corner.
    pub min: Point3<f64>,
    /// Upper corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Box spanned by two arbitrary corners.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: a.inf(&b),
            max: a.sup(&b),
        }
    }

    /// The empty box, identity of [`Aabb::union`].
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::from([f64::INFINITY; 3]),
            max: Point3::from([f64::NEG_INFINITY; 3]),
        }
    }

    /// Tightest box around `points`.
    #[must_use]
    pub fn from_points<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Self {
        points.fold(Self::empty(), |acc, p| Self {
            min: acc.min.inf(p),
            max: acc.max.sup(p),
        })
    }

    /// Whether the box holds no point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Edge lengths.
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Midpoint.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Whether a slice plane at height `z` passes through the box.
    #[must_use]
    pub fn spans_z(&self, z: f64) -> bool {
        !self.is_empty() && self.min.z <= z && z <= self.max.z
    }

    /// Box around both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => *other,
            (_, true) => *self,
            _ => Self {
                min: self.min.inf(&other.min),
                max: self.max.sup(&other.max),
            },
        }
    }

    /// Shifted by `offset`. Empty stays empty.
    #[must_use]
    pub fn translated(&self, offset: &Vector3<f64>) -> Self {
        if self.is_empty() {
            *self
        } else {
            Self {
                min: self.min + offset,
                max: self.max + offset,
            }
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
