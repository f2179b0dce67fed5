//! The printable volume of a printer.

use nalgebra::Point3;
use tracing::debug;

use crate::bounds::Aabb;
use crate::error::{SceneError, SceneResult};

/// Axis-aligned build volume centered on the platform in X and Y.
///
/// The box spans `(-width/2, -depth/2, 0)` to `(width/2, depth/2, height)`
/// and is recomputed whenever the volume is resized.
///
/// # Example
///
/// ```
/// use print_scene::PrintVolume;
///
/// let volume = PrintVolume::new(36.0, 24.0, 50.0).unwrap();
/// assert_eq!(volume.bounding_box().min.x, -18.0);
/// assert_eq!(volume.bounding_box().max.z, 50.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PrintVolume {
    width: f64,
    depth: f64,
    height: f64,
    bounding_box: Aabb,
}

impl PrintVolume {
    /// Create a volume. Every dimension must be strictly positive and finite.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidVolume`] otherwise.
    pub fn new(width: f64, depth: f64, height: f64) -> SceneResult<Self> {
        check_dimensions(width, depth, height)?;
        Ok(Self {
            width,
            depth,
            height,
            bounding_box: box_for(width, depth, height),
        })
    }

    /// Change the dimensions and recompute the bounding box.
    ///
    /// The volume is left unchanged when the new dimensions are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::InvalidVolume`] for non-positive dimensions.
    pub fn resize(&mut self, width: f64, depth: f64, height: f64) -> SceneResult<()> {
        check_dimensions(width, depth, height)?;
        self.width = width;
        self.depth = depth;
        self.height = height;
        self.bounding_box = box_for(width, depth, height);
        debug!(width, depth, height, "print volume resized");
        Ok(())
    }

    /// Extent along X in mm.
    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Extent along Y in mm.
    #[must_use]
    pub const fn depth(&self) -> f64 {
        self.depth
    }

    /// Extent along Z in mm.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Box spanned by the volume.
    #[must_use]
    pub const fn bounding_box(&self) -> &Aabb {
        &self.bounding_box
    }
}

fn check_dimensions(width: f64, depth: f64, height: f64) -> SceneResult<()> {
    let ok = |v: f64| v.is_finite() && v > 0.0;
    if ok(width) && ok(depth) && ok(height) {
        Ok(())
    } else {
        Err(SceneError::InvalidVolume {
            width,
            depth,
            height,
        })
    }
}

fn box_for(width: f64, depth: f64, height: f64) -> Aabb {
    Aabb {
        min: Point3::new(-width / 2.0, -depth / 2.0, 0.0),
        max: Point3::new(width / 2.0, depth / 2.0, height),
    }
}
