//! Scene model for resin printer slicing.
//!
//! A [`Scene`] owns a [`PrintVolume`] and an ordered list of
//! [`PrintObject`]s. The slicer borrows the scene and temporarily flips its
//! visibility and override-program flags through a [`SceneOverride`] guard,
//! which restores them on every exit path.
//!
//! # Coordinates
//!
//! Millimeters, right-handed, Z up. The platform is the `z = 0` plane and
//! the volume is centered on the origin in X and Y.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod bounds;
pub mod error;
pub mod mesh;
pub mod object;
pub mod program;
pub mod scene;
pub mod volume;

pub use bounds::Aabb;
pub use error::{SceneError, SceneResult};
pub use mesh::TriangleMesh;
pub use object::PrintObject;
pub use program::ProgramKind;
pub use scene::{Scene, SceneOverride, SceneState};
pub use volume::PrintVolume;
