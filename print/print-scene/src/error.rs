//! Scene error types.

use thiserror::Error;

/// Errors raised while building or mutating a scene.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SceneError {
    /// A print volume dimension is zero, negative or not finite.
    #[error("invalid print volume {width}x{depth}x{height} mm: all dimensions must be > 0")]
    InvalidVolume {
        /// Requested width.
        width: f64,
        /// Requested depth.
        depth: f64,
        /// Requested height.
        height: f64,
    },

    /// An object index is out of range.
    #[error("no print object at index {index} (scene has {len})")]
    NoSuchObject {
        /// Requested index.
        index: usize,
        /// Number of objects in the scene.
        len: usize,
    },

    /// A face refers to a vertex the mesh does not have.
    #[error("object '{object}' face {face} uses vertex {index}, mesh has {vertices}")]
    InvalidFace {
        /// Object name.
        object: String,
        /// Face index within the mesh.
        face: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertices: usize,
    },
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_volume() {
        let err = SceneError::InvalidVolume {
            width: 0.0,
            depth: 24.0,
            height: 50.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x24x50"));
    }

    #[test]
    fn test_error_display_no_such_object() {
        let err = SceneError::NoSuchObject { index: 4, len: 2 };
        assert!(err.to_string().contains("index 4"));
    }

    #[test]
    fn test_error_display_invalid_face() {
        let err = SceneError::InvalidFace {
            object: "cube".to_string(),
            face: 0,
            index: 99,
            vertices: 8,
        };
        assert_eq!(
            err.to_string(),
            "object 'cube' face 0 uses vertex 99, mesh has 8"
        );
    }
}
