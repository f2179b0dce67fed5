//! Job error types.

use print_config::ConfigError;
use thiserror::Error;

use crate::archive::ArchiveError;

/// Boxed error from a renderer or engine.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a slicing job did not produce an archive.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JobError {
    /// The job was cancelled before `layer` started.
    #[error("slicing cancelled before layer {layer}")]
    Cancelled {
        /// First layer that was not rendered.
        layer: u32,
    },

    /// Rendering or encoding a layer failed.
    #[error("layer {layer} at z = {z_mm} mm failed: {source}")]
    Layer {
        /// 1-based layer index.
        layer: u32,
        /// Slice height.
        z_mm: f64,
        /// Underlying failure.
        #[source]
        source: BoxedError,
    },

    /// Writing the archive failed.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Serializing the configuration manifest failed.
    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),

    /// The printer or job configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The renderer could not be created or sized.
    #[error("job setup failed: {0}")]
    Setup(#[source] BoxedError),

    /// `start` was called on a job that already ran.
    #[error("slicing job already started")]
    AlreadyStarted,

    /// `step` was called before `start`.
    #[error("slicing job not started")]
    NotStarted,

    /// `step` was called after the job reached a terminal state.
    #[error("slicing job already finished")]
    Finished,
}

impl JobError {
    /// Whether the job stopped because it was cancelled rather than
    /// because something failed.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_cancelled() {
        let err = JobError::Cancelled { layer: 7 };
        assert!(err.to_string().contains("layer 7"));
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_error_display_layer() {
        let err = JobError::Layer {
            layer: 3,
            z_mm: 0.075,
            source: "device lost".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("layer 3"));
        assert!(msg.contains("0.075"));
        assert!(msg.contains("device lost"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error;
        let err = JobError::Setup("no adapter".into());
        assert_eq!(err.source().map(ToString::to_string), Some("no adapter".into()));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<JobError>();
    }
}
