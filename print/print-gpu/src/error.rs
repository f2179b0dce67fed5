//! Slicing engine errors.

use print_scene::SceneError;
use thiserror::Error;

/// Why a slice could not be rendered or read back.
///
/// ```
/// use print_gpu::GpuError;
///
/// let err = GpuError::InvalidSize { width: 0, height: 800 };
/// assert_eq!(err.to_string(), "slice target of 0x800 px is empty or beyond the device limit");
/// assert!(!err.is_device_fault());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GpuError {
    /// No adapter can render the slice formats.
    #[error("no GPU able to render slices was found")]
    NotAvailable,

    /// Render targets did not fit in device memory.
    #[error("slice targets need {required} bytes but about {available} are allocatable")]
    OutOfMemory {
        /// Bytes the target set needs.
        required: u64,
        /// Allocatable bytes as estimated by the context.
        available: u64,
    },

    /// A slicing program failed to compile or validate.
    #[error("slicing program rejected: {0}")]
    ShaderCompilation(String),

    /// The device went away mid-slice.
    #[error("slicing device lost")]
    DeviceLost,

    /// A pass failed validation or submission.
    #[error("slicing pass failed: {0}")]
    Execution(String),

    /// Copying a target back to the host failed.
    #[error("slice readback failed: {0}")]
    BufferMapping(String),

    /// Zero or over-limit output size.
    #[error("slice target of {width}x{height} px is empty or beyond the device limit")]
    InvalidSize {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// PNG encoding of a layer failed.
    #[error("layer image encoding failed: {0}")]
    ImageEncode(String),

    /// Scene data unusable for slicing.
    #[error("scene cannot be sliced: {0}")]
    InvalidScene(#[from] SceneError),
}

impl GpuError {
    /// Whether the device itself failed, as opposed to bad input.
    #[must_use]
    pub const fn is_device_fault(&self) -> bool {
        matches!(
            self,
            Self::NotAvailable
                | Self::OutOfMemory { .. }
                | Self::DeviceLost
                | Self::Execution(_)
                | Self::BufferMapping(_)
        )
    }
}

/// Result alias for the slicing engine.
pub type GpuResult<T> = Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_reports_both_figures() {
        let msg = GpuError::OutOfMemory {
            required: 40_960_000,
            available: 268_435_456,
        }
        .to_string();
        assert!(msg.contains("40960000"));
        assert!(msg.contains("268435456"));
    }

    #[test]
    fn test_scene_errors_convert() {
        let err: GpuError = SceneError::NoSuchObject { index: 1, len: 0 }.into();
        assert!(matches!(err, GpuError::InvalidScene(_)));
        assert!(err.to_string().starts_with("scene cannot be sliced"));
        assert!(!err.is_device_fault());
    }

    #[test]
    fn test_device_faults() {
        assert!(GpuError::DeviceLost.is_device_fault());
        assert!(GpuError::NotAvailable.is_device_fault());
        assert!(!GpuError::ShaderCompilation("x".into()).is_device_fault());
        assert!(!GpuError::ImageEncode("x".into()).is_device_fault());
    }

    #[test]
    fn test_gpu_error_crosses_threads() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<GpuError>();
    }
}
