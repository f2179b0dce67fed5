//! The rendering side of a job.

use print_gpu::{GpuError, SlicingEngine};

/// Produces one encoded image per layer height.
pub trait LayerRenderer {
    /// Failure type of the renderer.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Set the raster size of every following layer.
    ///
    /// # Errors
    ///
    /// Renderer specific.
    fn set_output_size(&mut self, width: u32, height: u32) -> Result<(), Self::Error>;

    /// Render the layer at `z_mm` and return it encoded (PNG).
    ///
    /// # Errors
    ///
    /// Renderer specific.
    fn render_layer(&mut self, z_mm: f64) -> Result<Vec<u8>, Self::Error>;
}

impl LayerRenderer for SlicingEngine<'_> {
    type Error = GpuError;

    fn set_output_size(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.set_size(width, height)
    }

    fn render_layer(&mut self, z_mm: f64) -> Result<Vec<u8>, GpuError> {
        self.slice_at_to_image(z_mm)
    }
}
