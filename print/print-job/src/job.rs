//! The batch slicing job state machine.
//!
//! ```text
//! Idle -> Slicing(1) -> Slicing(2) -> ... -> Finalizing -> Complete
//!            |              |
//!            +--------------+--> Cancelled | Failed
//! ```
//!
//! A host pumps the machine with [`SliceJob::step`], or awaits
//! [`SliceJob::execute`] which pumps to completion and yields to the
//! executor between layers. Layers are produced strictly in increasing Z.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use print_config::{PrintJobConfig, PrinterConfig};
use print_gpu::SlicingEngine;
use print_scene::Scene;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive::{LayerArchive, MANIFEST_NAME, ZipLayerArchive, layer_file_name};
use crate::error::{JobError, JobResult};
use crate::renderer::LayerRenderer;

/// Shell inset handed to the engine by batch jobs without an explicit
/// inset. Non-positive disables shelling.
pub const SHELL_DISABLED: f64 = -1.0;

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Created, not started.
    Idle,
    /// The next step renders `layer`.
    Slicing {
        /// 1-based layer index.
        layer: u32,
    },
    /// Writing the manifest and closing the archive.
    Finalizing,
    /// The archive was produced.
    Complete,
    /// Stopped by [`JobHandle::cancel`].
    Cancelled,
    /// A layer or the archive failed.
    Failed,
}

impl JobState {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }
}

/// Outcome of one [`SliceJob::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobStep {
    /// A layer was rendered and archived.
    Sliced {
        /// 1-based layer index.
        layer: u32,
        /// Slice height in mm.
        z_mm: f64,
    },
    /// The job completed; the archive bytes.
    Finished(Vec<u8>),
}

/// Cancellation and progress shared between a job and its observers.
///
/// Cloning is cheap; every clone refers to the same job.
#[derive(Debug, Clone, Default)]
pub struct JobHandle {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    status: AtomicU8,
    progress: AtomicU64,
}

const RUNNING: u8 = 0;
const CANCEL_REQUESTED: u8 = 1;
const CANCELLED: u8 = 2;
const ENDED: u8 = 3;

impl JobHandle {
    /// Ask the job to stop before its next layer. A no-op once the job
    /// has reached a terminal state.
    pub fn cancel(&self) {
        let _ = self.shared.status.compare_exchange(
            RUNNING,
            CANCEL_REQUESTED,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Whether a cancellation is pending or stopped the job.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.shared.status.load(Ordering::SeqCst),
            CANCEL_REQUESTED | CANCELLED
        )
    }

    /// Whether the job completed, failed or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.shared.status.load(Ordering::SeqCst), CANCELLED | ENDED)
    }

    /// Record a terminal state. A pending request that the job never
    /// observed is dropped.
    fn finish(&self, cancelled: bool) {
        let status = if cancelled { CANCELLED } else { ENDED };
        self.shared.status.store(status, Ordering::SeqCst);
    }

    /// Fraction of the slice height done, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        f64::from_bits(self.shared.progress.load(Ordering::SeqCst))
    }

    /// Raise progress to `fraction`. Never lowers it.
    fn advance(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        // Bit patterns of non-negative floats order like the values.
        self.shared
            .progress
            .fetch_max(fraction.to_bits(), Ordering::SeqCst);
    }
}

/// Timings of a finished job.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JobStats {
    /// Layers written.
    pub layers: u32,
    /// Time spent rendering and storing layers.
    pub slicing: Duration,
    /// Time spent writing the manifest and closing the archive.
    pub archive: Duration,
}

impl JobStats {
    /// Slicing plus archiving.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.slicing + self.archive
    }

    /// Average slicing time per layer in ms.
    #[must_use]
    pub fn ms_per_layer(&self) -> f64 {
        per_layer_ms(self.slicing, self.layers)
    }

    /// Average total time per layer in ms.
    #[must_use]
    pub fn amortized_ms_per_layer(&self) -> f64 {
        per_layer_ms(self.total(), self.layers)
    }
}

fn per_layer_ms(duration: Duration, layers: u32) -> f64 {
    if layers == 0 {
        0.0
    } else {
        duration.as_secs_f64() * 1000.0 / f64::from(layers)
    }
}

/// Number of layers needed to reach `max_height_mm` in steps of
/// `z_step_mm`, `ceil(max / step)`.
///
/// A tiny tolerance keeps an exact multiple from gaining an extra layer
/// through floating point noise.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn layer_count(max_height_mm: f64, z_step_mm: f64) -> u32 {
    if z_step_mm.is_nan() || max_height_mm.is_nan() || z_step_mm <= 0.0 || max_height_mm <= 0.0 {
        return 0;
    }
    (max_height_mm / z_step_mm - 1e-9).ceil().max(0.0) as u32
}

#[derive(Serialize)]
struct Manifest<'c> {
    job: &'c PrintJobConfig,
    printer: &'c PrinterConfig,
}

/// Slices a scene layer by layer into an archive. Single use.
///
/// # Example
///
/// ```no_run
/// use print_config::{PrintJobConfig, PrinterConfig};
/// use print_job::SliceJob;
/// use print_scene::{PrintVolume, Scene};
///
/// let printer = PrinterConfig::default();
/// let job = PrintJobConfig::default();
/// let scene = Scene::new(PrintVolume::new(
///     printer.volume.width_mm,
///     printer.volume.depth_mm,
///     printer.volume.height_mm,
/// )?);
///
/// let job = SliceJob::with_engine(&scene, printer, job)?;
/// let handle = job.handle();
/// let zip = pollster::block_on(job.execute())?;
/// assert_eq!(handle.progress(), 1.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct SliceJob<R, A = ZipLayerArchive> {
    renderer: R,
    archive: A,
    printer: PrinterConfig,
    job: PrintJobConfig,
    z_step_mm: f64,
    max_slice_height_mm: f64,
    layer_count: u32,
    state: JobState,
    handle: JobHandle,
    stats: JobStats,
    started: Option<Instant>,
}

impl<'s> SliceJob<SlicingEngine<'s>, ZipLayerArchive> {
    /// Job slicing `scene` on the GPU into an in-memory zip.
    ///
    /// The pixel pitch is the scene volume over the projector resolution.
    /// Shelling is off unless the job sets `shellInset_mm`.
    ///
    /// # Errors
    ///
    /// [`JobError::Config`] for invalid configuration, [`JobError::Setup`]
    /// if the engine cannot be created.
    pub fn with_engine(
        scene: &'s Scene,
        printer: PrinterConfig,
        job: PrintJobConfig,
    ) -> JobResult<Self> {
        printer.validate()?;
        job.validate()?;

        let volume = scene.volume();
        let engine = SlicingEngine::new(
            scene,
            volume.width() / f64::from(printer.projector.x_res_px),
            volume.depth() / f64::from(printer.projector.y_res_px),
            job.raft_thickness_mm,
            job.raft_outset_mm,
            job.shell_inset_mm.unwrap_or(SHELL_DISABLED),
        )
        .map_err(|e| JobError::Setup(Box::new(e)))?;

        Self::new(engine, ZipLayerArchive::new(), scene.max_object_z(), printer, job)
    }
}

impl<R: LayerRenderer, A: LayerArchive> SliceJob<R, A> {
    /// Job rendering with `renderer` into `archive` up to `max_object_z`
    /// plus one layer step.
    ///
    /// # Errors
    ///
    /// [`JobError::Config`] for invalid configuration.
    pub fn new(
        renderer: R,
        archive: A,
        max_object_z: f64,
        printer: PrinterConfig,
        job: PrintJobConfig,
    ) -> JobResult<Self> {
        printer.validate()?;
        job.validate()?;

        let z_step_mm = job.z_step_mm();
        let max_slice_height_mm = max_object_z.max(0.0) + z_step_mm;
        Ok(Self {
            renderer,
            archive,
            printer,
            job,
            z_step_mm,
            max_slice_height_mm,
            layer_count: layer_count(max_slice_height_mm, z_step_mm),
            state: JobState::Idle,
            handle: JobHandle::default(),
            stats: JobStats::default(),
            started: None,
        })
    }

    /// Handle for cancelling and observing progress.
    #[must_use]
    pub fn handle(&self) -> JobHandle {
        self.handle.clone()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> JobState {
        self.state
    }

    /// Distance between layers in mm.
    #[must_use]
    pub const fn z_step_mm(&self) -> f64 {
        self.z_step_mm
    }

    /// Highest object point plus one layer step.
    #[must_use]
    pub const fn max_slice_height_mm(&self) -> f64 {
        self.max_slice_height_mm
    }

    /// Number of layers the job renders.
    #[must_use]
    pub const fn layer_count(&self) -> u32 {
        self.layer_count
    }

    /// Timings so far; complete once the job is [`JobState::Complete`].
    #[must_use]
    pub const fn stats(&self) -> JobStats {
        self.stats
    }

    /// Size the renderer to the projector and enter `Slicing(1)`.
    ///
    /// # Errors
    ///
    /// [`JobError::AlreadyStarted`] unless idle; [`JobError::Setup`] if the
    /// renderer rejects the projector size.
    pub fn start(&mut self) -> JobResult<()> {
        if self.state != JobState::Idle {
            return Err(JobError::AlreadyStarted);
        }
        let (width, height) = (self.printer.projector.x_res_px, self.printer.projector.y_res_px);
        if let Err(e) = self.renderer.set_output_size(width, height) {
            return Err(self.fail(JobError::Setup(Box::new(e))));
        }

        info!(
            job = %self.job.name,
            printer = %self.printer.name,
            layers = self.layer_count,
            z_step_mm = self.z_step_mm,
            max_slice_height_mm = self.max_slice_height_mm,
            width,
            height,
            "slicing job started"
        );
        self.started = Some(Instant::now());
        self.state = JobState::Slicing { layer: 1 };
        Ok(())
    }

    /// Advance by one layer, or finish the archive after the last one.
    ///
    /// Cancellation is checked before anything else, so a layer is never
    /// started once [`JobHandle::cancel`] has been called.
    ///
    /// # Errors
    ///
    /// [`JobError::Cancelled`] when cancelled; [`JobError::Layer`] or
    /// [`JobError::Archive`] on failure, after which the job is
    /// [`JobState::Failed`]; lifecycle errors when idle or finished.
    pub fn step(&mut self) -> JobResult<JobStep> {
        let layer = match self.state {
            JobState::Idle => return Err(JobError::NotStarted),
            JobState::Complete | JobState::Cancelled | JobState::Failed => {
                return Err(JobError::Finished)
            }
            JobState::Finalizing => return self.finalize().map(JobStep::Finished),
            JobState::Slicing { layer } => layer,
        };

        if self.handle.is_cancelled() {
            self.state = JobState::Cancelled;
            self.handle.finish(true);
            info!(layer, "slicing job cancelled");
            return Err(JobError::Cancelled { layer });
        }

        if layer > self.layer_count {
            self.state = JobState::Finalizing;
            return self.finalize().map(JobStep::Finished);
        }

        let start = Instant::now();
        let z_mm = self.z_step_mm * f64::from(layer);
        let image = match self.renderer.render_layer(z_mm) {
            Ok(image) => image,
            Err(e) => {
                return Err(self.fail(JobError::Layer {
                    layer,
                    z_mm,
                    source: Box::new(e),
                }))
            }
        };
        if let Err(e) = self.archive.add_layer(&layer_file_name(layer), &image) {
            return Err(self.fail(e.into()));
        }

        self.stats.layers = layer;
        self.stats.slicing += start.elapsed();
        self.handle.advance(z_mm / self.max_slice_height_mm);
        self.state = JobState::Slicing { layer: layer + 1 };
        debug!(layer, z_mm, bytes = image.len(), "layer sliced");

        Ok(JobStep::Sliced { layer, z_mm })
    }

    /// Run the job to completion, yielding to the executor between layers.
    ///
    /// # Errors
    ///
    /// The first error from [`SliceJob::start`] or [`SliceJob::step`].
    pub async fn execute(mut self) -> JobResult<Vec<u8>> {
        self.start()?;
        loop {
            match self.step()? {
                JobStep::Sliced { .. } => yield_now().await,
                JobStep::Finished(bytes) => return Ok(bytes),
            }
        }
    }

    fn finalize(&mut self) -> JobResult<Vec<u8>> {
        let start = Instant::now();
        let manifest = Manifest {
            job: &self.job,
            printer: &self.printer,
        };
        let json = match serde_json::to_vec_pretty(&manifest) {
            Ok(json) => json,
            Err(e) => return Err(self.fail(e.into())),
        };
        let bytes = match self
            .archive
            .add_manifest(MANIFEST_NAME, &json)
            .and_then(|()| self.archive.finish())
        {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.fail(e.into())),
        };
        self.stats.archive = start.elapsed();
        self.state = JobState::Complete;
        self.handle.advance(1.0);
        self.handle.finish(false);

        let stats = self.stats;
        info!(
            layers = stats.layers,
            slicing_s = stats.slicing.as_secs_f64(),
            ms_per_layer = stats.ms_per_layer(),
            archive_s = stats.archive.as_secs_f64(),
            total_s = stats.total().as_secs_f64(),
            amortized_ms_per_layer = stats.amortized_ms_per_layer(),
            wall_s = self.started.map_or(0.0, |t| t.elapsed().as_secs_f64()),
            bytes = bytes.len(),
            "slicing job complete"
        );
        Ok(bytes)
    }

    fn fail(&mut self, err: JobError) -> JobError {
        warn!(state = ?self.state, error = %err, "slicing job failed");
        self.state = JobState::Failed;
        self.handle.finish(false);
        err
    }
}

/// Completes on the second poll, letting other tasks run in between.
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_layer_count_exact_multiple() {
        assert_eq!(layer_count(3.0, 1.0), 3);
        assert_eq!(layer_count(0.075, 0.025), 3);
        assert_eq!(layer_count(30.025, 0.025), 1201);
    }

    #[test]
    fn test_layer_count_rounds_up() {
        assert_eq!(layer_count(3.5, 1.0), 4);
        assert_eq!(layer_count(0.01, 1.0), 1);
    }

    #[test]
    fn test_layer_count_degenerate() {
        assert_eq!(layer_count(0.0, 1.0), 0);
        assert_eq!(layer_count(3.0, 0.0), 0);
        assert_eq!(layer_count(f64::NAN, 1.0), 0);
    }

    #[test]
    fn test_handle_progress_is_monotonic() {
        let handle = JobHandle::default();
        assert_eq!(handle.progress(), 0.0);
        handle.advance(0.5);
        handle.advance(0.25);
        assert_relative_eq!(handle.progress(), 0.5);
        handle.advance(7.0);
        assert_relative_eq!(handle.progress(), 1.0);
    }

    #[test]
    fn test_handle_clones_share_state() {
        let handle = JobHandle::default();
        let observer = handle.clone();
        handle.cancel();
        assert!(observer.is_cancelled());
        assert!(!observer.is_finished());
    }

    #[test]
    fn test_cancel_ignored_once_finished() {
        let handle = JobHandle::default();
        handle.finish(false);
        handle.cancel();
        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_unobserved_cancel_is_dropped_on_completion() {
        let handle = JobHandle::default();
        handle.cancel();
        assert!(handle.is_cancelled() && !handle.is_finished());
        handle.finish(false);
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_observed_cancel_stays_reported() {
        let handle = JobHandle::default();
        handle.cancel();
        handle.finish(true);
        handle.cancel();
        assert!(handle.is_cancelled() && handle.is_finished());
    }

    #[test]
    fn test_stats_per_layer() {
        let stats = JobStats {
            layers: 4,
            slicing: Duration::from_millis(100),
            archive: Duration::from_millis(20),
        };
        assert_relative_eq!(stats.ms_per_layer(), 25.0);
        assert_relative_eq!(stats.amortized_ms_per_layer(), 30.0);
        assert_eq!(JobStats::default().ms_per_layer(), 0.0);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Complete.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Slicing { layer: 1 }.is_terminal());
        assert!(!JobState::Idle.is_terminal());
    }
}
