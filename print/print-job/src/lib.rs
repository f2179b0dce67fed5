//! Headless batch slicing of a print scene into a zip archive.
//!
//! A [`SliceJob`] walks the scene from the first layer step up to one
//! layer above the tallest object, renders each layer through a
//! [`LayerRenderer`] (the GPU [`print_gpu::SlicingEngine`] by default),
//! and stores the images as `00000001.png`, `00000002.png`, ... in a
//! [`LayerArchive`]. After the last layer a `slice-config.json` manifest
//! holding the job and printer configuration is added and the archive
//! bytes are returned.
//!
//! The job is all or nothing: cancellation or any layer failure ends it
//! without an archive. Progress and cancellation are shared through a
//! cloneable [`JobHandle`].
//!
//! # Example
//!
//! ```no_run
//! use nalgebra::Vector3;
//! use print_config::{PrintJobConfig, PrinterConfig};
//! use print_job::{JobStep, SliceJob};
//! use print_scene::{PrintObject, PrintVolume, Scene, TriangleMesh};
//!
//! let mut scene = Scene::new(PrintVolume::new(96.0, 60.0, 100.0)?);
//! scene.add_object(
//!     PrintObject::new("ball", TriangleMesh::uv_sphere(10.0, 64, 32))
//!         .at(Vector3::new(0.0, 0.0, 10.0)),
//! );
//!
//! let mut job = SliceJob::with_engine(&scene, PrinterConfig::default(), PrintJobConfig::default())?;
//! job.start()?;
//! let zip = loop {
//!     match job.step()? {
//!         JobStep::Sliced { layer, z_mm } => println!("layer {layer} at {z_mm:.3} mm"),
//!         JobStep::Finished(bytes) => break bytes,
//!     }
//! };
//! std::fs::write("ball.zip", zip)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod archive;
pub mod error;
pub mod job;
pub mod renderer;

pub use archive::{ArchiveError, LayerArchive, MANIFEST_NAME, ZipLayerArchive, layer_file_name};
pub use error::{BoxedError, JobError, JobResult};
pub use job::{JobHandle, JobState, JobStats, JobStep, SHELL_DISABLED, SliceJob, layer_count};
pub use renderer::LayerRenderer;
