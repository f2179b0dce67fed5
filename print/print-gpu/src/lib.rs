//! GPU slicer for layer-by-layer resin printing.
//!
//! Renders a [`print_scene::Scene`] into one black/white projector mask per
//! layer using `wgpu` render passes. Each layer runs a short, fixed sequence
//! of programs over five named off-screen targets:
//!
//! | Step | Program | Writes |
//! |------|---------|--------|
//! | face parity above the plane | intersection | `Scratch` |
//! | inside/outside below the plane | slice | `Mask` |
//! | optional shell: erode, xor | erode/dilate, bool | `Temp1`, `Temp2` |
//! | optional Z shell: bands above/below, or, and | flat, bool | `Temp1`, `Temp3` |
//! | final blit | copy | output |
//!
//! Layers at or below the raft thickness instead draw the dilated silhouette
//! of every object.
//!
//! # GPU Availability
//!
//! The device is created lazily. [`SlicingEngine::new`] fails with
//! [`GpuError::NotAvailable`] on systems without a usable adapter; use
//! [`GpuContext::is_available()`] to check first.
//!
//! # Example
//!
//! ```no_run
//! use print_gpu::{GpuContext, SlicingEngine};
//! use print_scene::{PrintVolume, Scene};
//!
//! let scene = Scene::new(PrintVolume::new(96.0, 60.0, 100.0)?);
//! if GpuContext::is_available() {
//!     let mut engine = SlicingEngine::new(&scene, 0.075, 0.075, 1.0, 1.0, 0.0)?;
//!     engine.set_size(1280, 800)?;
//!     let mask = engine.slice_at_to_mask(10.0)?;
//!     println!("{} px exposed", mask.white_pixel_count());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod buffers;
pub mod camera;
pub mod context;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod materials;
pub mod readback;
pub mod targets;
pub mod uniforms;

pub use camera::{CAMERA_NEAR, FAR_Z_PADDING, OrthoCamera, SLICER_BACKGROUND_Z, slice_cutoff};
pub use context::{AdapterPreference, AdapterSummary, GpuContext, POWER_ENV};
pub use engine::SlicingEngine;
pub use error::{GpuError, GpuResult};
pub use geometry::{MAX_PASS_RADIUS, MIN_SHELL_PIXELS, PixelGeometry, pass_radii};
pub use readback::{DepthMap, SliceImage};
pub use targets::{MAX_STACKED_SURFACES, RenderTargets, TargetKey};
pub use uniforms::{BoolOp, ProgramUniforms, ViewSize};
