//! Printer and print job configuration for layer-by-layer resin printing.
//!
//! This crate holds the plain data records that drive slicing:
//!
//! - [`PrinterConfig`]: print volume, Z stage mechanics, projector resolution
//! - [`PrintJobConfig`]: layer step, exposure timings, raft parameters
//! - [`units`]: length unit conversion and lead-screw layer height math
//!
//! Records serialize with the field names used by the slice archive
//! manifest (`slice-config.json`).
//!
//! # Example
//!
//! ```
//! use print_config::units::{LengthUnit, ThreadPitch, layer_height_mm};
//! use print_config::PrintJobConfig;
//!
//! let pitch = ThreadPitch::PerRevolution { distance: 0.5, unit: LengthUnit::Millimeter };
//! let step_mm = layer_height_mm(pitch, 1024, 1);
//!
//! let job = PrintJobConfig {
//!     step_distance_microns: step_mm * 1000.0,
//!     steps_per_layer: 100,
//!     ..PrintJobConfig::default()
//! };
//! assert!((job.z_step_mm() - 0.048_828_125).abs() < 1e-9);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod error;
pub mod units;

pub use config::{PrintJobConfig, PrinterConfig, ProjectorConfig, VolumeConfig, ZStage};
pub use error::{ConfigError, ConfigResult};
pub use units::{LengthUnit, ThreadPitch, convert_length_unit, layer_height_mm};
