//! Printer and print job configuration records.
//!
//! Both records serialize with the JSON field names used in the
//! `slice-config.json` manifest written next to sliced layers.
//!
//! # Example
//!
//! ```
//! use print_config::{PrintJobConfig, PrinterConfig};
//!
//! let printer = PrinterConfig::default();
//! let job = PrintJobConfig::default();
//! printer.validate().unwrap();
//! job.validate().unwrap();
//! assert!(job.z_step_mm() > 0.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::units::{LengthUnit, ThreadPitch, layer_height_mm};

/// Printable volume of a printer, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Extent along X.
    pub width_mm: f64,
    /// Extent along Y.
    pub depth_mm: f64,
    /// Extent along Z.
    pub height_mm: f64,
}

/// Z stage lead screw and stepper parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZStage {
    /// Travel per lead screw revolution, mm.
    pub lead_mm: f64,
    /// Full steps per motor revolution.
    #[serde(rename = "stepsPerRev")]
    pub steps_per_rev: u32,
    /// Microsteps per full step.
    pub microsteps: u32,
}

impl ZStage {
    /// Z travel of a single microstep in millimeters.
    #[must_use]
    pub fn layer_height_mm(&self) -> f64 {
        layer_height_mm(
            ThreadPitch::PerRevolution {
                distance: self.lead_mm,
                unit: LengthUnit::Millimeter,
            },
            self.steps_per_rev,
            self.microsteps,
        )
    }

    /// Z travel of a single microstep in microns.
    #[must_use]
    pub fn step_distance_microns(&self) -> f64 {
        crate::units::convert_length_unit(
            self.layer_height_mm(),
            LengthUnit::Millimeter,
            LengthUnit::Micron,
        )
    }
}

/// Projector pixel grid. Pixels are assumed square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectorConfig {
    /// Pixels along X.
    #[serde(rename = "xRes_px")]
    pub x_res_px: u32,
    /// Pixels along Y.
    #[serde(rename = "yRes_px")]
    pub y_res_px: u32,
}

/// Description of a physical printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterConfig {
    /// Printer name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "lastModified")]
    pub last_modified: u64,
    /// Print volume.
    pub volume: VolumeConfig,
    /// Z stage mechanics.
    #[serde(rename = "zStage")]
    pub z_stage: ZStage,
    /// Projector resolution.
    pub projector: ProjectorConfig,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            name: "Default Printer".to_string(),
            description: "1280x800 projector over a 96x60 mm platform".to_string(),
            last_modified: 0,
            volume: VolumeConfig {
                width_mm: 96.0,
                depth_mm: 60.0,
                height_mm: 100.0,
            },
            z_stage: ZStage {
                lead_mm: 0.5,
                steps_per_rev: 1024,
                microsteps: 1,
            },
            projector: ProjectorConfig {
                x_res_px: 1280,
                y_res_px: 800,
            },
        }
    }
}

impl PrinterConfig {
    /// Check volume dimensions, projector resolution and Z stage counts.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        positive("width_mm", self.volume.width_mm)?;
        positive("depth_mm", self.volume.depth_mm)?;
        positive("height_mm", self.volume.height_mm)?;
        non_negative("lead_mm", self.z_stage.lead_mm)?;
        if self.z_stage.steps_per_rev == 0 {
            return Err(ConfigError::ZeroCount {
                field: "stepsPerRev",
            });
        }
        if self.z_stage.microsteps == 0 {
            return Err(ConfigError::ZeroCount {
                field: "microsteps",
            });
        }
        if self.projector.x_res_px == 0 || self.projector.y_res_px == 0 {
            return Err(ConfigError::InvalidResolution {
                width: self.projector.x_res_px,
                height: self.projector.y_res_px,
            });
        }
        Ok(())
    }

    /// Parse and validate a printer description.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input, or a range error.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Physical width of one projector pixel, mm.
    #[must_use]
    pub fn pixel_width_mm(&self) -> f64 {
        self.volume.width_mm / f64::from(self.projector.x_res_px)
    }

    /// Physical depth of one projector pixel, mm.
    #[must_use]
    pub fn pixel_height_mm(&self) -> f64 {
        self.volume.depth_mm / f64::from(self.projector.y_res_px)
    }
}

/// Parameters of one print job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJobConfig {
    /// Name of the settings.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Z stage step distance the job was created for.
    #[serde(rename = "stepDistance_microns")]
    pub step_distance_microns: f64,
    /// Stage steps per layer.
    #[serde(rename = "stepsPerLayer")]
    pub steps_per_layer: u32,
    /// Settle time after moving, ms.
    #[serde(rename = "settleTime_ms")]
    pub settle_time_ms: f64,
    /// Exposure per layer, ms.
    #[serde(rename = "layerExposureTime_ms")]
    pub layer_exposure_time_ms: f64,
    /// Blank time between layers, ms.
    #[serde(rename = "blankTime_ms")]
    pub blank_time_ms: f64,
    /// Peel retract distance, mm.
    #[serde(rename = "retractDistance_mm")]
    pub retract_distance_mm: f64,
    /// Height at which newly added objects are placed, mm.
    #[serde(rename = "zOffset_mm")]
    pub z_offset_mm: f64,
    /// Height of the raft printed under the objects, mm.
    #[serde(rename = "raftThickness_mm")]
    pub raft_thickness_mm: f64,
    /// How far the raft grows past the object silhouette, mm.
    #[serde(rename = "raftOutset_mm")]
    pub raft_outset_mm: f64,
    /// Wall thickness for hollowed slices, mm. Unset means solid.
    #[serde(
        rename = "shellInset_mm",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub shell_inset_mm: Option<f64>,
}

impl Default for PrintJobConfig {
    fn default() -> Self {
        Self {
            name: "Default Job".to_string(),
            description: "50 micron layers with a 1 mm raft".to_string(),
            step_distance_microns: 25.0,
            steps_per_layer: 2,
            settle_time_ms: 1000.0,
            layer_exposure_time_ms: 8000.0,
            blank_time_ms: 500.0,
            retract_distance_mm: 5.0,
            z_offset_mm: 1.0,
            raft_thickness_mm: 1.0,
            raft_outset_mm: 1.0,
            shell_inset_mm: None,
        }
    }
}

impl PrintJobConfig {
    /// Layer thickness in millimeters.
    #[must_use]
    pub fn z_step_mm(&self) -> f64 {
        self.step_distance_microns * f64::from(self.steps_per_layer) / 1000.0
    }

    /// Check that distances and times are non-negative and the step is usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> ConfigResult<()> {
        positive("stepDistance_microns", self.step_distance_microns)?;
        if self.steps_per_layer == 0 {
            return Err(ConfigError::ZeroCount {
                field: "stepsPerLayer",
            });
        }
        non_negative("settleTime_ms", self.settle_time_ms)?;
        non_negative("layerExposureTime_ms", self.layer_exposure_time_ms)?;
        non_negative("blankTime_ms", self.blank_time_ms)?;
        non_negative("retractDistance_mm", self.retract_distance_mm)?;
        non_negative("zOffset_mm", self.z_offset_mm)?;
        non_negative("raftThickness_mm", self.raft_thickness_mm)?;
        non_negative("raftOutset_mm", self.raft_outset_mm)?;
        if let Some(inset) = self.shell_inset_mm {
            finite("shellInset_mm", inset)?;
        }
        Ok(())
    }

    /// Parse and validate job settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input, or a range error.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builder-style setter for the shell inset.
    #[must_use]
    pub fn with_shell_inset(mut self, inset_mm: f64) -> Self {
        self.shell_inset_mm = Some(inset_mm);
        self
    }
}

fn finite(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotFinite { field, value })
    }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> ConfigResult<()> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}
