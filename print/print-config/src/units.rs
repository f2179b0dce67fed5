//! Length units and lead-screw mechanics.
//!
//! Everything converts through millimeters. Layer height is derived from the
//! Z stage's thread pitch and stepper resolution.
//!
//! # Example
//!
//! ```
//! use print_config::units::{LengthUnit, ThreadPitch, convert_length_unit, layer_height_mm};
//!
//! assert_eq!(convert_length_unit(1.0, LengthUnit::Inch, LengthUnit::Millimeter), 25.4);
//!
//! let pitch = ThreadPitch::ThreadsPerUnit { threads: 20.0, unit: LengthUnit::Inch };
//! let height = layer_height_mm(pitch, 1024, 1);
//! assert!((height - 1.27 / 1024.0).abs() < 1e-12);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Millimeters in one centimeter.
pub const MM_IN_CM: f64 = 10.0;

/// Millimeters in one inch.
pub const MM_IN_INCH: f64 = 25.4;

/// Millimeters in one micron.
pub const MM_IN_MICRON: f64 = 0.001;

/// A unit of length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthUnit {
    /// One thousandth of a millimeter.
    Micron,
    /// The pivot unit for all conversions.
    Millimeter,
    /// Ten millimeters.
    Centimeter,
    /// 25.4 millimeters.
    Inch,
}

impl LengthUnit {
    /// All supported units.
    pub const ALL: [Self; 4] = [Self::Micron, Self::Millimeter, Self::Centimeter, Self::Inch];

    /// How many millimeters one of this unit spans.
    #[must_use]
    pub const fn mm_per_unit(self) -> f64 {
        match self {
            Self::Micron => MM_IN_MICRON,
            Self::Millimeter => 1.0,
            Self::Centimeter => MM_IN_CM,
            Self::Inch => MM_IN_INCH,
        }
    }

    /// Short symbol used next to numeric values.
    #[must_use]
    pub const fn abbrev(self) -> &'static str {
        match self {
            Self::Micron => "µm",
            Self::Millimeter => "mm",
            Self::Centimeter => "cm",
            Self::Inch => "in",
        }
    }

    /// Lowercase unit name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Micron => "micron",
            Self::Millimeter => "millimeter",
            Self::Centimeter => "centimeter",
            Self::Inch => "inch",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert `value` from one length unit to another.
///
/// Returns `value` untouched when both units match, so same-unit
/// conversions are exact.
#[must_use]
pub fn convert_length_unit(value: f64, from: LengthUnit, to: LengthUnit) -> f64 {
    if from == to {
        return value;
    }
    value * from.mm_per_unit() / to.mm_per_unit()
}

/// How the thread of a Z stage lead screw is specified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ThreadPitch {
    /// Linear travel per revolution, e.g. 0.5 mm per revolution.
    PerRevolution {
        /// Travel per revolution.
        distance: f64,
        /// Unit of `distance`.
        unit: LengthUnit,
    },
    /// Thread count per unit length, e.g. 20 threads per inch.
    ThreadsPerUnit {
        /// Number of threads.
        threads: f64,
        /// Unit length the threads are counted over.
        unit: LengthUnit,
    },
}

impl ThreadPitch {
    /// Travel per revolution in millimeters.
    ///
    /// A non-positive thread count yields `0.0`.
    #[must_use]
    pub fn to_mm(self) -> f64 {
        match self {
            Self::PerRevolution { distance, unit } => {
                convert_length_unit(distance, unit, LengthUnit::Millimeter)
            }
            Self::ThreadsPerUnit { threads, unit } => {
                if threads <= 0.0 {
                    return 0.0;
                }
                convert_length_unit(1.0, unit, LengthUnit::Millimeter) / threads
            }
        }
    }
}

/// Height of one microstep of the Z stage, in millimeters.
///
/// `pitch_mm / (microsteps * steps_per_rev)`. Returns `0.0` if either step
/// count is zero.
#[must_use]
pub fn layer_height_mm(pitch: ThreadPitch, steps_per_rev: u32, microsteps: u32) -> f64 {
    let steps = f64::from(steps_per_rev) * f64::from(microsteps);
    if steps == 0.0 {
        return 0.0;
    }
    pitch.to_mm() / steps
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_is_exact() {
        let v = 0.1 + 0.2;
        for unit in LengthUnit::ALL {
            assert_eq!(convert_length_unit(v, unit, unit).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn test_known_factors() {
        assert_relative_eq!(
            convert_length_unit(2.0, LengthUnit::Centimeter, LengthUnit::Millimeter),
            20.0
        );
        assert_relative_eq!(
            convert_length_unit(25.4, LengthUnit::Millimeter, LengthUnit::Inch),
            1.0
        );
        assert_relative_eq!(
            convert_length_unit(25.0, LengthUnit::Micron, LengthUnit::Millimeter),
            0.025
        );
        assert_relative_eq!(
            convert_length_unit(1.0, LengthUnit::Inch, LengthUnit::Micron),
            25_400.0,
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_abbreviations() {
        assert_eq!(LengthUnit::Micron.abbrev(), "µm");
        assert_eq!(LengthUnit::Millimeter.abbrev(), "mm");
        assert_eq!(LengthUnit::Centimeter.abbrev(), "cm");
        assert_eq!(LengthUnit::Inch.abbrev(), "in");
        assert_eq!(LengthUnit::Inch.to_string(), "inch");
    }

    #[test]
    fn test_layer_height_metric_pitch() {
        let pitch = ThreadPitch::PerRevolution {
            distance: 0.5,
            unit: LengthUnit::Millimeter,
        };
        let h = layer_height_mm(pitch, 1024, 1);
        assert_relative_eq!(h, 0.5 / 1024.0);
        assert!((h - 0.000_488).abs() < 1e-6);
    }

    #[test]
    fn test_layer_height_threads_per_inch() {
        let pitch = ThreadPitch::ThreadsPerUnit {
            threads: 20.0,
            unit: LengthUnit::Inch,
        };
        assert_relative_eq!(pitch.to_mm(), 1.27);
        assert_relative_eq!(layer_height_mm(pitch, 1024, 1), 1.27 / 1024.0);
    }

    #[test]
    fn test_layer_height_inch_pitch_with_microsteps() {
        let pitch = ThreadPitch::PerRevolution {
            distance: 0.05,
            unit: LengthUnit::Inch,
        };
        assert_relative_eq!(layer_height_mm(pitch, 200, 16), 1.27 / 3200.0);
    }

    #[test]
    fn test_layer_height_zero_steps() {
        let pitch = ThreadPitch::PerRevolution {
            distance: 1.0,
            unit: LengthUnit::Millimeter,
        };
        assert_eq!(layer_height_mm(pitch, 0, 16), 0.0);
        let bad = ThreadPitch::ThreadsPerUnit {
            threads: 0.0,
            unit: LengthUnit::Inch,
        };
        assert_eq!(bad.to_mm(), 0.0);
    }
}
