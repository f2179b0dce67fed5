//! Property-based tests for unit conversion and configuration serialization.
//!
//! Run with: cargo test -p print-config -- proptest

#![allow(clippy::unwrap_used, clippy::expect_used)]

use print_config::{LengthUnit, PrintJobConfig, convert_length_unit};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_unit() -> impl Strategy<Value = LengthUnit> {
    prop::sample::select(LengthUnit::ALL.to_vec())
}

fn arb_job() -> impl Strategy<Value = PrintJobConfig> {
    (
        1.0..100.0f64,
        1u32..200,
        0.0..10_000.0f64,
        0.0..5.0f64,
        prop::option::of(0.1..3.0f64),
    )
        .prop_map(|(step, steps, exposure, raft, shell)| PrintJobConfig {
            step_distance_microns: step,
            steps_per_layer: steps,
            layer_exposure_time_ms: exposure,
            raft_thickness_mm: raft,
            shell_inset_mm: shell,
            ..PrintJobConfig::default()
        })
}

// =============================================================================
// Conversion properties
// =============================================================================

proptest! {
    #[test]
    fn conversion_round_trips(v in -1.0e6..1.0e6f64, from in arb_unit(), to in arb_unit()) {
        let there = convert_length_unit(v, from, to);
        let back = convert_length_unit(there, to, from);
        prop_assert!((back - v).abs() <= 1e-9 * v.abs().max(1.0), "{v} -> {there} -> {back}");
    }

    #[test]
    fn same_unit_is_identity(v in any::<f64>(), unit in arb_unit()) {
        let out = convert_length_unit(v, unit, unit);
        prop_assert_eq!(out.to_bits(), v.to_bits());
    }

    #[test]
    fn conversion_preserves_sign(v in 1.0e-3..1.0e6f64, from in arb_unit(), to in arb_unit()) {
        prop_assert!(convert_length_unit(v, from, to) > 0.0);
        prop_assert!(convert_length_unit(-v, from, to) < 0.0);
    }
}

// =============================================================================
// Configuration properties
// =============================================================================

proptest! {
    #[test]
    fn valid_jobs_survive_json(job in arb_job()) {
        prop_assert!(job.validate().is_ok());
        let json = job.to_json_pretty().unwrap();
        let parsed = PrintJobConfig::from_json(&json).unwrap();
        prop_assert_eq!(parsed.steps_per_layer, job.steps_per_layer);
        prop_assert!((parsed.step_distance_microns - job.step_distance_microns).abs() < 1e-9);
        prop_assert!((parsed.z_step_mm() - job.z_step_mm()).abs() < 1e-9);
        prop_assert_eq!(parsed.shell_inset_mm.is_some(), job.shell_inset_mm.is_some());
    }

    #[test]
    fn z_step_scales_with_steps(job in arb_job()) {
        let single = PrintJobConfig { steps_per_layer: 1, ..job.clone() };
        let expected = single.z_step_mm() * f64::from(job.steps_per_layer);
        prop_assert!((job.z_step_mm() - expected).abs() <= 1e-12 * expected.max(1.0));
    }
}
