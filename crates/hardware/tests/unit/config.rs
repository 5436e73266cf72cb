//! Configuration Tests.

use pipesim_core::common::SimError;
use pipesim_core::config::{Config, Variant};
use pipesim_core::Simulator;
use pretty_assertions::assert_eq;
use rstest::rstest;

// ══════════════════════════════════════════════════════════
// 1. Presets
// ══════════════════════════════════════════════════════════

#[rstest]
#[case("scalar", Variant::Scalar)]
#[case("pipelined", Variant::Pipelined)]
#[case("cached", Variant::Cached)]
#[case("predicted", Variant::Predicted)]
#[case("superscalar", Variant::Superscalar)]
#[case("multi-core", Variant::MultiCore)]
fn preset_names_round_trip(#[case] name: &str, #[case] variant: Variant) {
    assert_eq!(Variant::from_name(name), Some(variant));
    assert_eq!(variant.name(), name);
    assert!(Config::for_variant(variant).validate().is_ok());
}

#[test]
fn unknown_preset_name() {
    assert_eq!(Variant::from_name("vliw"), None);
}

#[test]
fn presets_are_cumulative() {
    let scalar = Config::for_variant(Variant::Scalar);
    assert_eq!(scalar, Config::default());
    assert!(!scalar.pipeline.pipelined);

    let predicted = Config::for_variant(Variant::Predicted);
    assert!(predicted.pipeline.pipelined);
    assert!(predicted.cache.l1_d.enabled);
    assert!(predicted.pipeline.branch_prediction);
    assert_eq!(predicted.pipeline.width, 1);

    let multi = Config::for_variant(Variant::MultiCore);
    assert_eq!(multi.system.cores, 2);
    assert_eq!(multi.pipeline.width, 4);
    assert!(multi.pipeline.forwarding && multi.pipeline.renaming);
}

// ══════════════════════════════════════════════════════════
// 2. JSON and Validation
// ══════════════════════════════════════════════════════════

#[test]
fn partial_json_takes_defaults() {
    let config = Config::from_json(r#"{ "pipeline": { "pipelined": true } }"#).unwrap();
    assert!(config.pipeline.pipelined);
    assert_eq!(config.memory, Config::default().memory);
    assert_eq!(config.system.cores, 1);
}

#[test]
fn preset_survives_json() {
    let config = Config::for_variant(Variant::Superscalar);
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(Config::from_json(&json).unwrap(), config);
}

#[rstest]
#[case::malformed("{ not json")]
#[case::zero_cores(r#"{ "system": { "cores": 0 } }"#)]
#[case::uncached_multicore(r#"{ "system": { "cores": 2 } }"#)]
#[case::odd_line(r#"{ "cache": { "l1_d": { "enabled": true, "line_bytes": 12 } } }"#)]
#[case::zero_width(r#"{ "pipeline": { "width": 0 } }"#)]
#[case::mismatched_lines(
    r#"{ "cache": { "l1_d": { "enabled": true, "line_bytes": 32 }, "shared": { "enabled": true, "line_bytes": 16 } } }"#
)]
fn rejected(#[case] json: &str) {
    assert!(matches!(Config::from_json(json), Err(SimError::Config(_))));
}

#[test]
fn simulator_validates_hand_built_config() {
    let mut config = Config::for_variant(Variant::Predicted);
    config.pipeline.btb_size = 0;
    assert!(matches!(Simulator::new(config), Err(SimError::Config(_))));
}
