use std::collections::HashMap;

use super::*;

#[test]
fn defaults_validate() {
    EngineConfig::default().validate().unwrap();
}

#[test]
fn partial_json_keeps_defaults() {
    let cfg = EngineConfig::from_json_str(r#"{ "gradient_ramp_width": 128 }"#).unwrap();
    assert_eq!(cfg.gradient_ramp_width, 128);
    assert_eq!(cfg.source_align_px, 16);
    assert_eq!(cfg.index_bit_order, BitOrder::LsbFirst);
}

#[test]
fn json_rejects_bad_alignment() {
    assert!(EngineConfig::from_json_str(r#"{ "source_align_px": 12 }"#).is_err());
    assert!(EngineConfig::from_json_str(r#"{ "gradient_ramp_width": 1 }"#).is_err());
    assert!(EngineConfig::from_json_str("not json").is_err());
}

#[test]
fn env_overrides_ignore_invalid_values() {
    let vars: HashMap<&str, &str> = [
        ("VGPORT_SOURCE_ALIGN_PX", "24"),
        ("VGPORT_IMAGE_CACHE_CAPACITY", "3"),
        ("VGPORT_VECTORIZED_BLEND", "false"),
        ("VGPORT_CURVE_TOLERANCE", "-1"),
    ]
    .into_iter()
    .collect();
    let cfg = EngineConfig::default()
        .with_overrides_from(|k| vars.get(k).map(|v| (*v).to_string()));
    assert_eq!(cfg.source_align_px, 16);
    assert_eq!(cfg.image_cache_capacity, 3);
    assert!(!cfg.vectorized_blend);
    assert_eq!(cfg.curve_tolerance, 0.2);
}
