//! Config hash stability: same content → same hash regardless of key order
//! or how many layers it was assembled from.

use trx_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
execution:
  engine_id: "MAIN"
  execution_mode: "PAPER"
risk:
  max_risk_per_trade: 0.01
  max_leverage: 200
paper_broker:
  latency_ms: 150
  fill_rule: "IMMEDIATE"
"#;

/// Same content as BASE_YAML but with keys in different order.
const BASE_YAML_REORDERED: &str = r#"
risk:
  max_leverage: 200
  max_risk_per_trade: 0.01
paper_broker:
  fill_rule: "IMMEDIATE"
  latency_ms: 150
execution:
  execution_mode: "PAPER"
  engine_id: "MAIN"
"#;

const OVERLAY_YAML: &str = r#"
execution:
  execution_mode: "PAPER"
risk:
  max_risk_per_trade: 0.005
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(original.config_hash, reordered.config_hash);
    assert_eq!(original.canonical_json, reordered.canonical_json);
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    let modified = r#"
execution:
  engine_id: "EXP"
  execution_mode: "PAPER"
risk:
  max_risk_per_trade: 0.02
  max_leverage: 100
paper_broker:
  latency_ms: 0
  fill_rule: "IMMEDIATE"
"#;
    let b = load_layered_yaml_from_strings(&[modified]).unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn merged_layers_produce_stable_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);

    let risk = a
        .config_json
        .pointer("/risk/max_risk_per_trade")
        .and_then(|v| v.as_f64())
        .unwrap();
    assert!((risk - 0.005).abs() < 1e-9, "overlay should override base max_risk_per_trade");
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn empty_config_produces_stable_hash() {
    let a = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let b = load_layered_yaml_from_strings(&["{}"]).unwrap();

    assert_eq!(a.config_hash, b.config_hash);
}
