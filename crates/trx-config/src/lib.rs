//! trx-config
//!
//! Layered YAML configuration loading (generic, ambient) plus the enumerated
//! configuration records spec §6 calls out: paper-adapter behavior, risk
//! limits, and retry/circuit-breaker policy. Every option name and its effect
//! is listed exactly once here — no dynamic options objects with optional
//! fields (spec §9 redesign flag).

mod execution;
mod paper_broker;
mod retry;
mod risk;
mod secrets;

pub use execution::ExecutionConfig;
pub use paper_broker::{FillRule, PaperBrokerConfig};
pub use retry::{CircuitBreakerConfig, ErrorCategory, RetryCategoryConfig, RetryConfig};
pub use risk::RiskLimitsConfig;
pub use secrets::{BrokerSecretEnvNames, ResolvedBrokerSecrets};

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut sources = Vec::with_capacity(paths.len());
    for p in paths {
        sources.push(fs::read_to_string(p).with_context(|| format!("read config: {p}"))?);
    }
    let borrowed: Vec<&str> = sources.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&borrowed)
}

/// Same as [`load_layered_yaml`] but takes already-loaded YAML text. Useful
/// for tests and for config embedded at compile time.
pub fn load_layered_yaml_from_strings(layers: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for (i, layer) in layers.iter().enumerate() {
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(layer).with_context(|| format!("parse yaml layer {i}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash: hash,
    })
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Deep-merge: objects merge recursively; arrays replaced; scalars overwritten.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// Canonicalize JSON by sorting all object keys recursively and emitting compact JSON.
fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn layered_yaml_is_deterministic() {
        let mut f1 = tempfile::NamedTempFile::new().unwrap();
        writeln!(f1, "risk:\n  max_risk_per_trade: 0.01").unwrap();
        let mut f2 = tempfile::NamedTempFile::new().unwrap();
        writeln!(f2, "risk:\n  max_leverage: 200").unwrap();

        let p1 = f1.path().to_str().unwrap();
        let p2 = f2.path().to_str().unwrap();

        let a = load_layered_yaml(&[p1, p2]).unwrap();
        let b = load_layered_yaml(&[p1, p2]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(
            a.config_json["risk"]["max_risk_per_trade"],
            serde_json::json!(0.01)
        );
        assert_eq!(a.config_json["risk"]["max_leverage"], serde_json::json!(200));
    }
}
