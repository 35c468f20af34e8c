//! mkp-config
//!
//! Layered YAML configuration.
//!
//! - Layers are merged in order; later layers override earlier ones key by
//!   key (objects merge recursively, everything else replaces).
//! - The merged document is canonicalized to JSON and hashed (SHA-256) so a
//!   running daemon can report exactly which configuration it booted with.
//! - Literal credentials are refused (`CONFIG_SECRET_DETECTED`). Config
//!   stores env var NAMES; values are resolved in [`secrets`].
//! - [`report_unused_keys`] flags leaves no code reads.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub mod secrets;
mod settings;

pub use settings::{EngineSettings, StorageBackend, StorageSettings, DEFAULT_BIND_ADDR};

/// Leaf strings starting with one of these abort the load.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
    "postgres://",
    "postgresql://",
];

/// JSON-pointer prefixes the engine actually reads.
///
/// A leaf is consumed if it sits at or under one of these. Keep this in step
/// with [`EngineSettings::from_config_json`] and [`secrets::resolve_secrets`].
pub const CONSUMED_POINTERS: &[&str] = &[
    "/daemon/bind_addr",
    "/catalog/delete_policy",
    "/orders/lifecycle_policy",
    "/orders/phone_digits",
    "/orders/delivery_estimate/pending_hours",
    "/orders/delivery_estimate/shipped_hours",
    "/storage/backend",
    "/storage/database_url_env",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedKeyReport {
    /// Sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Compare every leaf of `config_json` against [`CONSUMED_POINTERS`].
///
/// `Warn` always returns the report; `Fail` errors when it is not clean.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut unused: Vec<String> = leaves(config_json)
        .into_iter()
        .map(|(pointer, _)| pointer)
        .filter(|pointer| !is_consumed(pointer))
        .collect();
    unused.sort();

    if policy == UnusedKeyPolicy::Fail && !unused.is_empty() {
        let first: Vec<&str> = unused.iter().take(12).map(String::as_str).collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
            Remove them or update CONSUMED_POINTERS. First few: {}",
            unused.len(),
            first.join(", ")
        );
    }

    Ok(UnusedKeyReport {
        unused_leaf_pointers: unused,
    })
}

/// `/orders/phone_digits` is consumed; so is anything nested under a
/// consumed pointer. `/orders/phone` does not consume `/orders/phone_digits`.
fn is_consumed(leaf: &str) -> bool {
    CONSUMED_POINTERS.iter().any(|consumed| {
        leaf.strip_prefix(consumed)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Every scalar in the document with its JSON pointer. Object keys are
/// escaped per RFC 6901; array elements use their index.
fn leaves(root: &Value) -> Vec<(String, &Value)> {
    fn walk<'a>(v: &'a Value, at: String, out: &mut Vec<(String, &'a Value)>) {
        match v {
            Value::Object(map) => {
                for (key, child) in map {
                    let token = key.replace('~', "~0").replace('/', "~1");
                    walk(child, format!("{at}/{token}"), out);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    walk(child, format!("{at}/{i}"), out);
                }
            }
            scalar => out.push((at, scalar)),
        }
    }
    let mut out = Vec::new();
    walk(root, String::new(), &mut out);
    out
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<String>>>()?;
    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for raw in yaml_docs {
        let layer: Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; no overrides.
        if !layer.is_null() {
            overlay(&mut merged, layer);
        }
    }

    if let Some((pointer, _)) = leaves(&merged)
        .into_iter()
        .find(|(_, v)| v.as_str().is_some_and(looks_like_secret))
    {
        bail!("CONFIG_SECRET_DETECTED leaf={pointer} value=REDACTED");
    }

    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    Ok(LoadedConfig {
        config_hash: hex::encode(Sha256::digest(canonical_json.as_bytes())),
        canonical_json,
        config_json: merged,
    })
}

/// Apply `layer` on top of `base`: objects merge key by key, anything else
/// replaces what was there.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, replacement) => *slot = replacement,
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn consumed_pointer_respects_token_boundary() {
        assert!(is_consumed("/orders/phone_digits"));
        assert!(is_consumed("/storage/backend"));
        assert!(!is_consumed("/orders/phone"));
        assert!(!is_consumed("/orders/phone_digits_max"));
        assert!(!is_consumed("/orders"));
    }

    #[test]
    fn leaves_escape_keys_and_index_arrays() {
        let doc = json!({"a/b": {"x~y": 1}, "tags": ["k", "v"]});
        let mut pointers: Vec<String> = leaves(&doc).into_iter().map(|(p, _)| p).collect();
        pointers.sort();
        assert_eq!(pointers, vec!["/a~1b/x~0y", "/tags/0", "/tags/1"]);
    }

    #[test]
    fn overlay_overrides_scalars_and_merges_objects() {
        let mut base = json!({"orders": {"phone_digits": 10, "lifecycle_policy": "permissive"}});
        overlay(&mut base, json!({"orders": {"lifecycle_policy": "forward_only"}}));
        assert_eq!(
            base,
            json!({"orders": {"phone_digits": 10, "lifecycle_policy": "forward_only"}})
        );
    }

    #[test]
    fn database_url_literal_counts_as_secret() {
        assert!(looks_like_secret("postgres://app:hunter2@db/market"));
        assert!(!looks_like_secret("MKP_DATABASE_URL"));
    }
}
