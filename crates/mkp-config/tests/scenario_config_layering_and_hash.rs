//! Scenario: layered config loads deterministically.
//!
//! # Invariants under test
//!
//! 1. Same layers → same hash and canonical JSON.
//! 2. Key order inside a layer does not affect the hash.
//! 3. Later layers override earlier ones key by key.
//! 4. The shipped default layer parses into `EngineSettings::default()` and
//!    is fully consumed.
//! 5. Files on disk load the same as strings.

use std::io::Write;

use mkp_config::{
    load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, EngineSettings,
    UnusedKeyPolicy,
};
use mkp_orders::LifecyclePolicy;

const BASE_YAML: &str = include_str!("../../../config/defaults/base.yaml");

const BASE_REORDERED: &str = r#"
storage:
  database_url_env: MKP_DATABASE_URL
  backend: memory
orders:
  delivery_estimate:
    shipped_hours: 2
    pending_hours: 3
  phone_digits: 10
  lifecycle_policy: permissive
catalog:
  delete_policy: permissive
daemon:
  bind_addr: "127.0.0.1:8899"
"#;

const OVERLAY_YAML: &str = r#"
orders:
  lifecycle_policy: forward_only
"#;

#[test]
fn same_layers_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64);
    assert!(a.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_only_its_keys() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);

    let s = EngineSettings::from_config_json(&merged.config_json).unwrap();
    assert_eq!(s.lifecycle_policy, LifecyclePolicy::ForwardOnly);
    assert_eq!(s.ledger.phone_digits, 10);
}

#[test]
fn shipped_defaults_match_code_defaults_and_are_consumed() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let s = EngineSettings::from_config_json(&loaded.config_json).unwrap();
    assert_eq!(s, EngineSettings::default());

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}

#[test]
fn files_load_like_strings() {
    let mut base = tempfile::NamedTempFile::new().unwrap();
    base.write_all(BASE_YAML.as_bytes()).unwrap();
    let mut overlay = tempfile::NamedTempFile::new().unwrap();
    overlay.write_all(OVERLAY_YAML.as_bytes()).unwrap();

    let base_path = base.path().to_str().unwrap().to_string();
    let overlay_path = overlay.path().to_str().unwrap().to_string();

    let from_files = load_layered_yaml(&[&base_path, &overlay_path]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_is_an_error_naming_the_path() {
    let err = load_layered_yaml(&["/definitely/not/here/mkp.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here/mkp.yaml"));
}
