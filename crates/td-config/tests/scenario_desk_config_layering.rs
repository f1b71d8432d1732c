//! Desk config layering and hashing.
//!
//! GREEN when:
//! - Zero layers decode to the documented defaults.
//! - Reordering keys inside a layer does not change the config hash.
//! - Overlays change the hash and override only the keys they name.
//! - Unknown sections are reported; known sections are not.
//! - File-based loading reads layers in order.

use std::io::Write;

use td_config::{load_desk_config, load_layered_yaml_from_strings, DeskConfig};

const BASE_YAML: &str = r#"
server:
  addr: "0.0.0.0:3000"
storage:
  data_dir: "/var/lib/tierdesk"
  prices_key: "prices.json"
audit:
  hash_chain: true
categories:
  A: "Gold"
  B: "Silver"
"#;

const BASE_YAML_REORDERED: &str = r#"
categories:
  B: "Silver"
  A: "Gold"
audit:
  hash_chain: true
storage:
  prices_key: "prices.json"
  data_dir: "/var/lib/tierdesk"
server:
  addr: "0.0.0.0:3000"
"#;

const OVERLAY_YAML: &str = r#"
history:
  bucket_minutes: 5
  max_points_per_category: 500
audit:
  hash_chain: false
"#;

#[test]
fn zero_layers_yield_defaults() {
    let loaded = load_layered_yaml_from_strings(&[]).unwrap();
    let desk = loaded.desk().unwrap();
    assert_eq!(desk, DeskConfig::default());
    assert_eq!(desk.server.addr, "127.0.0.1:3000");
    assert_eq!(desk.history.bucket_minutes, 10);
    assert_eq!(desk.history.max_points_per_category, None);
    assert!(!desk.audit.hash_chain);
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn overlay_overrides_named_keys_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let layered = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, layered.config_hash);

    let desk = layered.desk().unwrap();
    assert!(!desk.audit.hash_chain);
    assert_eq!(desk.history.bucket_minutes, 5);
    assert_eq!(desk.history.bucket_ms(), 300_000);
    assert_eq!(desk.history.max_points_per_category, Some(500));
    assert_eq!(desk.storage.data_dir.to_str(), Some("/var/lib/tierdesk"));
    assert_eq!(desk.display_name("A"), "Gold");
    assert_eq!(desk.display_name("Z"), "Z");
}

#[test]
fn unknown_sections_are_reported() {
    let yaml = "audit:\n  hash_chain: true\nlegacy:\n  port: 3000\n  cors: '*'\n";
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    assert_eq!(loaded.unknown_keys(), vec!["/legacy/cors", "/legacy/port"]);
}

#[test]
fn file_layers_load_in_order() {
    let mut base = tempfile::NamedTempFile::new().unwrap();
    base.write_all(BASE_YAML.as_bytes()).unwrap();
    let mut overlay = tempfile::NamedTempFile::new().unwrap();
    overlay.write_all(OVERLAY_YAML.as_bytes()).unwrap();

    let base_path = base.path().to_str().unwrap().to_string();
    let overlay_path = overlay.path().to_str().unwrap().to_string();
    let (loaded, desk) = load_desk_config(&[&base_path, &overlay_path]).unwrap();

    assert!(!loaded.config_hash.is_empty());
    assert_eq!(desk.server.addr, "0.0.0.0:3000");
    assert_eq!(desk.history.bucket_minutes, 5);
}

#[test]
fn missing_layer_file_is_an_error() {
    let err = load_desk_config(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read yaml path"));
}
