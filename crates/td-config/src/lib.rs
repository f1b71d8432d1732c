//! td-config
//!
//! Layered YAML configuration for the price desk.
//!
//! Layers are merged in order (earlier = base, later = override), converted
//! to JSON, hashed (SHA-256 over the canonical JSON) and finally decoded into
//! the typed [`DeskConfig`]. Every key has a default, so zero layers is a
//! valid configuration.

mod desk;

pub use desk::{AuditConfig, DeskConfig, HistoryConfig, NotifyConfig, ServerConfig, StorageConfig};

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use tracing::warn;

/// Top-level sections read by [`DeskConfig`]. Anything else is reported as
/// unknown.
const KNOWN_SECTIONS: &[&str] = &["server", "storage", "audit", "history", "notify", "categories"];

/// Merged configuration document plus its identity.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Hex SHA-256 of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Decode the merged document into the typed configuration.
    pub fn desk(&self) -> Result<DeskConfig> {
        serde_json::from_value(self.config_json.clone()).context("invalid desk config")
    }

    /// JSON pointers of leaves outside every known section, sorted.
    pub fn unknown_keys(&self) -> Vec<String> {
        let Some(root) = self.config_json.as_object() else {
            return Vec::new();
        };
        let mut unknown: Vec<String> = root
            .iter()
            .filter(|(section, _)| !KNOWN_SECTIONS.contains(&section.as_str()))
            .flat_map(|(section, v)| leaf_pointers(v, format!("/{}", pointer_token(section))))
            .collect();
        unknown.sort();
        unknown
    }
}

/// Read and merge YAML files in order.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("read config layer {p}")))
        .collect::<Result<Vec<String>>>()?;
    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML documents in order. Empty documents are skipped.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(serde_json::Map::new());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let layer: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("config layer {i} is not valid yaml"))?;
        let layer = serde_json::to_value(layer).context("yaml -> json conversion failed")?;
        if !layer.is_null() {
            merge_into(&mut merged, layer);
        }
    }

    // serde_json maps are ordered by key, so this rendering is canonical.
    let canonical_json = serde_json::to_string(&merged).context("serialize merged config")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Load the layers, warn about unknown keys and decode the typed config.
pub fn load_desk_config(paths: &[&str]) -> Result<(LoadedConfig, DeskConfig)> {
    let loaded = load_layered_yaml(paths)?;
    let unknown = loaded.unknown_keys();
    if !unknown.is_empty() {
        warn!(keys = ?unknown, "config contains keys the desk does not read");
    }
    let desk = loaded.desk()?;
    Ok((loaded, desk))
}

/// Objects merge key by key; any other value replaces what was there.
fn merge_into(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base_map), Value::Object(layer_map)) => {
            for (k, v) in layer_map {
                merge_into(base_map.entry(k).or_insert(Value::Null), v);
            }
        }
        (slot, other) => *slot = other,
    }
}

/// Pointers to every scalar (or empty container) under `v`.
fn leaf_pointers(v: &Value, at: String) -> Vec<String> {
    match v {
        Value::Object(map) if !map.is_empty() => map
            .iter()
            .flat_map(|(k, child)| leaf_pointers(child, format!("{at}/{}", pointer_token(k))))
            .collect(),
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .enumerate()
            .flat_map(|(i, child)| leaf_pointers(child, format!("{at}/{i}")))
            .collect(),
        _ => vec![at],
    }
}

/// RFC 6901 escaping.
fn pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}
