use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Typed view of the merged configuration document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub audit: AuditConfig,
    pub history: HistoryConfig,
    pub notify: NotifyConfig,
    /// Category key -> display name used in chart labels.
    pub categories: BTreeMap<String, String>,
}

impl DeskConfig {
    /// Display name for a category (keys match case-insensitively); falls
    /// back to the key itself.
    pub fn display_name(&self, category: &str) -> String {
        self.categories
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(category))
            .map(|(_, name)| name.clone())
            .unwrap_or_else(|| category.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Blob key of the persisted price document.
    pub prices_key: String,
    /// Ledger file name, relative to `data_dir`.
    pub audit_file: String,
}

impl StorageConfig {
    pub fn audit_path(&self) -> PathBuf {
        self.data_dir.join(&self.audit_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            prices_key: "prices.json".to_string(),
            audit_file: "audit.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub hash_chain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub bucket_minutes: u32,
    /// None = keep every point.
    pub max_points_per_category: Option<usize>,
}

impl HistoryConfig {
    pub fn bucket_ms(&self) -> i64 {
        i64::from(self.bucket_minutes.max(1)) * 60_000
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            bucket_minutes: 10,
            max_points_per_category: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub bus_capacity: usize,
    /// 0 disables the heartbeat.
    pub heartbeat_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            heartbeat_secs: 15,
        }
    }
}
