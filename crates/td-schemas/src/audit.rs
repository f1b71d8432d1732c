use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Category;

/// A single field-level difference found while reconciling a category.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub category: Category,
    pub id: String,
    pub field: &'static str,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Immutable ledger row. Never mutated or removed once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Position in the ledger (0-based, continues across restarts).
    #[serde(default)]
    pub seq: u64,
    pub category: String,
    pub id: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_prev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_self: Option<String>,
}

impl AuditEntry {
    pub fn from_change(seq: u64, change: FieldChange, timestamp: DateTime<Utc>) -> Self {
        Self {
            seq,
            category: change.category.to_string(),
            id: change.id,
            field: change.field.to_string(),
            old_value: change.old_value,
            new_value: change.new_value,
            timestamp,
            hash_prev: None,
            hash_self: None,
        }
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2025-05-04T10:20:30.123Z`.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
