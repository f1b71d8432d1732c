use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Quantity tiers a record is priced at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Under25,
    Over25,
    Over50,
    Over90,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Under25, Tier::Over25, Tier::Over50, Tier::Over90];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Under25 => "under25",
            Tier::Over25 => "over25",
            Tier::Over50 => "over50",
            Tier::Over90 => "over90",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceStatus {
    Open,
    Close,
}

impl PriceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceStatus::Open => "open",
            PriceStatus::Close => "close",
        }
    }
}

/// Fields compared during reconciliation, in audit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedField {
    Tier(Tier),
    Status,
    Name,
}

impl TrackedField {
    pub const ORDER: [TrackedField; 6] = [
        TrackedField::Tier(Tier::Under25),
        TrackedField::Tier(Tier::Over25),
        TrackedField::Tier(Tier::Over50),
        TrackedField::Tier(Tier::Over90),
        TrackedField::Status,
        TrackedField::Name,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Tier(t) => t.as_str(),
            TrackedField::Status => "status",
            TrackedField::Name => "name",
        }
    }
}

/// Current price state of one record.
///
/// Fields the desk does not interpret are kept in `extra` and written back
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(with = "price_serde")]
    pub under25: f64,
    #[serde(with = "price_serde")]
    pub over25: f64,
    #[serde(with = "price_serde")]
    pub over50: f64,
    #[serde(with = "price_serde")]
    pub over90: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PriceStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PriceRecord {
    pub fn new(id: impl Into<String>, under25: f64, over25: f64, over50: f64, over90: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            under25,
            over25,
            over50,
            over90,
            status: None,
            extra: Map::new(),
        }
    }

    pub fn with_status(mut self, status: PriceStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn tier(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Under25 => self.under25,
            Tier::Over25 => self.over25,
            Tier::Over50 => self.over50,
            Tier::Over90 => self.over90,
        }
    }

    /// Absent status means open.
    pub fn is_open(&self) -> bool {
        self.status != Some(PriceStatus::Close)
    }

    /// JSON view of a tracked field; `None` when the field is absent.
    pub fn field_value(&self, field: TrackedField) -> Option<Value> {
        match field {
            TrackedField::Tier(t) => Some(price_value(self.tier(t))),
            TrackedField::Status => self.status.map(|s| Value::String(s.as_str().to_string())),
            TrackedField::Name => self.name.clone().map(Value::String),
        }
    }
}

/// Integral prices are rendered without a fractional part (`10`, not `10.0`).
pub fn price_value(v: f64) -> Value {
    if is_integral(v) {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

// 2^53: beyond this f64 no longer represents every integer.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn is_integral(v: f64) -> bool {
    v.is_finite() && v.fract() == 0.0 && v.abs() < MAX_EXACT_INT
}

mod price_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if super::is_integral(*v) {
            s.serialize_i64(*v as i64)
        } else {
            s.serialize_f64(*v)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        f64::deserialize(d)
    }
}
