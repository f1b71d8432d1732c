//! td-schemas
//!
//! Shared data model for the price desk: price records and their tiers,
//! categories, audit entries, history points and change events.
//! No IO lives here.

mod audit;
mod category;
mod price;

pub use audit::{iso_millis, AuditEntry, FieldChange};
pub use category::{Category, CategoryError};
pub use price::{price_value, PriceRecord, PriceStatus, Tier, TrackedField};

use serde::{Deserialize, Serialize};

/// One point of a category's best-price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Epoch milliseconds (UTC).
    pub timestamp: i64,
    pub highest: f64,
}

/// Payload pushed to viewers after a category was reconciled and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub category: Category,
    pub records: Vec<PriceRecord>,
}
