use std::collections::HashSet;

use serde_json::Value;
use td_schemas::{Category, PriceRecord, Tier};

use crate::BatchRejection;

/// Is a loosely-typed candidate a well-formed price record?
///
/// - `id` is a string
/// - every tier is a number >= 0
/// - `status` is absent/null or one of "open", "close"
/// - `name` is absent/null or a string
pub fn is_valid_entry(entry: &Value) -> bool {
    let Some(obj) = entry.as_object() else {
        return false;
    };

    let id_ok = obj.get("id").is_some_and(Value::is_string);

    let tiers_ok = Tier::ALL.iter().all(|t| {
        obj.get(t.as_str())
            .and_then(Value::as_f64)
            .is_some_and(|v| v >= 0.0)
    });

    let status_ok = match obj.get("status") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s == "open" || s == "close",
        Some(_) => false,
    };

    let name_ok = matches!(obj.get("name"), None | Some(Value::Null) | Some(Value::String(_)));

    id_ok && tiers_ok && status_ok && name_ok
}

/// All-or-nothing validation of a candidate batch for `category`.
///
/// Beyond [`is_valid_entry`], the batch is refused when an id is repeated or
/// when an id does not start with the category prefix
/// ([`BatchRejection::OutsideCategory`]).
pub fn validate_batch(category: &Category, payload: &Value) -> Result<Vec<PriceRecord>, BatchRejection> {
    let Some(items) = payload.as_array() else {
        return Err(BatchRejection::NotASequence);
    };

    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        if !is_valid_entry(item) {
            return Err(BatchRejection::InvalidEntry { index });
        }
        let record: PriceRecord = serde_json::from_value(item.clone())
            .map_err(|_| BatchRejection::InvalidEntry { index })?;

        if !category.owns(&record.id) {
            return Err(BatchRejection::OutsideCategory {
                id: record.id,
                category: category.to_string(),
            });
        }
        if !seen.insert(record.id.clone()) {
            return Err(BatchRejection::DuplicateId { id: record.id });
        }
        records.push(record);
    }

    Ok(records)
}
