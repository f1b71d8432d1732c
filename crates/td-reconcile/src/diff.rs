use td_schemas::{Category, FieldChange, PriceRecord, TrackedField};

/// Field-level differences between two versions of the same record, in
/// [`TrackedField::ORDER`]. Absent vs present counts as a change.
pub fn diff_record(category: &Category, old: &PriceRecord, new: &PriceRecord) -> Vec<FieldChange> {
    TrackedField::ORDER
        .iter()
        .filter(|field| differs(old, new, **field))
        .map(|field| FieldChange {
            category: category.clone(),
            id: new.id.clone(),
            field: field.as_str(),
            old_value: old.field_value(*field),
            new_value: new.field_value(*field),
        })
        .collect()
}

/// Changes produced by replacing `old_records` with `new_records`.
///
/// Candidates are walked in submission order. A candidate without a stored
/// record of the same id is a creation and produces nothing.
pub fn diff_batch(
    category: &Category,
    old_records: &[PriceRecord],
    new_records: &[PriceRecord],
) -> Vec<FieldChange> {
    new_records
        .iter()
        .filter_map(|new| {
            old_records
                .iter()
                .find(|old| old.id == new.id)
                .map(|old| diff_record(category, old, new))
        })
        .flatten()
        .collect()
}

fn differs(old: &PriceRecord, new: &PriceRecord, field: TrackedField) -> bool {
    match field {
        TrackedField::Tier(t) => old.tier(t) != new.tier(t),
        TrackedField::Status => old.status != new.status,
        TrackedField::Name => old.name != new.name,
    }
}
