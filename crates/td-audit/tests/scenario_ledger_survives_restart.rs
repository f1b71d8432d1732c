//! Ledger persistence across restarts.
//!
//! GREEN when:
//! - Entries appended to a file-backed ledger are readable after reopening,
//!   in the same order, and `seq` continues where it stopped.
//! - A legacy whole-document JSON array is loaded and migrated to JSON Lines.
//! - A legacy document that cannot be migrated fails `open` and stays as is.
//! - An unparsable ledger file is moved aside and the ledger starts empty.
//! - A write failure keeps the entry in memory and reports it as not durable.

use serde_json::json;
use td_audit::AuditLedger;
use td_schemas::{Category, FieldChange};

fn change(id: &str, field: &'static str, old: serde_json::Value, new: serde_json::Value) -> FieldChange {
    FieldChange {
        category: Category::parse("A").unwrap(),
        id: id.to_string(),
        field,
        old_value: Some(old),
        new_value: Some(new),
    }
}

#[test]
fn reopened_ledger_restores_entries_and_continues_seq() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    {
        let mut ledger = AuditLedger::open(&path, false).unwrap();
        assert!(ledger.is_empty());
        assert!(ledger.append(change("A1", "under25", json!(10), json!(11))).durable);
        assert!(ledger.append(change("A1", "status", json!("open"), json!("close"))).durable);
    }

    let mut reopened = AuditLedger::open(&path, false).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.entries()[0].field, "under25");
    assert_eq!(reopened.entries()[1].new_value, Some(json!("close")));

    let third = reopened.append(change("A2", "over90", json!(5), json!(6))).entry;
    assert_eq!(third.seq, 2);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 3, "one JSON line per entry");
}

#[test]
fn legacy_json_array_is_migrated_to_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auditLogs.json");
    let legacy = json!([
        {"category": "A", "id": "A1", "field": "under25", "oldValue": 10, "newValue": 11,
         "timestamp": "2025-05-04T10:20:30.000Z"},
        {"category": "B", "id": "B2", "field": "name", "newValue": "Silver",
         "timestamp": "2025-05-04T10:21:00.000Z"}
    ]);
    std::fs::write(&path, serde_json::to_string_pretty(&legacy).unwrap()).unwrap();

    let ledger = AuditLedger::open(&path, false).unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.entries()[1].seq, 1);
    assert_eq!(ledger.entries()[1].old_value, None);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.lines().all(|l| l.starts_with('{')));
}

#[test]
fn failed_migration_refuses_to_open_and_keeps_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auditLogs.json");
    let legacy = serde_json::to_string(&json!([
        {"category": "A", "id": "A1", "field": "under25", "oldValue": 10, "newValue": 11,
         "timestamp": "2025-05-04T10:20:30.000Z"}
    ]))
    .unwrap();
    std::fs::write(&path, &legacy).unwrap();
    // The migration's temp file path is taken by a directory.
    std::fs::create_dir(path.with_extension("migrating")).unwrap();

    assert!(AuditLedger::open(&path, false).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), legacy);
}

#[test]
fn corrupt_ledger_is_moved_aside_and_ledger_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    std::fs::write(&path, "{not json at all\n").unwrap();

    let ledger = AuditLedger::open(&path, false).unwrap();
    assert!(ledger.is_empty());
    assert!(!path.exists(), "corrupt file must not stay in place");

    let moved = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().starts_with("audit.jsonl.corrupt-"));
    assert!(moved);
}

#[test]
fn unwritable_ledger_keeps_entry_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    let mut ledger = AuditLedger::open(&path, false).unwrap();

    // A directory where the file should be makes every append fail.
    std::fs::create_dir(&path).unwrap();

    let appended = ledger.append(change("A1", "under25", json!(1), json!(2)));
    assert!(!appended.durable);
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.entries()[0], appended.entry);
}
