//! Concurrent writers against one category.
//!
//! GREEN when:
//! - Many concurrent reconciles of the same category all succeed.
//! - The final store holds exactly one of the submitted batches.
//! - The persisted document equals the final in-memory store.
//! - Ledger `seq` values are contiguous (no interleaved appends lost).
//! - Each outcome reports the batch its own call committed, even when other
//!   writers to the category finish first.

use std::sync::Arc;

use serde_json::json;
use td_audit::AuditLedger;
use td_reconcile::{Notifier, ReconcileEngine};
use td_schemas::{Category, ChangeEvent, PriceRecord};
use td_store::{MemoryBlobStore, PriceStore};

struct Quiet;

impl Notifier for Quiet {
    fn notify(&self, _event: &ChangeEvent) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writers_are_serialized_per_category() {
    let blob = Arc::new(MemoryBlobStore::new());
    let engine = Arc::new(ReconcileEngine::new(
        PriceStore::new(vec![PriceRecord::new("A1", 0.0, 0.0, 0.0, 0.0)]),
        AuditLedger::in_memory(false),
        blob.clone(),
        "prices.json",
        Arc::new(Quiet),
    ));

    let mut tasks = Vec::new();
    for i in 1..=32 {
        let engine = engine.clone();
        let category = if i % 2 == 0 { "A" } else { "B" };
        tasks.push(tokio::spawn(async move {
            let batch = json!([{
                "id": format!("{category}1"),
                "under25": i, "over25": i, "over50": i, "over90": i
            }]);
            (i, engine.reconcile(category, &batch).await)
        }));
    }
    for t in tasks {
        let (i, outcome) = t.await.unwrap();
        let outcome = outcome.unwrap();
        assert_eq!(outcome.committed.len(), 1);
        assert_eq!(outcome.committed[0].under25, i as f64);
    }

    let a = engine.prices_for(&Category::parse("A").unwrap());
    let b = engine.prices_for(&Category::parse("B").unwrap());
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);

    let persisted: Vec<PriceRecord> =
        serde_json::from_slice(&blob.snapshot("prices.json").unwrap()).unwrap();
    assert_eq!(persisted, engine.all_prices());

    let seqs: Vec<u64> = engine.audit_log().iter().map(|e| e.seq).collect();
    let expected: Vec<u64> = (0..seqs.len() as u64).collect();
    assert_eq!(seqs, expected);
}
