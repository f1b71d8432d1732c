use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use serde_json::Value;
use td_audit::{AuditLedger, VerifyResult};
use td_schemas::{AuditEntry, Category, ChangeEvent, PriceRecord};
use td_store::{BlobStore, PriceStore};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

use crate::{diff_batch, validate_batch, CategoryLocks, ReconcileError};

/// Receives one event per successfully persisted reconciliation.
///
/// Delivery is at-most-once; implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &ChangeEvent);
}

/// What a successful [`ReconcileEngine::reconcile`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub category: Category,
    /// Ledger entries appended by this call, in append order.
    pub audit: Vec<AuditEntry>,
    /// Number of records now stored for the category.
    pub records: usize,
    /// The batch this call committed for the category.
    pub committed: Vec<PriceRecord>,
}

/// Owns the price store and the audit ledger for the lifetime of the
/// process. Share it by `Arc`.
pub struct ReconcileEngine {
    store: RwLock<PriceStore>,
    ledger: Mutex<AuditLedger>,
    locks: CategoryLocks,
    /// Serializes full-store snapshots so writes land in commit order.
    persist_lock: AsyncMutex<()>,
    blob: Arc<dyn BlobStore>,
    prices_key: String,
    notifier: Arc<dyn Notifier>,
}

impl ReconcileEngine {
    pub fn new(
        store: PriceStore,
        ledger: AuditLedger,
        blob: Arc<dyn BlobStore>,
        prices_key: impl Into<String>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store: RwLock::new(store),
            ledger: Mutex::new(ledger),
            locks: CategoryLocks::new(),
            persist_lock: AsyncMutex::new(()),
            blob,
            prices_key: prices_key.into(),
            notifier,
        }
    }

    /// Startup: restore the price store from `blob` (empty if missing or
    /// unparsable) and take ownership of an already opened ledger.
    pub async fn load(
        blob: Arc<dyn BlobStore>,
        prices_key: impl Into<String>,
        ledger: AuditLedger,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let prices_key = prices_key.into();
        let store = PriceStore::load(blob.as_ref(), &prices_key).await;
        info!(
            records = store.len(),
            audit_entries = ledger.len(),
            "reconcile engine ready"
        );
        Self::new(store, ledger, blob, prices_key, notifier)
    }

    pub fn all_prices(&self) -> Vec<PriceRecord> {
        self.read_store().all().to_vec()
    }

    pub fn prices_for(&self, category: &Category) -> Vec<PriceRecord> {
        self.read_store().by_category(category)
    }

    /// Full ledger in chronological order.
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.ledger().entries().to_vec()
    }

    pub fn audit_filter(&self, category: Option<&str>, id: Option<&str>) -> Vec<AuditEntry> {
        self.ledger().filter(category, id)
    }

    pub fn verify_ledger(&self) -> Result<VerifyResult> {
        self.ledger().verify()
    }

    /// Validate, diff, commit, persist and notify for one category.
    ///
    /// Malformed input is rejected before anything changes. A failed persist
    /// leaves the in-memory store and ledger updated, returns
    /// [`ReconcileError::Persistence`] and sends no notification.
    pub async fn reconcile(
        &self,
        raw_category: &str,
        payload: &Value,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let category = Category::parse(raw_category)?;
        let records = validate_batch(&category, payload).map_err(|rejection| {
            warn!(category = %category, reason = %rejection, "price batch rejected");
            rejection
        })?;

        let _exclusive = self.locks.lock(&category).await;

        let previous = self
            .write_store()
            .replace_category(&category, records.clone());
        let changes = diff_batch(&category, &previous, &records);

        let audit: Vec<AuditEntry> = {
            let mut ledger = self.ledger();
            changes
                .into_iter()
                .map(|change| {
                    let appended = ledger.append(change);
                    if !appended.durable {
                        warn!(
                            category = %category,
                            seq = appended.entry.seq,
                            "audit entry kept in memory only"
                        );
                    }
                    appended.entry
                })
                .collect()
        };

        if let Err(err) = self.persist().await {
            let reason = format!("{err:#}");
            error!(category = %category, error = %reason, "persisting prices failed; notification suppressed");
            return Err(ReconcileError::Persistence {
                category: category.to_string(),
                reason,
            });
        }

        info!(
            category = %category,
            records = records.len(),
            audited = audit.len(),
            "prices saved"
        );

        self.notifier.notify(&ChangeEvent {
            category: category.clone(),
            records: records.clone(),
        });
        Ok(ReconcileOutcome {
            category,
            audit,
            records: records.len(),
            committed: records,
        })
    }

    /// Shutdown: write the store once more and fsync the ledger.
    pub async fn flush(&self) -> Result<()> {
        self.persist().await.context("final price persist failed")?;
        self.ledger().flush()
    }

    async fn persist(&self) -> Result<()> {
        let _ordered = self.persist_lock.lock().await;
        let bytes = {
            let store = self.read_store();
            store.encode()?
        };
        self.blob
            .put(&self.prices_key, bytes)
            .await
            .with_context(|| format!("write {}", self.prices_key))
    }

    fn read_store(&self) -> RwLockReadGuard<'_, PriceStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, PriceStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn ledger(&self) -> MutexGuard<'_, AuditLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
