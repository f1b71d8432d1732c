//! Shared runtime state for td-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The engine owns the
//! price store and audit ledger; the history aggregator lives here.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use td_audit::AuditLedger;
use td_config::DeskConfig;
use td_history::{BestDeals, HistoryAggregator};
use td_reconcile::{Notifier, ReconcileEngine};
use td_schemas::{Category, ChangeEvent, HistoryPoint};
use td_store::{BlobStore, FileBlobStore, MemoryBlobStore};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BusMsg {
    #[serde(rename_all = "camelCase")]
    Heartbeat { ts_millis: i64 },
    PricesUpdated(ChangeEvent),
    HistoryPoint {
        category: Category,
        point: HistoryPoint,
    },
}

impl BusMsg {
    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::PricesUpdated(_) => "pricesUpdated",
            BusMsg::HistoryPoint { .. } => "historyPoint",
        }
    }
}

/// Forwards reconciliation events onto the bus. Late subscribers get no replay.
pub struct BusNotifier {
    bus: broadcast::Sender<BusMsg>,
}

impl BusNotifier {
    pub fn new(bus: broadcast::Sender<BusMsg>) -> Self {
        Self { bus }
    }
}

impl Notifier for BusNotifier {
    fn notify(&self, event: &ChangeEvent) {
        // Err only means nobody is listening right now.
        let receivers = self.bus.send(BusMsg::PricesUpdated(event.clone())).unwrap_or(0);
        debug!(category = %event.category, receivers, "pricesUpdated broadcast");
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub config: Arc<DeskConfig>,
    pub engine: Arc<ReconcileEngine>,
    pub history: Arc<RwLock<HistoryAggregator>>,
}

impl AppState {
    /// Production wiring: file-backed blob store and JSON Lines ledger under
    /// `storage.data_dir`.
    pub async fn boot(config: DeskConfig) -> anyhow::Result<Self> {
        let storage = &config.storage;
        let blob = FileBlobStore::new(&storage.data_dir)
            .with_context(|| format!("open data dir {:?}", storage.data_dir))?;
        let ledger = AuditLedger::open(storage.audit_path(), config.audit.hash_chain)?;
        info!(
            data_dir = %storage.data_dir.display(),
            ledger = %storage.audit_path().display(),
            hash_chain = config.audit.hash_chain,
            "storage opened"
        );
        Ok(Self::with_storage(config, Arc::new(blob), ledger).await)
    }

    /// In-process wiring with no files, for tests and throwaway runs.
    pub async fn in_memory(config: DeskConfig) -> Self {
        let hash_chain = config.audit.hash_chain;
        Self::with_storage(
            config,
            Arc::new(MemoryBlobStore::new()),
            AuditLedger::in_memory(hash_chain),
        )
        .await
    }

    pub async fn with_storage(
        config: DeskConfig,
        blob: Arc<dyn BlobStore>,
        ledger: AuditLedger,
    ) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(config.notify.bus_capacity.max(1));
        let notifier = Arc::new(BusNotifier::new(bus.clone()));
        let engine =
            ReconcileEngine::load(blob, config.storage.prices_key.clone(), ledger, notifier).await;
        let history = HistoryAggregator::new(config.history.max_points_per_category);

        Self {
            bus,
            build: BuildInfo {
                service: "td-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config: Arc::new(config),
            engine: Arc::new(engine),
            history: Arc::new(RwLock::new(history)),
        }
    }

    /// Append a best-price point for `category` and announce it on the bus.
    pub async fn record_history(&self, category: &Category, deals: &BestDeals) -> Option<HistoryPoint> {
        let point = self.history.write().await.log_best_price(category, deals)?;
        let _ = self.bus.send(BusMsg::HistoryPoint {
            category: category.clone(),
            point,
        });
        Some(point)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
