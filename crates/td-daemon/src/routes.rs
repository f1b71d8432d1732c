//! Axum router and all HTTP handlers for td-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. The scenario tests in `tests/` drive the bare router.

use std::{collections::BTreeMap, convert::Infallible, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use td_audit::VerifyResult;
use td_history::{bucket_highs, project_chart, BestDeals};
use td_schemas::Category;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{AuditQuery, HealthResponse, HistoryLoggedResponse, SavePricesResponse, VerifyResponse},
    error::ApiError,
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are not applied here; `main.rs`
/// attaches them so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/prices", get(all_prices))
        .route("/api/prices/:category", get(category_prices).post(save_prices))
        .route("/api/audit-logs", get(audit_logs))
        .route("/api/audit-logs/verify", get(verify_audit_logs))
        .route("/api/history", get(all_history))
        .route("/api/history/:category", get(category_history).post(log_history))
        .route("/api/history/:category/chart", get(history_chart))
        .route("/api/stream", get(stream))
        .with_state(state)
}

fn parse_category(raw: &str) -> Result<Category, ApiError> {
    Category::parse(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn parse_json(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("body is not valid JSON: {e}")))
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            records: st.engine.all_prices().len(),
            audit_entries: st.engine.audit_log().len(),
        }),
    )
}

// ---------------------------------------------------------------------------
// /api/prices
// ---------------------------------------------------------------------------

pub(crate) async fn all_prices(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(st.engine.all_prices())
}

pub(crate) async fn category_prices(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let category = parse_category(&raw)?;
    Ok(Json(st.engine.prices_for(&category)).into_response())
}

/// Reconcile a category against the submitted batch, then log the best
/// price of the batch this call committed.
pub(crate) async fn save_prices(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload = parse_json(&body)?;
    let outcome = st.engine.reconcile(&raw, &payload).await?;

    let deals = BestDeals::from_records(&outcome.committed);
    st.record_history(&outcome.category, &deals).await;

    info!(category = %outcome.category, audited = outcome.audit.len(), "prices/save");
    Ok((
        StatusCode::OK,
        Json(SavePricesResponse {
            ok: true,
            category: outcome.category.to_string(),
            audited: outcome.audit.len(),
            records: outcome.records,
        }),
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// /api/audit-logs
// ---------------------------------------------------------------------------

pub(crate) async fn audit_logs(
    State(st): State<Arc<AppState>>,
    Query(q): Query<AuditQuery>,
) -> impl IntoResponse {
    Json(st.engine.audit_filter(q.category.as_deref(), q.id.as_deref()))
}

pub(crate) async fn verify_audit_logs(State(st): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let body = match st.engine.verify_ledger()? {
        VerifyResult::Valid { lines } => VerifyResponse {
            valid: true,
            lines: Some(lines),
            broken_at: None,
            reason: None,
        },
        VerifyResult::Broken { line, reason } => VerifyResponse {
            valid: false,
            lines: None,
            broken_at: Some(line),
            reason: Some(reason),
        },
    };
    Ok(Json(body).into_response())
}

// ---------------------------------------------------------------------------
// /api/history
// ---------------------------------------------------------------------------

pub(crate) async fn all_history(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(st.history.read().await.all().clone())
}

pub(crate) async fn category_history(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let category = parse_category(&raw)?;
    let points = st.history.read().await.series(&category).to_vec();
    Ok(Json(points).into_response())
}

/// Log a best-deals snapshot shaped `{tier: {tier: price, id?}}`.
pub(crate) async fn log_history(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let category = parse_category(&raw)?;
    let snapshot = parse_json(&body)?;
    let point = st.record_history(&category, &BestDeals::from_value(&snapshot)).await;

    Ok(Json(HistoryLoggedResponse {
        logged: point.is_some(),
        point,
    })
    .into_response())
}

pub(crate) async fn history_chart(
    State(st): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let category = parse_category(&raw)?;
    let history_cfg = &st.config.history;

    let buckets = {
        let history = st.history.read().await;
        bucket_highs(history.series(&category), history_cfg.bucket_ms())
    };
    let key = category.as_str().to_string();
    let by_category = BTreeMap::from([(key.clone(), buckets)]);
    let names = BTreeMap::from([(key.clone(), st.config.display_name(&key))]);

    let chart = project_chart(&by_category, &key, &names, history_cfg.bucket_minutes.max(1));
    Ok(Json(chart).into_response())
}

// ---------------------------------------------------------------------------
// GET /api/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
