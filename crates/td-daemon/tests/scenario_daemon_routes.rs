//! In-process scenario tests for td-daemon HTTP endpoints.
//!
//! The router is driven via `tower::ServiceExt::oneshot`; no socket is bound.
//!
//! GREEN when:
//! - POST /api/prices/:category answers 200 `{ok, category, audited, records}`
//!   and the audit log shows one entry per changed field.
//! - Malformed batches answer 400 `{error, message}` and change nothing.
//! - A failing store write answers 500 and no pricesUpdated event is sent.
//! - Each successful save logs a best-price history point for the category.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use td_audit::AuditLedger;
use td_config::DeskConfig;
use td_daemon::{routes, state};
use td_store::MemoryBlobStore;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn make_state() -> Arc<state::AppState> {
    Arc::new(state::AppState::in_memory(DeskConfig::default()).await)
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(st: &Arc<state::AppState>, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = routes::build_router(Arc::clone(st))
        .oneshot(req)
        .await
        .expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn post(uri: &str, body: Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn parse_json(b: bytes::Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let st = make_state().await;
    let (status, body) = call(&st, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "td-daemon");
    assert_eq!(json["records"], 0);
}

// ---------------------------------------------------------------------------
// /api/prices
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_then_update_audits_changed_fields() {
    let st = make_state().await;

    let first = json!([
        {"id": "A1", "under25": 10, "over25": 12, "over50": 14, "over90": 16, "status": "open"}
    ]);
    let (status, body) = call(&st, post("/api/prices/a", first)).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json, json!({"ok": true, "category": "A", "audited": 0, "records": 1}));

    let second = json!([
        {"id": "A1", "under25": 11, "over25": 12, "over50": 14, "over90": 16, "status": "close"}
    ]);
    let (status, body) = call(&st, post("/api/prices/A", second)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["audited"], 2);

    let (_, body) = call(&st, get("/api/audit-logs")).await;
    let log = parse_json(body);
    let log = log.as_array().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0]["field"], "under25");
    assert_eq!(log[0]["oldValue"], 10);
    assert_eq!(log[0]["newValue"], 11);
    assert_eq!(log[1]["field"], "status");
    assert_eq!(log[1]["oldValue"], "open");
    assert_eq!(log[1]["newValue"], "close");
    assert!(log[1]["timestamp"].as_str().unwrap().ends_with('Z'));

    let (_, body) = call(&st, get("/api/prices/a")).await;
    assert_eq!(parse_json(body)[0]["status"], "close");
}

#[tokio::test]
async fn audit_log_filters_by_category_and_id() {
    let st = make_state().await;
    for (cat, id) in [("A", "A1"), ("B", "B1")] {
        let rec = |p: i32| json!([{"id": id, "under25": p, "over25": 1, "over50": 1, "over90": 1}]);
        call(&st, post(&format!("/api/prices/{cat}"), rec(1))).await;
        call(&st, post(&format!("/api/prices/{cat}"), rec(2))).await;
    }

    let (_, body) = call(&st, get("/api/audit-logs?category=b")).await;
    let entries = parse_json(body);
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["id"], "B1");

    let (_, body) = call(&st, get("/api/audit-logs?id=A1")).await;
    assert_eq!(parse_json(body).as_array().unwrap().len(), 1);

    let (_, body) = call(&st, get("/api/audit-logs?category=A&id=B1")).await;
    assert!(parse_json(body).as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_batches_are_400_and_change_nothing() {
    let st = make_state().await;

    let cases = [
        json!([{"id": "C1", "under25": -1, "over25": 2, "over50": 3, "over90": 4}]),
        json!({"id": "C1", "under25": 1, "over25": 2, "over50": 3, "over90": 4}),
        json!([{"id": "D1", "under25": 1, "over25": 2, "over50": 3, "over90": 4}]),
    ];
    for case in cases {
        let (status, body) = call(&st, post("/api/prices/C", case)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json = parse_json(body);
        assert_eq!(json["error"], "MALFORMED_INPUT");
        assert!(json["message"].is_string());
    }

    let bad_json = Request::builder()
        .method("POST")
        .uri("/api/prices/C")
        .body(axum::body::Body::from("[{not json"))
        .unwrap();
    let (status, _) = call(&st, bad_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = call(&st, get("/api/prices")).await;
    assert!(parse_json(body).as_array().unwrap().is_empty());
    let (_, body) = call(&st, get("/api/history")).await;
    assert_eq!(parse_json(body), json!({}));
}

#[tokio::test]
async fn persistence_failure_is_500_without_notification() {
    let blob = Arc::new(MemoryBlobStore::new());
    let st = Arc::new(
        state::AppState::with_storage(DeskConfig::default(), blob.clone(), AuditLedger::in_memory(false))
            .await,
    );
    let mut rx = st.bus.subscribe();

    blob.set_fail_writes(true);
    let (status, body) = call(
        &st,
        post("/api/prices/A", json!([{"id": "A1", "under25": 1, "over25": 1, "over50": 1, "over90": 1}])),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(parse_json(body)["error"], "PERSISTENCE_FAILED");

    assert!(rx.try_recv().is_err(), "no event after a failed save");

    // Memory already holds the batch.
    let (_, body) = call(&st, get("/api/prices/A")).await;
    assert_eq!(parse_json(body).as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// /api/history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_logs_best_open_price_as_history() {
    let st = make_state().await;
    let batch = json!([
        {"id": "A1", "under25": 10, "over25": 20, "over50": 30, "over90": 40},
        {"id": "A2", "under25": 10, "over25": 20, "over50": 30, "over90": 99, "status": "close"}
    ]);
    call(&st, post("/api/prices/A", batch)).await;

    let (status, body) = call(&st, get("/api/history/a")).await;
    assert_eq!(status, StatusCode::OK);
    let points = parse_json(body);
    assert_eq!(points.as_array().unwrap().len(), 1);
    assert_eq!(points[0]["highest"], 40.0);
}

#[tokio::test]
async fn history_snapshot_post_and_chart() {
    let st = make_state().await;

    let snapshot = json!({
        "under25": {"under25": 30},
        "over25": {"over25": 45},
        "over50": null
    });
    let (status, body) = call(&st, post("/api/history/A", snapshot)).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["logged"], true);
    assert_eq!(json["point"]["highest"], 45.0);

    let (_, body) = call(&st, post("/api/history/A", json!({"under25": null}))).await;
    assert_eq!(parse_json(body)["logged"], false);

    let (_, body) = call(&st, get("/api/history")).await;
    assert_eq!(parse_json(body)["A"].as_array().unwrap().len(), 1);

    let (status, body) = call(&st, get("/api/history/A/chart")).await;
    assert_eq!(status, StatusCode::OK);
    let chart = parse_json(body);
    assert_eq!(chart["label"], "A Highest Price per 10 Minutes (¥)");
    assert_eq!(chart["labels"].as_array().unwrap().len(), 1);
    assert_eq!(chart["values"], json!([45.0]));
}

#[tokio::test]
async fn audit_verify_reports_valid_chain() {
    let mut cfg = DeskConfig::default();
    cfg.audit.hash_chain = true;
    let st = Arc::new(state::AppState::in_memory(cfg).await);

    let rec = |p: i32| json!([{"id": "A1", "under25": p, "over25": 1, "over50": 1, "over90": 1}]);
    for p in 1..=3 {
        call(&st, post("/api/prices/A", rec(p))).await;
    }

    let (status, body) = call(&st, get("/api/audit-logs/verify")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["valid"], true);
    assert_eq!(json["lines"], 2);
}
