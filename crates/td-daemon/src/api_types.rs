//! Request and response bodies of the td-daemon HTTP endpoints.
//!
//! No business logic lives here.

use serde::{Deserialize, Serialize};
use td_schemas::HistoryPoint;

// ---------------------------------------------------------------------------
// /api/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub records: usize,
    pub audit_entries: usize,
}

// ---------------------------------------------------------------------------
// Errors (400 / 500)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// "MALFORMED_INPUT" | "PERSISTENCE_FAILED" | "INTERNAL_ERROR"
    pub error: String,
    pub message: String,
}

// ---------------------------------------------------------------------------
// POST /api/prices/:category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePricesResponse {
    pub ok: bool,
    pub category: String,
    /// Audit entries appended by this save.
    pub audited: usize,
    /// Records now stored for the category.
    pub records: usize,
}

// ---------------------------------------------------------------------------
// /api/audit-logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditQuery {
    pub category: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub lines: Option<usize>,
    pub broken_at: Option<usize>,
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /api/history/:category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryLoggedResponse {
    pub logged: bool,
    pub point: Option<HistoryPoint>,
}
