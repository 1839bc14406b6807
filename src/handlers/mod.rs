//! HTTP handlers
//!
//! ```text
//! GET  /api/scrape?url=…  ──▶ scrape::scrape_handler ──▶ Extractor
//! POST /api/search        ──▶ search::search_handler ──▶ SearchIndex
//! GET  /health /ready /status ──▶ status::*          ──▶ ServiceStats
//! ```
//!
//! Errors are reported as `{"error": "<message>"}` with the matching status.

pub mod scrape;
pub mod search;
pub mod status;

pub use scrape::scrape_handler;
pub use search::search_handler;
pub use status::{
    health_handler, readiness_handler, status_handler, ExtractionCounts, HealthResponse,
    LatencyHistogram, LatencyMetrics, MemoryMetrics, ServiceStats, StatusResponse,
    SERVER_NAME, SERVER_VERSION,
};

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::cors::{cors_layer, OriginPolicy};
use crate::extraction::Extractor;
use crate::search::SearchIndex;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Runs page extractions
    pub extractor: Extractor,
    /// FAQ documents for `/api/search`
    pub search: Arc<SearchIndex>,
    /// Request counters
    pub stats: Arc<ServiceStats>,
}

impl AppState {
    /// Fresh state with zeroed counters
    pub fn new(extractor: Extractor, search: SearchIndex) -> Self {
        Self {
            extractor,
            search: Arc::new(search),
            stats: Arc::new(ServiceStats::new()),
        }
    }
}

impl FromRef<AppState> for Arc<ServiceStats> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.stats)
    }
}

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message
    pub error: String,
}

/// `status` with `{"error": message}`
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// The full API with request tracing and CORS applied
pub fn app_router(state: AppState, origins: OriginPolicy) -> Router {
    Router::new()
        .route("/api/scrape", get(scrape_handler))
        .route("/api/search", post(search_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(readiness_handler))
        .route("/status", get(status_handler))
        .with_state(state)
        .layer(cors_layer(origins))
        .layer(TraceLayer::new_for_http())
}
