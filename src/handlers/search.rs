//! `POST /api/search` with body `{"query": "<terms>"}`
//!
//! The body is read raw and parsed here so that a non-JSON body produces
//! the documented `{"error": "Invalid request body"}` rather than axum's
//! own rejection text.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{error_response, AppState};
use crate::search::SearchError;

/// The `query` string out of a request body
pub fn parse_query(body: &[u8]) -> std::result::Result<String, SearchError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| SearchError::InvalidBody)?;
    match value {
        Value::Null => Err(SearchError::InvalidBody),
        Value::Object(mut fields) => match fields.remove("query") {
            Some(Value::String(query)) if !query.trim().is_empty() => Ok(query),
            _ => Err(SearchError::EmptyQuery),
        },
        _ => Err(SearchError::EmptyQuery),
    }
}

/// Score the FAQ set against the posted query
#[instrument(skip_all)]
pub async fn search_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let result = parse_query(&body).and_then(|query| state.search.search(&query));

    match result {
        Ok(outcome) => {
            state.stats.record_search();
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(err) => {
            debug!("Rejected search request: {}", err);
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}
