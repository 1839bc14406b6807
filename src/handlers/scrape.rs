//! `GET /api/scrape?url=<absolute http(s) URL>`
//!
//! | outcome            | status | body                                        |
//! |--------------------|--------|---------------------------------------------|
//! | success            | 200    | `{title, metaDescription, h1, status: 200}` |
//! | missing / bad url  | 400    | `{"error": "Invalid URL"}`                  |
//! | timeout            | 504    | `{"error": "Timeout"}`                      |
//! | anything else      | 500    | `{"error": "Failed to scrape the page"}`    |

use std::time::Instant;

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, instrument};

use super::{error_response, AppState};
use crate::error::ExtractionError;

/// First `url` value of a raw query string, percent-decoded
fn url_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}

/// Run one extraction for the `url` query parameter
#[instrument(skip_all)]
pub async fn scrape_handler(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let start = Instant::now();

    let outcome = match url_param(query.as_deref()).filter(|url| !url.is_empty()) {
        Some(url) => state.extractor.extract(&url).await,
        None => {
            debug!("Scrape request without url parameter");
            Err(ExtractionError::InvalidInput)
        }
    };

    state
        .stats
        .record_extraction(outcome.as_ref().map(|_| ()).map_err(|e| *e), start.elapsed());

    match outcome {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => {
            let status =
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, err.to_string())
        }
    }
}
