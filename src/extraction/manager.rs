//! Extraction session management
//!
//! Owns one browser session per request and drives it through the
//! navigation escalation:
//!
//! ```text
//! Primary (networkidle) ──ok──────────────▶ Success
//!        │ ──timeout──────────────────────▶ Timeout
//!        │ ──other failure──▶ Fallback (domcontentloaded) ──ok──▶ Success
//!                                     │ ──failure──▶ Timeout | NavigationFailure
//! ```
//!
//! The session is closed exactly once, after the state machine has reached
//! a terminal state, whichever one it is.

use crate::browser::{BrowserConfig, BrowserController, PageSession, SessionLauncher, WaitUntil};
use crate::error::{Error, ExtractionError, Result};
use crate::extraction::metadata::{MetadataExtractor, PageFields};
use crate::extraction::validator::ExtractionRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Successful extraction as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Document title
    pub title: String,
    /// Meta description (or og:description)
    pub meta_description: String,
    /// First heading text
    pub h1: String,
    /// Always 200
    pub status: u16,
}

impl From<PageFields> for ExtractionResult {
    fn from(fields: PageFields) -> Self {
        Self {
            title: fields.title,
            meta_description: fields.meta_description,
            h1: fields.h1,
            status: 200,
        }
    }
}

/// Stage of the navigation escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPhase {
    /// Strict attempt, waits for network idle
    Primary,
    /// Relaxed attempt, waits for DOMContentLoaded only
    Fallback,
}

impl NavigationPhase {
    /// Wait condition used in this phase
    pub fn wait_until(self) -> WaitUntil {
        match self {
            NavigationPhase::Primary => WaitUntil::NetworkIdle,
            NavigationPhase::Fallback => WaitUntil::DomContentLoaded,
        }
    }

    /// The phase to try after `err`, or `None` if `err` is terminal.
    ///
    /// A primary timeout is terminal; any fallback failure is terminal.
    pub fn next_after(self, err: &Error) -> Option<Self> {
        match self {
            NavigationPhase::Primary if !err.is_timeout() => Some(NavigationPhase::Fallback),
            _ => None,
        }
    }
}

/// Runs extractions, one isolated browser session each
#[derive(Clone)]
pub struct Extractor {
    launcher: Arc<dyn SessionLauncher>,
}

impl Extractor {
    /// Create an extractor on top of any session launcher
    pub fn new(launcher: Arc<dyn SessionLauncher>) -> Self {
        Self { launcher }
    }

    /// Create an extractor launching real Chromium sessions
    pub fn chromium(config: BrowserConfig) -> Self {
        Self::new(Arc::new(BrowserController::with_config(config)))
    }

    /// Validate `input` and extract its fields.
    ///
    /// Invalid input is rejected before any browser is launched.
    #[instrument(skip(self), fields(request_id = %uuid::Uuid::new_v4()))]
    pub async fn extract(
        &self,
        input: &str,
    ) -> std::result::Result<ExtractionResult, ExtractionError> {
        let request = ExtractionRequest::parse(input).map_err(|e| {
            debug!("Rejected input: {}", e);
            ExtractionError::InvalidInput
        })?;
        self.extract_request(&request).await
    }

    /// Extract fields for an already admitted request
    pub async fn extract_request(
        &self,
        request: &ExtractionRequest,
    ) -> std::result::Result<ExtractionResult, ExtractionError> {
        let start = Instant::now();
        info!("Extracting {}", request);

        let mut session = self.launcher.launch().await.map_err(|e| {
            warn!("Failed to acquire browser session: {}", e);
            ExtractionError::from(e)
        })?;

        let outcome = Self::run(session.as_mut(), request.as_str()).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        match outcome {
            Ok(fields) => {
                info!(
                    "Extracted {} in {}ms",
                    request,
                    start.elapsed().as_millis()
                );
                Ok(fields.into())
            }
            Err(e) => {
                let classified = ExtractionError::from(e);
                warn!(
                    "Extraction of {} failed as {} after {}ms",
                    request,
                    classified.kind(),
                    start.elapsed().as_millis()
                );
                Err(classified)
            }
        }
    }

    /// Drive the escalation until a terminal state
    async fn run(session: &mut dyn PageSession, url: &str) -> Result<PageFields> {
        let mut phase = NavigationPhase::Primary;
        loop {
            match Self::attempt(session, url, phase).await {
                Ok(fields) => {
                    debug!("{:?} attempt succeeded", phase);
                    return Ok(fields);
                }
                Err(err) => match phase.next_after(&err) {
                    Some(next) => {
                        warn!("{:?} attempt failed ({}), trying {:?}", phase, err, next);
                        phase = next;
                    }
                    None => {
                        debug!("{:?} attempt failed terminally: {}", phase, err);
                        return Err(err);
                    }
                },
            }
        }
    }

    /// One navigation plus field read
    async fn attempt(
        session: &mut dyn PageSession,
        url: &str,
        phase: NavigationPhase,
    ) -> Result<PageFields> {
        session.navigate(url, phase.wait_until()).await?;
        MetadataExtractor::extract(session).await
    }
}
