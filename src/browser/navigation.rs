//! Page navigation functionality
//!
//! This module handles a single bounded navigation under one of two wait
//! conditions. Retry policy lives in the extraction manager, not here.

use crate::error::{BrowserError, Error, NavigationError, Result};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::stream::{self, Stream, StreamExt};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Default per-operation timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

/// Default quiet period that counts as "network idle", in milliseconds
pub const DEFAULT_IDLE_MS: u64 = 500;

/// Condition to wait for after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Wait until DOMContentLoaded event fires
    DomContentLoaded,
    /// Wait until the load event fired and no request was in flight for the
    /// configured quiet period
    NetworkIdle,
}

impl WaitUntil {
    /// Name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        }
    }
}

/// Options for page navigation
#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Timeout in milliseconds covering navigation and the wait condition
    pub timeout_ms: u64,
    /// Wait until condition
    pub wait_until: WaitUntil,
    /// Quiet period for [`WaitUntil::NetworkIdle`] in milliseconds
    pub idle_ms: u64,
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            wait_until: WaitUntil::NetworkIdle,
            idle_ms: DEFAULT_IDLE_MS,
        }
    }
}

impl NavigationOptions {
    /// Same budget, different wait condition
    pub fn with_wait_until(mut self, wait_until: WaitUntil) -> Self {
        self.wait_until = wait_until;
        self
    }

    /// Timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Quiet period as a `Duration`
    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}

/// Page navigator
pub struct PageNavigator;

impl PageNavigator {
    /// Navigate `page` to `url` and wait for the configured condition.
    ///
    /// The whole operation shares one time budget; running out of it yields
    /// [`NavigationError::Timeout`].
    #[instrument(skip(page, opts), fields(wait_until = opts.wait_until.as_str()))]
    pub async fn goto(page: &Page, url: &str, opts: &NavigationOptions) -> Result<()> {
        let start = Instant::now();

        tokio::time::timeout(opts.timeout(), Self::navigate_once(page, url, opts))
            .await
            .map_err(|_| NavigationError::Timeout(opts.timeout_ms))??;

        debug!(
            "Navigation to {} settled in {}ms",
            url,
            start.elapsed().as_millis()
        );
        Ok(())
    }

    /// Perform a single navigation attempt
    async fn navigate_once(page: &Page, url: &str, opts: &NavigationOptions) -> Result<()> {
        // Listeners go in before the navigation so no request is missed.
        let tracker = match opts.wait_until {
            WaitUntil::NetworkIdle => Some(NetworkTracker::attach(page).await?),
            WaitUntil::DomContentLoaded => None,
        };

        let response = page.execute(NavigateParams::new(url)).await?;
        if let Some(error_text) = response.result.error_text.clone() {
            return Err(NavigationError::NetworkError(error_text).into());
        }

        Self::wait_for_ready(page, opts.wait_until).await?;

        if let Some(tracker) = tracker {
            tracker.wait_for_idle(opts.idle()).await?;
        }

        Ok(())
    }

    /// Wait for the document lifecycle step matching `wait_until`
    async fn wait_for_ready(page: &Page, wait_until: WaitUntil) -> Result<()> {
        let script = match wait_until {
            WaitUntil::DomContentLoaded => {
                r#"
                    new Promise(resolve => {
                        if (document.readyState !== 'loading') {
                            resolve(true);
                        } else {
                            document.addEventListener('DOMContentLoaded', () => resolve(true));
                        }
                    })
                "#
            }
            WaitUntil::NetworkIdle => {
                r#"
                    new Promise(resolve => {
                        if (document.readyState === 'complete') {
                            resolve(true);
                        } else {
                            window.addEventListener('load', () => resolve(true));
                        }
                    })
                "#
            }
        };

        page.evaluate(script)
            .await
            .map_err(|e| NavigationError::LoadFailed(e.to_string()))?;

        Ok(())
    }
}

/// One request lifecycle event, keyed by CDP request id
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NetworkEvent {
    /// `Network.requestWillBeSent`
    Started(String),
    /// `Network.loadingFinished`
    Finished(String),
    /// `Network.loadingFailed`
    Failed(String),
}

/// Requests currently in flight
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    requests: HashSet<String>,
}

impl InFlight {
    /// Update the set with one event. Completions of unknown ids are ignored.
    pub(crate) fn apply(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::Started(id) => {
                self.requests.insert(id);
            }
            NetworkEvent::Finished(id) | NetworkEvent::Failed(id) => {
                self.requests.remove(&id);
            }
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Resolve once nothing has been in flight for `quiet`.
///
/// Every event restarts the quiet period. The event stream ending means the
/// page went away and yields [`BrowserError::ConnectionLost`].
pub(crate) async fn wait_for_quiet<S>(mut events: S, quiet: Duration) -> Result<()>
where
    S: Stream<Item = NetworkEvent> + Unpin,
{
    let mut in_flight = InFlight::default();

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => in_flight.apply(event),
                None => return Err(Error::from(BrowserError::ConnectionLost)),
            },
            _ = tokio::time::sleep(quiet), if in_flight.is_idle() => {
                return Ok(());
            }
        }
    }
}

/// CDP network event listeners attached to one page
struct NetworkTracker {
    started: EventStream<EventRequestWillBeSent>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
}

impl NetworkTracker {
    async fn attach(page: &Page) -> Result<Self> {
        page.execute(EnableParams::default()).await?;

        Ok(Self {
            started: page.event_listener::<EventRequestWillBeSent>().await?,
            finished: page.event_listener::<EventLoadingFinished>().await?,
            failed: page.event_listener::<EventLoadingFailed>().await?,
        })
    }

    async fn wait_for_idle(self, quiet: Duration) -> Result<()> {
        let started = self
            .started
            .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
        let finished = self
            .finished
            .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));
        let failed = self
            .failed
            .map(|e| NetworkEvent::Failed(e.request_id.inner().clone()));

        wait_for_quiet(stream::select(started, stream::select(finished, failed)), quiet).await
    }
}
