//! Scripted browser sessions for tests that must not start Chromium.
//!
//! Behavior is keyed on the URL host:
//!
//! | host           | primary (networkidle) | fallback (domcontentloaded) |
//! |----------------|-----------------------|-----------------------------|
//! | `ok.test`      | loads [`FULL_PAGE`]   | -                           |
//! | `bare.test`    | loads an empty body   | -                           |
//! | `spa.test`     | loads [`TEMPLATE_PAGE`] | -                         |
//! | `slow.test`    | times out             | -                           |
//! | `flaky.test`   | network error         | loads [`OG_PAGE`]           |
//! | `down.test`    | network error         | network error               |
//! | `stall.test`   | network error         | times out                   |
//! | anything else  | network error         | network error               |

#![allow(dead_code)]

use async_trait::async_trait;
use pagelens_web::browser::{PageSession, SessionLauncher, WaitUntil};
use pagelens_web::error::{BrowserError, NavigationError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const FULL_PAGE: &str = r#"<!doctype html><html><head>
    <title>ignored, the engine title is used</title>
    <meta name="description" content="A page about things">
</head><body><h1> Things </h1><h1>More things</h1></body></html>"#;

pub const OG_PAGE: &str = r#"<html><head>
    <meta property="og:description" content="Shared description">
</head><body><main><h1>Recovered</h1></main></body></html>"#;

pub const TEMPLATE_PAGE: &str = r#"<html><head>
    <template><meta name="description" content="inert"></template>
    <meta property="og:description" content="Component shell">
</head><body>
    <template id="card"><h1>Inert</h1></template>
    <div id="app"><h1>Live</h1></div>
</body></html>"#;

#[derive(Debug, Default)]
pub struct SessionCounters {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub navigations: AtomicUsize,
}

impl SessionCounters {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn open(&self) -> usize {
        self.launched() - self.closed()
    }
}

#[derive(Debug, Default, Clone)]
pub struct ScriptedLauncher {
    pub counters: Arc<SessionCounters>,
    pub fail_launch: bool,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>> {
        if self.fail_launch {
            return Err(BrowserError::LaunchFailed("chrome not found".into()).into());
        }
        self.counters.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            counters: Arc::clone(&self.counters),
            loaded: None,
            title: String::new(),
            closed: false,
        }))
    }
}

struct ScriptedSession {
    counters: Arc<SessionCounters>,
    loaded: Option<&'static str>,
    title: String,
    closed: bool,
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn navigate(&mut self, url: &str, wait_until: WaitUntil) -> Result<()> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let refused = || NavigationError::NetworkError("net::ERR_CONNECTION_REFUSED".into());
        let page = match (host_of(url).as_str(), wait_until) {
            ("ok.test", _) => FULL_PAGE,
            ("bare.test", _) => "<html><body></body></html>",
            ("spa.test", _) => TEMPLATE_PAGE,
            ("slow.test", _) => return Err(NavigationError::Timeout(20_000).into()),
            ("flaky.test", WaitUntil::DomContentLoaded) => OG_PAGE,
            ("stall.test", WaitUntil::DomContentLoaded) => {
                return Err(NavigationError::Timeout(20_000).into())
            }
            _ => return Err(refused().into()),
        };
        self.loaded = Some(page);
        self.title = match host_of(url).as_str() {
            "bare.test" => String::new(),
            host => format!("Welcome to {host}"),
        };
        Ok(())
    }

    async fn title(&mut self) -> Result<String> {
        Ok(self.title.clone())
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.loaded.unwrap_or_default().to_string())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(BrowserError::AlreadyClosed.into());
        }
        self.closed = true;
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
