//! Per-request browser sessions
//!
//! A session is one headless browser process, one isolated browser context
//! and one page. [`SessionLauncher`] and [`PageSession`] are the seams the
//! extraction manager is written against; [`ChromeSession`] is the real
//! implementation on top of chromiumoxide.

use crate::browser::navigation::{NavigationOptions, PageNavigator, WaitUntil};
use crate::error::{BrowserError, FieldError, NavigationError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Page;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// How long to wait for the browser process and its handler to wind down
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// One page inside one isolated browser, owned by a single request.
#[async_trait]
pub trait PageSession: Send {
    /// Navigate to `url` and wait for `wait_until`, within the page timeout
    async fn navigate(&mut self, url: &str, wait_until: WaitUntil) -> Result<()>;

    /// The document title as the engine reports it
    async fn title(&mut self) -> Result<String>;

    /// Serialized HTML of the current document
    async fn content(&mut self) -> Result<String>;

    /// Release every resource held by the session
    async fn close(&mut self) -> Result<()>;
}

/// Produces a fresh [`PageSession`] per extraction.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Launch a new isolated session
    async fn launch(&self) -> Result<Box<dyn PageSession>>;
}

/// Chromium-backed [`PageSession`]
pub struct ChromeSession {
    /// `None` only once handed to the drop-time cleanup task
    browser: Option<Browser>,
    handler: JoinHandle<()>,
    context_id: Option<BrowserContextId>,
    page: Option<Page>,
    user_data_dir: Option<PathBuf>,
    navigation: NavigationOptions,
    closed: bool,
}

impl ChromeSession {
    pub(crate) fn new(
        browser: Browser,
        handler: JoinHandle<()>,
        user_data_dir: PathBuf,
        navigation: NavigationOptions,
    ) -> Self {
        Self {
            browser: Some(browser),
            handler,
            context_id: None,
            page: None,
            user_data_dir: Some(user_data_dir),
            navigation,
            closed: false,
        }
    }

    fn browser(&self) -> Result<&Browser> {
        self.browser
            .as_ref()
            .ok_or_else(|| BrowserError::AlreadyClosed.into())
    }

    /// Create the isolated context and its single page
    pub(crate) async fn open_page(&mut self) -> Result<()> {
        let context = self
            .browser()?
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| BrowserError::ContextCreationFailed(e.to_string()))?;
        let context_id = context.result.browser_context_id.clone();
        self.context_id = Some(context_id.clone());

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(context_id);

        let page = self
            .browser()?
            .new_page(target)
            .await
            .map_err(|e| BrowserError::PageCreationFailed(e.to_string()))?;
        self.page = Some(page);

        debug!("Opened page in isolated browser context");
        Ok(())
    }

    fn page(&self) -> Result<&Page> {
        if self.closed {
            return Err(BrowserError::AlreadyClosed.into());
        }
        self.page
            .as_ref()
            .ok_or_else(|| BrowserError::PageCreationFailed("no page open".to_string()).into())
    }

    /// Evaluate `expression` under the page timeout and decode a string
    async fn evaluate_string(&self, expression: &str) -> Result<String> {
        let page = self.page()?;
        let timeout_ms = self.navigation.timeout_ms;

        let value = tokio::time::timeout(self.navigation.timeout(), page.evaluate(expression))
            .await
            .map_err(|_| NavigationError::Timeout(timeout_ms))?
            .map_err(|e| FieldError::EvaluationFailed(e.to_string()))?;

        value
            .into_value::<Option<String>>()
            .map(Option::unwrap_or_default)
            .map_err(|e| FieldError::UnexpectedValue(e.to_string()).into())
    }
}

/// Delete a browser profile directory, best effort
async fn remove_profile_dir(path: PathBuf) {
    if let Err(e) = tokio::fs::remove_dir_all(&path).await {
        debug!("Could not remove profile dir {}: {}", path.display(), e);
    }
}

/// Kill `browser` and wait for it to exit, then delete its profile.
///
/// The process must be gone before the directory is removed, or Chrome
/// recreates files in it.
async fn reap(browser: Option<Browser>, user_data_dir: Option<PathBuf>) {
    if let Some(mut browser) = browser {
        if let Some(Err(e)) = browser.kill().await {
            warn!("Killing browser process failed: {}", e);
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, browser.wait())
            .await
            .is_err()
        {
            warn!("Browser process did not exit in time");
        }
    }
    if let Some(path) = user_data_dir {
        remove_profile_dir(path).await;
    }
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn navigate(&mut self, url: &str, wait_until: WaitUntil) -> Result<()> {
        let opts = self.navigation.clone().with_wait_until(wait_until);
        PageNavigator::goto(self.page()?, url, &opts).await
    }

    async fn title(&mut self) -> Result<String> {
        self.evaluate_string("document.title").await
    }

    async fn content(&mut self) -> Result<String> {
        self.evaluate_string("document.documentElement ? document.documentElement.outerHTML : ''")
            .await
    }

    #[instrument(skip(self))]
    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Err(BrowserError::AlreadyClosed.into());
        }
        self.closed = true;
        info!("Closing browser session");

        self.page = None;
        let Some(mut browser) = self.browser.take() else {
            return Err(BrowserError::AlreadyClosed.into());
        };

        if let Some(context_id) = self.context_id.take() {
            if let Err(e) = browser
                .execute(DisposeBrowserContextParams::new(context_id))
                .await
            {
                debug!("Disposing browser context failed: {}", e);
            }
        }

        let closed = match tokio::time::timeout(SHUTDOWN_GRACE, browser.close()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(BrowserError::Timeout(SHUTDOWN_GRACE.as_millis() as u64).into()),
        };

        if closed.is_err() {
            warn!("Graceful browser close failed, killing process");
            if let Some(Err(e)) = browser.kill().await {
                warn!("Killing browser process failed: {}", e);
            }
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, browser.wait())
            .await
            .is_err()
        {
            warn!("Browser process did not exit in time");
        }
        drop(browser);

        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.handler)
            .await
            .is_err()
        {
            self.handler.abort();
        }

        if let Some(path) = self.user_data_dir.take() {
            remove_profile_dir(path).await;
        }
        info!("Browser session closed");
        closed
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        warn!("ChromeSession dropped without close, reaping browser in background");
        self.handler.abort();

        let browser = self.browser.take();
        let user_data_dir = self.user_data_dir.take();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(reap(browser, user_data_dir));
            }
            Err(_) => {
                // No runtime left: Browser's own Drop kills the child, the
                // profile directory is left behind.
                drop(browser);
                if let Some(path) = user_data_dir {
                    debug!("Leaving profile dir {} behind", path.display());
                }
            }
        }
    }
}
