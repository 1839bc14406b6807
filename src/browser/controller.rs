//! Browser launch configuration
//!
//! This module turns a [`BrowserConfig`] into a freshly launched Chromium
//! process per extraction.

use crate::browser::navigation::{NavigationOptions, DEFAULT_IDLE_MS, DEFAULT_TIMEOUT_MS};
use crate::browser::session::{ChromeSession, PageSession, SessionLauncher};
use crate::error::{BrowserError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Desktop Chrome user agent sent by default
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Configuration for browser launch
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode (default: true)
    pub headless: bool,
    /// Browser window width (default: 1920)
    pub width: u32,
    /// Browser window height (default: 1080)
    pub height: u32,
    /// Enable sandbox (default: false, containers rarely allow it)
    pub sandbox: bool,
    /// User agent string
    pub user_agent: String,
    /// Per-operation timeout in milliseconds (default: 20000)
    pub timeout_ms: u64,
    /// Quiet period counted as network idle in milliseconds (default: 500)
    pub idle_ms: u64,
    /// Path to Chrome/Chromium executable (None = auto-detect)
    pub chrome_path: Option<String>,
    /// Additional Chrome arguments
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            width: 1920,
            height: 1080,
            sandbox: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            idle_ms: DEFAULT_IDLE_MS,
            chrome_path: None,
            extra_args: Vec::new(),
        }
    }
}

impl BrowserConfig {
    /// Create a new config builder
    pub fn builder() -> BrowserConfigBuilder {
        BrowserConfigBuilder::default()
    }

    /// Navigation options derived from this config
    pub fn navigation_options(&self) -> NavigationOptions {
        NavigationOptions {
            timeout_ms: self.timeout_ms,
            idle_ms: self.idle_ms,
            ..NavigationOptions::default()
        }
    }

    /// Command-line flags passed to Chromium on top of chromiumoxide's defaults
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.sandbox {
            args.push("--no-sandbox".to_string());
            args.push("--disable-setuid-sandbox".to_string());
        }
        args.push(format!("--user-agent={}", self.user_agent));
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Builder for BrowserConfig
#[derive(Default)]
pub struct BrowserConfigBuilder {
    config: BrowserConfig,
}

impl BrowserConfigBuilder {
    /// Set headless mode
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Set viewport dimensions
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    /// Enable/disable sandbox
    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.config.sandbox = sandbox;
        self
    }

    /// Set user agent
    pub fn user_agent<S: Into<String>>(mut self, ua: S) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Set per-operation timeout
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set the network idle quiet period
    pub fn idle_ms(mut self, ms: u64) -> Self {
        self.config.idle_ms = ms;
        self
    }

    /// Set Chrome path
    pub fn chrome_path<S: Into<String>>(mut self, path: S) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    /// Add extra Chrome argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.config.extra_args.push(arg.into());
        self
    }

    /// Build the config
    pub fn build(self) -> BrowserConfig {
        self.config
    }
}

/// Launches one Chromium process per session
#[derive(Debug, Clone, Default)]
pub struct BrowserController {
    config: BrowserConfig,
}

impl BrowserController {
    /// Create a controller with custom config
    pub fn with_config(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Get the browser configuration
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    fn cdp_config(&self, user_data_dir: &Path) -> Result<CdpBrowserConfig> {
        let config = &self.config;
        let mut builder = CdpBrowserConfig::builder()
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: config.width,
                height: config.height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(Duration::from_millis(config.timeout_ms))
            .user_data_dir(user_data_dir);

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(ref path) = config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        for arg in config.launch_args() {
            builder = builder.arg(arg);
        }

        builder
            .build()
            .map_err(|e| BrowserError::ConfigError(e).into())
    }

    /// Launch a browser and open one page in a fresh browser context
    #[instrument(skip(self))]
    pub async fn launch_session(&self) -> Result<ChromeSession> {
        info!(
            "Launching browser: headless={}, timeout_ms={}",
            self.config.headless, self.config.timeout_ms
        );

        // A private profile per process keeps concurrent launches apart.
        let user_data_dir =
            std::env::temp_dir().join(format!("pagelens-{}", uuid::Uuid::new_v4()));
        let cdp_config = self.cdp_config(&user_data_dir)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler event error: {}", e);
                }
            }
            debug!("Browser handler finished");
        });

        let mut session = ChromeSession::new(
            browser,
            handler_task,
            user_data_dir,
            self.config.navigation_options(),
        );

        if let Err(e) = session.open_page().await {
            if let Err(close_err) = session.close().await {
                debug!("Closing half-open session failed: {}", close_err);
            }
            return Err(e);
        }

        info!("Browser launched successfully");
        Ok(session)
    }
}

#[async_trait]
impl SessionLauncher for BrowserController {
    async fn launch(&self) -> Result<Box<dyn PageSession>> {
        let session = self.launch_session().await?;
        Ok(Box::new(session))
    }
}
