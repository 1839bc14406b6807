//! Browser automation module
//!
//! This module provides headless browser control through ChromiumOxide:
//! per-request launch, isolated sessions, and bounded navigation.

pub mod controller;
pub mod navigation;
pub mod session;

pub use controller::{BrowserConfig, BrowserConfigBuilder, BrowserController, DEFAULT_USER_AGENT};
pub use navigation::{
    NavigationOptions, PageNavigator, WaitUntil, DEFAULT_IDLE_MS, DEFAULT_TIMEOUT_MS,
};
pub use session::{ChromeSession, PageSession, SessionLauncher};
