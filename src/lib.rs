//! PageLens Web - on-demand page metadata extraction over HTTP
//!
//! Renders arbitrary web pages in headless Chromium and reports their title,
//! meta description and first heading. Next to that sits a small keyword
//! search over a fixed FAQ set.
//!
//! # Architecture
//!
//! ```text
//! HTTP client ──▶ axum router ──▶ Extractor ──▶ SessionLauncher (CDP)
//!                     │               │                │
//!                     ▼               ▼                ▼
//!               SearchIndex     NavigationPhase    PageSession
//!                               Primary/Fallback   (one per request)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pagelens_web::{BrowserConfig, Extractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = Extractor::chromium(BrowserConfig::default());
//!
//!     let result = extractor.extract("https://example.com").await?;
//!     println!("{} / {} / {}", result.title, result.meta_description, result.h1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod browser;
pub mod cors;
pub mod error;
pub mod extraction;
pub mod handlers;
pub mod search;

// Re-exports for convenience
pub use browser::{BrowserConfig, BrowserController, PageSession, SessionLauncher, WaitUntil};
pub use error::{Error, ExtractionError, Result};
pub use extraction::{ExtractionResult, Extractor, MetadataExtractor, PageFields};
pub use handlers::{app_router, AppState};
pub use search::{SearchIndex, SearchOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
