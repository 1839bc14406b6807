//! Error types for PageLens Web
//!
//! Internal failures are described by [`Error`] and its component enums,
//! built with `thiserror`. Callers of the extraction pipeline only ever see
//! [`ExtractionError`], the three-way classification the HTTP boundary maps
//! to status codes.

use thiserror::Error;

/// The main error type for PageLens Web operations
#[derive(Error, Debug)]
pub enum Error {
    /// Browser-related errors
    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Navigation errors
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// Field extraction errors
    #[error("Field extraction error: {0}")]
    Field(#[from] FieldError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ChromiumOxide errors
    #[error("CDP error: {message}")]
    Cdp {
        /// Rendered engine error
        message: String,
        /// The engine gave up waiting for a response
        timed_out: bool,
    },

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

/// Browser lifecycle and control errors
#[derive(Error, Debug)]
pub enum BrowserError {
    /// Failed to launch browser
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    /// Browser configuration error
    #[error("Invalid browser configuration: {0}")]
    ConfigError(String),

    /// Browser connection lost
    #[error("Browser connection lost")]
    ConnectionLost,

    /// Failed to create the isolated browser context
    #[error("Failed to create browser context: {0}")]
    ContextCreationFailed(String),

    /// Failed to create new page/tab
    #[error("Failed to create page: {0}")]
    PageCreationFailed(String),

    /// Browser already closed
    #[error("Browser already closed")]
    AlreadyClosed,

    /// Timeout waiting for browser
    #[error("Browser operation timed out after {0}ms")]
    Timeout(u64),
}

/// Navigation errors
#[derive(Error, Debug)]
pub enum NavigationError {
    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Navigation timeout
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    /// Page load failed
    #[error("Page load failed: {0}")]
    LoadFailed(String),

    /// Network error reported by the engine (DNS, refused, TLS, aborted)
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Errors reading fields out of a loaded page
#[derive(Error, Debug)]
pub enum FieldError {
    /// JavaScript evaluation failed
    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    /// The engine returned a value of an unexpected shape
    #[error("Unexpected evaluation result: {0}")]
    UnexpectedValue(String),
}

/// Result type alias for PageLens Web operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a generic error from a string
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        Error::Generic(msg.into())
    }

    /// Create a CDP error from a string
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp {
            message: msg.into(),
            timed_out: false,
        }
    }

    /// Whether this failure means a time budget was exhausted.
    ///
    /// Decided from the variant alone, never from the message text.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Navigation(NavigationError::Timeout(_))
                | Error::Browser(BrowserError::Timeout(_))
                | Error::Cdp {
                    timed_out: true,
                    ..
                }
        )
    }
}

/// Convert chromiumoxide errors
impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        let timed_out = matches!(err, chromiumoxide::error::CdpError::Timeout);
        Error::Cdp {
            message: err.to_string(),
            timed_out,
        }
    }
}

/// Caller-facing outcome of a failed extraction.
///
/// The `Display` strings are the exact messages returned to HTTP clients.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionError {
    /// Missing or malformed URL, rejected before any browser work
    #[error("Invalid URL")]
    InvalidInput,

    /// A navigation attempt ran out of time
    #[error("Timeout")]
    Timeout,

    /// Any other failure once a browser session was involved
    #[error("Failed to scrape the page")]
    NavigationFailure,
}

impl ExtractionError {
    /// HTTP status code reported for this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            ExtractionError::InvalidInput => 400,
            ExtractionError::Timeout => 504,
            ExtractionError::NavigationFailure => 500,
        }
    }

    /// Short machine-readable label used in logs and counters
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionError::InvalidInput => "invalid_input",
            ExtractionError::Timeout => "timeout",
            ExtractionError::NavigationFailure => "navigation_failure",
        }
    }
}

impl From<Error> for ExtractionError {
    fn from(err: Error) -> Self {
        match err {
            Error::Navigation(NavigationError::InvalidUrl(_)) => ExtractionError::InvalidInput,
            ref e if e.is_timeout() => ExtractionError::Timeout,
            _ => ExtractionError::NavigationFailure,
        }
    }
}
