//! Metadata extraction module
//!
//! URL admission, the per-request session manager with its primary/fallback
//! navigation, and field extraction from the rendered page.

pub mod manager;
pub mod metadata;
pub mod validator;

pub use manager::{ExtractionResult, Extractor, NavigationPhase};
pub use metadata::{MetadataExtractor, PageFields};
pub use validator::{validate, ExtractionRequest};
