//! Page field extraction
//!
//! Reads the three reported fields out of a rendered page: the engine's
//! document title, the meta description, and the first heading.

use crate::browser::PageSession;
use crate::error::Result;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// Fields extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFields {
    /// Document title
    pub title: String,
    /// Meta description, falling back to og:description
    pub meta_description: String,
    /// Trimmed text of the first `<h1>`
    pub h1: String,
}

fn description_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse(r#"meta[name="description"]"#).expect("static selector is valid")
    })
}

fn og_description_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse(r#"meta[property="og:description"]"#).expect("static selector is valid")
    })
}

fn h1_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("h1").expect("static selector is valid"))
}

/// Whether `element` sits inside `<template>` content.
///
/// The parser keeps template content as ordinary children, while the
/// browser holds it in an inert fragment that selectors never reach.
fn is_inert(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(|node| node.value().as_element())
        .any(|ancestor| ancestor.name() == "template")
}

/// First match of `selector` that is part of the rendered document
fn first_live<'a>(document: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    document.select(selector).find(|element| !is_inert(element))
}

/// Field extraction functionality
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Read the fields from the page currently loaded in `session`
    #[instrument(skip(session))]
    pub async fn extract(session: &mut dyn PageSession) -> Result<PageFields> {
        let title = session.title().await?;
        let html = session.content().await?;

        let fields = Self::from_document(title, &html);
        debug!(
            "Extracted fields: title={:?}, description={:?}, h1={:?}",
            fields.title, fields.meta_description, fields.h1
        );
        Ok(fields)
    }

    /// Build fields from the engine-reported title and the document HTML
    pub fn from_document(title: String, html: &str) -> PageFields {
        let document = Html::parse_document(html);
        PageFields {
            title,
            meta_description: Self::meta_description(&document),
            h1: Self::first_h1(&document),
        }
    }

    /// `content` of `meta[name=description]`, else of `meta[property=og:description]`.
    ///
    /// The og fallback applies only when the named element is absent; a
    /// present element without `content` yields an empty string.
    pub fn meta_description(document: &Html) -> String {
        first_live(document, description_selector())
            .or_else(|| first_live(document, og_description_selector()))
            .and_then(|meta| meta.value().attr("content"))
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Trimmed text content of the first `<h1>` in document order
    pub fn first_h1(document: &Html) -> String {
        first_live(document, h1_selector())
            .map(|h1: ElementRef<'_>| h1.text().collect::<String>().trim().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(html: &str) -> PageFields {
        MetadataExtractor::from_document("Title".to_string(), html)
    }

    #[test]
    fn test_all_fields_present() {
        let html = r#"<html><head>
            <meta name="description" content="Plain description">
            <meta property="og:description" content="OG description">
        </head><body><h1>  Welcome home </h1><h1>Second</h1></body></html>"#;

        assert_eq!(
            fields(html),
            PageFields {
                title: "Title".to_string(),
                meta_description: "Plain description".to_string(),
                h1: "Welcome home".to_string(),
            }
        );
    }

    #[test]
    fn test_og_description_fallback() {
        let html = r#"<head><meta property="og:description" content="From OG"></head>"#;
        assert_eq!(fields(html).meta_description, "From OG");
    }

    #[test]
    fn test_no_description_at_all() {
        let html = "<head><meta name=\"keywords\" content=\"a,b\"></head><body></body>";
        assert_eq!(fields(html).meta_description, "");
    }

    #[test]
    fn test_description_without_content_does_not_fall_back() {
        let html = r#"<head>
            <meta name="description">
            <meta property="og:description" content="From OG">
        </head>"#;
        assert_eq!(fields(html).meta_description, "");
    }

    #[test]
    fn test_h1_nested_text_is_concatenated() {
        let html = "<body><h1>\n  Hello <span>brave</span> world\n</h1></body>";
        assert_eq!(fields(html).h1, "Hello brave world");
    }

    #[test]
    fn test_missing_h1_is_empty() {
        let html = "<body><h2>Not it</h2></body>";
        assert_eq!(fields(html).h1, "");
    }

    #[test]
    fn test_template_content_is_skipped() {
        let html = "<head><template><meta name=description content=inert></template>\
            <meta property=og:description content='live og'></head>\
            <body><template><h1>Inert</h1></template><h1>Live</h1></body>";

        let extracted = fields(html);
        assert_eq!(extracted.h1, "Live");
        assert_eq!(extracted.meta_description, "live og");
    }

    #[test]
    fn test_nested_template_content_is_skipped() {
        let html = "<body><template><section><div><h1>Deep</h1></div></section></template>\
            <main><h1>Shown</h1></main></body>";
        assert_eq!(fields(html).h1, "Shown");
    }

    #[test]
    fn test_only_template_content_yields_empty() {
        let html = "<body><template><h1>Inert</h1>\
            <meta name=description content=inert></template></body>";
        assert_eq!(
            fields(html),
            PageFields {
                title: "Title".to_string(),
                ..PageFields::default()
            }
        );
    }

    #[test]
    fn test_empty_document() {
        let extracted = MetadataExtractor::from_document(String::new(), "");
        assert_eq!(extracted, PageFields::default());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&fields("<h1>x</h1>")).unwrap();
        assert!(json.contains("\"metaDescription\":\"\""));
        assert!(json.contains("\"h1\":\"x\""));
    }
}
