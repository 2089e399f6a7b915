//! Document-tree capability: the only view of a roster page that the
//! extractor needs.
//!
//! Extraction never touches a concrete DOM. It asks a [`DocumentTree`] to
//! evaluate one selector at a time and receives plain [`LinkNode`]s back,
//! which keeps the selector fallback chain testable with tiny fixture trees.
//! [`HtmlDocument`] is the production implementation over `scraper`.

use crate::error::RosterQrError;
use scraper::{Html, Selector};

/// Text content and link target of one matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNode {
    /// Concatenated text content (untrimmed).
    pub text: String,
    /// Raw `href` attribute, if present.
    pub href: Option<String>,
}

impl LinkNode {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: Some(href.into()),
        }
    }
}

/// A read-only snapshot of a rendered document.
pub trait DocumentTree {
    /// The document title, if it has one.
    fn title(&self) -> Option<String>;

    /// All elements matching `pattern`, in document order.
    fn select(&self, pattern: &str) -> Result<Vec<LinkNode>, RosterQrError>;
}

/// An HTML page parsed with `scraper` (html5ever).
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parse a full HTML document. Parsing never fails; malformed markup is
    /// repaired the way browsers do.
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }
}

/// Compile a selector, mapping syntax errors to [`RosterQrError::InvalidSelector`].
pub fn compile_selector(pattern: &str) -> Result<Selector, RosterQrError> {
    Selector::parse(pattern).map_err(|e| RosterQrError::InvalidSelector {
        selector: pattern.to_string(),
        detail: e.to_string(),
    })
}

impl DocumentTree for HtmlDocument {
    fn title(&self) -> Option<String> {
        let selector = compile_selector("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    fn select(&self, pattern: &str) -> Result<Vec<LinkNode>, RosterQrError> {
        let selector = compile_selector(pattern)?;
        Ok(self
            .html
            .select(&selector)
            .map(|el| LinkNode {
                text: el.text().collect(),
                href: el.value().attr("href").map(str::to_string),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html><head><title> Chem 200 - People </title></head>
<body>
  <div class="user_name"><a href="/courses/7/users/11"> Grace <b>Hopper</b> </a></div>
  <div class="user_name"><a>no link</a></div>
</body></html>"#;

    #[test]
    fn title_is_trimmed() {
        let doc = HtmlDocument::parse(PAGE);
        assert_eq!(doc.title().as_deref(), Some("Chem 200 - People"));
    }

    #[test]
    fn missing_title_is_none() {
        let doc = HtmlDocument::parse("<html><body></body></html>");
        assert_eq!(doc.title(), None);
    }

    #[test]
    fn select_collects_nested_text_and_href() {
        let doc = HtmlDocument::parse(PAGE);
        let nodes = doc.select(".user_name a").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].text, " Grace Hopper ");
        assert_eq!(nodes[0].href.as_deref(), Some("/courses/7/users/11"));
        assert_eq!(nodes[1].href, None);
    }

    #[test]
    fn invalid_selector_is_reported() {
        let doc = HtmlDocument::parse(PAGE);
        let err = doc.select("a[[").unwrap_err();
        assert!(matches!(err, RosterQrError::InvalidSelector { .. }), "got {err:?}");
    }
}
