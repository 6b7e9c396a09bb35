//! The document the munging language queries.
//!
//! The interpreter only needs CSS selector lookups and a handful of accessors
//! on the matched elements, so both are expressed as traits. [`HtmlDocument`]
//! is the default implementation, backed by `scraper`.

use scraper::{ElementRef, Html, Selector};

use crate::error::DocumentError;

pub trait Node: Clone {
    fn attribute(&self, name: &str) -> Option<String>;
    fn text(&self) -> String;
    fn inner_html(&self) -> String;
    fn outer_html(&self) -> String;
}

pub trait Document {
    type Element<'a>: Node
    where
        Self: 'a;

    /// First element matching `selector`, if any.
    fn query<'a>(&'a self, selector: &str) -> Result<Option<Self::Element<'a>>, DocumentError>;

    /// Every element matching `selector`, in document order.
    fn query_all<'a>(&'a self, selector: &str) -> Result<Vec<Self::Element<'a>>, DocumentError>;
}

pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }
}

fn compile(selector: &str) -> Result<Selector, DocumentError> {
    Selector::parse(selector).map_err(|err| DocumentError::InvalidSelector {
        selector: selector.to_string(),
        reason: err.to_string(),
    })
}

impl Document for HtmlDocument {
    type Element<'a> = ElementRef<'a>;

    fn query<'a>(&'a self, selector: &str) -> Result<Option<ElementRef<'a>>, DocumentError> {
        let selector = compile(selector)?;
        Ok(self.html.select(&selector).next())
    }

    fn query_all<'a>(&'a self, selector: &str) -> Result<Vec<ElementRef<'a>>, DocumentError> {
        let selector = compile(selector)?;
        Ok(self.html.select(&selector).collect())
    }
}

impl<'a> Node for ElementRef<'a> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }

    fn text(&self) -> String {
        ElementRef::text(self).collect()
    }

    fn inner_html(&self) -> String {
        ElementRef::inner_html(self)
    }

    fn outer_html(&self) -> String {
        self.html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<ul><li class="a" data-id="1">One <b>bold</b></li><li class="a">Two</li></ul>"#;

    #[test]
    fn query_returns_first_match() -> Result<(), DocumentError> {
        let document = HtmlDocument::parse(PAGE);
        let node = match document.query("li.a")? {
            Some(node) => node,
            None => panic!("expected a match"),
        };
        assert_eq!(Node::attribute(&node, "data-id"), Some("1".to_string()));
        assert_eq!(Node::text(&node), "One bold");
        assert_eq!(Node::inner_html(&node), "One <b>bold</b>");
        assert_eq!(
            Node::outer_html(&node),
            r#"<li class="a" data-id="1">One <b>bold</b></li>"#
        );
        Ok(())
    }

    #[test]
    fn query_all_preserves_document_order() -> Result<(), DocumentError> {
        let document = HtmlDocument::parse(PAGE);
        let texts: Vec<String> = document
            .query_all("ul > li")?
            .iter()
            .map(Node::text)
            .collect();
        assert_eq!(texts, vec!["One bold".to_string(), "Two".to_string()]);
        assert!(document.query("table")?.is_none());
        Ok(())
    }

    #[test]
    fn invalid_selectors_are_reported() {
        let document = HtmlDocument::parse(PAGE);
        match document.query_all("li[") {
            Err(DocumentError::InvalidSelector { selector, .. }) => assert_eq!(selector, "li["),
            other => panic!("expected invalid selector, got {:?}", other.map(|n| n.len())),
        }
    }
}
