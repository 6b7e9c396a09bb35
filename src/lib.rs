//! An interpreter for the munging language: named extractions over an HTML
//! document.
//!
//! ```text
//! title = h1 {text}
//! links = a.social {href} (0,)
//!
//! def viewport
//!   frame = #viewport
//!   canvas = #viewport > canvas
//!   return {frame, canvas}
//!
//! frame, canvas = do viewport
//! ```

pub mod ast;
pub mod document;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod parser;

use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    ast::Program,
    document::{Document, HtmlDocument},
    error::MungeResult,
    executor::Environment,
};

/// A compiled munging script, reusable across documents.
#[derive(Debug, Clone)]
pub struct Munger {
    program: Program,
}

impl Munger {
    pub fn new(source: &str) -> MungeResult<Self> {
        let program = parser::parse_source(source)?;
        Ok(Self { program })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn munge_document<'d, D>(&self, document: &'d D) -> MungeResult<Environment<D::Element<'d>>>
    where
        D: Document + ?Sized,
    {
        executor::run(&self.program, document)
    }

    /// Parses `html` and returns the results detached from the document,
    /// with nodes rendered as their outer HTML.
    pub fn munge(&self, html: &str) -> MungeResult<BTreeMap<String, serde_json::Value>> {
        let document = HtmlDocument::parse(html);
        let results = self.munge_document(&document)?;
        debug!(bindings = results.len(), "munged document");

        let mut detached = BTreeMap::new();
        for (identifier, value) in results {
            detached.insert(identifier, serde_json::to_value(&value)?);
        }
        Ok(detached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MungeError, ParseError};
    use serde_json::json;

    #[test]
    fn munges_the_viewport_example() -> MungeResult<()> {
        let munger = Munger::new(
            "

def function
  x = #viewport
  y = #viewport > canvas
  return {x, y}

div, canvas = do function
",
        )?;

        let results = munger.munge("<div id=viewport><canvas></canvas></div>")?;
        assert_eq!(
            results.get("div"),
            Some(&json!(r#"<div id="viewport"><canvas></canvas></div>"#))
        );
        assert_eq!(results.get("canvas"), Some(&json!("<canvas></canvas>")));
        assert_eq!(results.len(), 2);
        Ok(())
    }

    #[test]
    fn one_munger_serves_many_documents() -> MungeResult<()> {
        let munger = Munger::new("heading = h1 {text}\nitems = li {text} (0,)")?;

        let first = munger.munge("<h1>First</h1><ul><li>a</li><li>b</li></ul>")?;
        let second = munger.munge("<p>no heading</p>")?;

        assert_eq!(first.get("heading"), Some(&json!("First")));
        assert_eq!(first.get("items"), Some(&json!(["a", "b"])));
        assert_eq!(second.get("heading"), Some(&json!(null)));
        assert_eq!(second.get("items"), Some(&json!([])));
        Ok(())
    }

    #[test]
    fn syntax_errors_surface_at_construction() {
        match Munger::new("x = div (0") {
            Err(MungeError::Parse(ParseError::UnexpectedToken { expected, .. })) => {
                assert_eq!(expected, "DELIMITER or RPAREN")
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }
}
