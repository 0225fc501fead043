//! Wisp HTML Parser
//!
//! html5ever tokenizes; Wisp nests the tokens into a markup tree and then
//! runs its own tree construction against a [`Document`].

mod builder;
mod markup;
mod tokenizer;

pub use builder::{build_document, build_fragment};
pub use markup::{Markup, MarkupElement, MarkupNode};
pub use tokenizer::{tokenize, MAX_NESTING_DEPTH};

use wisp_dom::{Document, NodeId, Provenance};

/// Parse an HTML string into a new document
pub fn parse(html: &str) -> Document {
    HtmlParser::new().parse(html)
}

/// Recoverable parse problem. Parsing never fails; these are diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Tokenizer error at line {line}: {message}")]
    Tokenizer { line: u64, message: String },

    #[error("Unclosed tag: {tag}")]
    UnclosedTag { tag: String },
}

/// Document plus the diagnostics collected while parsing it
#[derive(Debug)]
pub struct ParseResult {
    pub document: Document,
    pub errors: Vec<ParseError>,
}

/// HTML parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Document {
        self.parse_with_url(html, "about:blank").document
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> ParseResult {
        tracing::debug!("Parsing HTML document: {}", url);

        let markup = tokenize(html);
        let mut document = Document::new(url);
        build_document(&mut document, &markup.nodes);

        tracing::debug!(
            "Parsed {} nodes ({} recoverable errors)",
            document.tree().len(),
            markup.errors.len()
        );
        ParseResult {
            document,
            errors: markup.errors,
        }
    }

    /// Parse `html` as children of `parent` in an existing document
    pub fn parse_fragment(
        &self,
        document: &mut Document,
        parent: NodeId,
        html: &str,
        provenance: Provenance,
    ) {
        let markup = tokenize(html);
        build_fragment(document, parent, &markup.nodes, provenance);
    }
}
