//! Markup tree
//!
//! Nested tokens as produced by the tokenizer, before any structural
//! correction. Tree construction consumes this, never raw text.

use crate::ParseError;

/// One node of the markup tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
    Comment(String),
    Doctype(String),
}

impl MarkupNode {
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    pub fn comment(value: &str) -> Self {
        Self::Comment(value.to_string())
    }

    pub fn as_element(&self) -> Option<&MarkupElement> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MarkupElement> for MarkupNode {
    fn from(elem: MarkupElement) -> Self {
        Self::Element(elem)
    }
}

/// Element with its attributes in source order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkupElement {
    name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Lowercase tag name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: impl Into<MarkupNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Literal value of the first child, if it is text
    pub fn first_text(&self) -> Option<&str> {
        match self.children.first() {
            Some(MarkupNode::Text(t)) => Some(t),
            _ => None,
        }
    }
}

/// Output of [`tokenize`](crate::tokenize)
#[derive(Debug, Default)]
pub struct Markup {
    pub nodes: Vec<MarkupNode>,
    /// Recoverable problems; construction proceeds regardless
    pub errors: Vec<ParseError>,
}
