//! Tokenizer front end
//!
//! Drives html5ever's tokenizer and nests its tokens into a markup tree.
//! Nesting is naive: void elements close themselves and an end
//! tag closes the nearest open element of the same name. Past
//! [`MAX_NESTING_DEPTH`] open elements, new elements are attached as empty
//! siblings so that neither construction nor drop recurses without bound.
//! Everything else is left to tree construction.

use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::markup::{Markup, MarkupElement, MarkupNode};
use crate::ParseError;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Deepest element nesting the markup tree will hold
pub const MAX_NESTING_DEPTH: usize = 512;

/// Tokenize `html` into a markup tree
pub fn tokenize(html: &str) -> Markup {
    let tokenizer = Tokenizer::new(Nester::default(), TokenizerOpts::default());
    let input = BufferQueue::default();
    input.push_back(StrTendril::from(html));
    // The sink never asks to pause for scripts
    let _ = tokenizer.feed(&input);
    tokenizer.end();

    let state = tokenizer.sink.state.take();
    tracing::trace!(
        "Tokenized {} top-level nodes, {} errors",
        state.roots.len(),
        state.errors.len()
    );
    Markup {
        nodes: state.roots,
        errors: state.errors,
    }
}

#[derive(Default)]
struct Nester {
    state: RefCell<NestState>,
}

#[derive(Default)]
struct NestState {
    roots: Vec<MarkupNode>,
    open: Vec<MarkupElement>,
    errors: Vec<ParseError>,
}

impl NestState {
    fn siblings(&mut self) -> &mut Vec<MarkupNode> {
        match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        }
    }

    fn push_text(&mut self, text: &str) {
        let siblings = self.siblings();
        match siblings.last_mut() {
            Some(MarkupNode::Text(prev)) => prev.push_str(text),
            _ => siblings.push(MarkupNode::text(text)),
        }
    }

    fn close_top(&mut self) {
        if let Some(elem) = self.open.pop() {
            self.siblings().push(MarkupNode::Element(elem));
        }
    }

    fn close(&mut self, name: &str) -> bool {
        let Some(pos) = self.open.iter().rposition(|e| e.name() == name) else {
            return false;
        };
        while self.open.len() > pos {
            self.close_top();
        }
        true
    }

    fn finish(&mut self) {
        for elem in &self.open {
            self.errors.push(ParseError::UnclosedTag {
                tag: elem.name().to_string(),
            });
        }
        while !self.open.is_empty() {
            self.close_top();
        }
    }

    fn tag(&mut self, tag: Tag) -> TokenSinkResult<()> {
        let name = tag.name.to_string();
        match tag.kind {
            TagKind::StartTag => {
                let mut elem = MarkupElement::new(&name);
                elem.attrs = tag
                    .attrs
                    .iter()
                    .map(|a| (a.name.local.to_string(), a.value.to_string()))
                    .collect();

                let raw = match name.as_str() {
                    "script" => Some(RawKind::ScriptData),
                    "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
                    "title" | "textarea" => Some(RawKind::Rcdata),
                    _ => None,
                };
                if VOID_ELEMENTS.contains(&name.as_str()) {
                    self.siblings().push(MarkupNode::Element(elem));
                    return TokenSinkResult::Continue;
                }
                // Raw-text elements still open: their content holds no tags
                if self.open.len() >= MAX_NESTING_DEPTH && raw.is_none() {
                    tracing::trace!("Nesting limit reached, flattening <{}>", name);
                    self.siblings().push(MarkupNode::Element(elem));
                    return TokenSinkResult::Continue;
                }
                self.open.push(elem);
                match raw {
                    Some(kind) => TokenSinkResult::RawData(kind),
                    None => TokenSinkResult::Continue,
                }
            }
            TagKind::EndTag => {
                if !self.close(&name) {
                    tracing::trace!("Ignoring unmatched end tag </{}>", name);
                }
                TokenSinkResult::Continue
            }
        }
    }
}

impl TokenSink for Nester {
    type Handle = ();

    fn process_token(&self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        let mut state = self.state.borrow_mut();
        match token {
            Token::TagToken(tag) => return state.tag(tag),
            Token::CharacterTokens(text) => state.push_text(&text),
            Token::CommentToken(text) => state.siblings().push(MarkupNode::comment(&text)),
            Token::DoctypeToken(doctype) => {
                let name = doctype.name.map(|n| n.to_string()).unwrap_or_default();
                state.siblings().push(MarkupNode::Doctype(name));
            }
            Token::NullCharacterToken => {}
            Token::ParseError(message) => state.errors.push(ParseError::Tokenizer {
                line: line_number,
                message: message.into_owned(),
            }),
            Token::EOFToken => state.finish(),
        }
        TokenSinkResult::Continue
    }
}
