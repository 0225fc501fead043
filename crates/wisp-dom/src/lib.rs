//! Wisp DOM - Document Object Model
//!
//! Arena-backed DOM tree with W3C-style event dispatch.
//!
//! Nodes live in a per-document arena and refer to each other by [`NodeId`].
//! Parent and owner links are plain indices, so the only owning edge is the
//! parent -> children list held by the arena.

mod attributes;
mod document;
mod node;
mod operations;
mod style;
mod tree;

pub mod events;

pub use attributes::{Attr, NamedNodeMap};
pub use document::Document;
pub use events::{
    callback, ErrorSink, Event, EventCallback, EventPhase, HandlerError, HandlerResult,
    InlineHandlerCompiler, ListenerId,
};
pub use node::{ElementData, Node, NodeData, NodeKind, Provenance};
pub use operations::{DomError, DomResult};
pub use style::{parse_style_attribute, StyleDeclaration, StyleDeclarationSink};
pub use tree::DomTree;

use std::sync::atomic::{AtomicU64, Ordering};

/// Node identifier (index into the owning document's arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Arena slot of this node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a document. Every node records the document that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    pub(crate) fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::SeqCst))
    }
}
