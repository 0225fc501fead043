//! DOM Node
//!
//! A node is a slot in the document arena. Structure (parent, children) is
//! managed by [`DomTree`](crate::DomTree); the payload lives in [`NodeData`].

use std::collections::HashMap;
use std::fmt;

use crate::events::{EventCallback, EventListeners};
use crate::{DocumentId, NamedNodeMap, NodeId, StyleDeclaration};

/// How a node entered the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provenance {
    /// Created by the document builder during a page parse
    Parser,
    /// Created through the scripting surface (factories, innerHTML)
    #[default]
    Script,
}

/// Node kind, with the DOM `nodeType` codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NodeKind {
    Element = 1,
    Text = 3,
    Comment = 8,
    Document = 9,
    Doctype = 10,
}

impl NodeKind {
    /// Numeric `nodeType`
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Whether nodes of this kind may hold children
    pub fn can_have_children(self) -> bool {
        matches!(self, Self::Element | Self::Document)
    }
}

/// DOM Node
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    owner: DocumentId,
    pub(crate) provenance: Provenance,
    pub(crate) listeners: EventListeners,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(owner: DocumentId, data: NodeData, provenance: Provenance) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            owner,
            provenance,
            listeners: EventListeners::default(),
            data,
        }
    }

    /// Node kind
    pub fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Document => NodeKind::Document,
            NodeData::Doctype { .. } => NodeKind::Doctype,
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
        }
    }

    /// Parent node, `None` when detached or for the document node
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in tree order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Document that created this node. Fixed for the node's lifetime.
    pub fn owner_document(&self) -> DocumentId {
        self.owner
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Number of explicitly attached listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("provenance", &self.provenance)
            .field("listeners", &self.listeners.len())
            .field("data", &self.data)
            .finish()
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    Document,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element(ElementData),
    Text(String),
    Comment(String),
}

/// Element-specific data
pub struct ElementData {
    local_name: String,
    attrs: NamedNodeMap,
    style: StyleDeclaration,
    /// Source text of script-bearing elements; they keep it here instead of
    /// in a child text node.
    inline_content: Option<String>,
    /// `onclick = fn` style handler properties, keyed by event type
    handlers: HashMap<String, EventCallback>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            local_name: tag.to_ascii_lowercase(),
            attrs: NamedNodeMap::new(),
            style: StyleDeclaration::default(),
            inline_content: None,
            handlers: HashMap::new(),
        }
    }

    /// Canonical (lowercase) tag name
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// HTML `tagName` (uppercase)
    pub fn tag_name(&self) -> String {
        self.local_name.to_ascii_uppercase()
    }

    /// Check the tag name, ignoring case
    pub fn is(&self, tag: &str) -> bool {
        self.local_name.eq_ignore_ascii_case(tag)
    }

    /// Whether the element stores its text as inline content
    pub fn is_script_bearing(&self) -> bool {
        self.local_name == "script"
    }

    pub fn attributes(&self) -> &NamedNodeMap {
        &self.attrs
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attrs.get_attribute(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attrs.has_attribute(name)
    }

    /// Set an attribute. Writing `style` re-parses the inline declaration.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attrs.set_attribute(name, value);
        if name.eq_ignore_ascii_case("style") {
            self.style = StyleDeclaration::parse(value);
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let removed = self.attrs.remove_named_item(name).is_some();
        if removed && name.eq_ignore_ascii_case("style") {
            self.style = StyleDeclaration::default();
        }
        removed
    }

    /// Element id attribute
    pub fn id(&self) -> Option<&str> {
        self.attrs.get_attribute("id")
    }

    /// Inline style parsed from the `style` attribute
    pub fn style(&self) -> &StyleDeclaration {
        &self.style
    }

    pub fn inline_content(&self) -> Option<&str> {
        self.inline_content.as_deref()
    }

    pub(crate) fn set_inline_content(&mut self, content: String) {
        self.inline_content = Some(content);
    }

    pub(crate) fn handler(&self, event_type: &str) -> Option<&EventCallback> {
        self.handlers.get(event_type)
    }

    pub(crate) fn set_handler(&mut self, event_type: &str, handler: Option<EventCallback>) {
        match handler {
            Some(h) => {
                self.handlers.insert(event_type.to_string(), h);
            }
            None => {
                self.handlers.remove(event_type);
            }
        }
    }
}

impl fmt::Debug for ElementData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementData")
            .field("local_name", &self.local_name)
            .field("attrs", &self.attrs)
            .field("inline_content", &self.inline_content)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
