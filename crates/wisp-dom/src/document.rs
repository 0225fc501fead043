//! Document - High-level document API
//!
//! The document owns the arena. Everything a hosted script can do to the
//! tree goes through here.

use std::fmt;
use std::sync::Arc;

use crate::events::{ErrorSink, InlineHandlerCompiler};
use crate::node::{ElementData, NodeData, Provenance};
use crate::{DocumentId, DomError, DomResult, DomTree, NamedNodeMap, Node, NodeId, NodeKind};
use crate::StyleDeclaration;

/// HTML Document
pub struct Document {
    pub(crate) tree: DomTree,
    url: String,
    root: NodeId,
    pub(crate) error_sink: Option<ErrorSink>,
    pub(crate) inline_handlers: Option<Arc<dyn InlineHandlerCompiler>>,
}

impl Document {
    /// Create a document with the `html`/`head`/`body` skeleton
    pub fn new(url: &str) -> Self {
        let mut doc = Self::empty(url);
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        for id in [html, head, body] {
            doc.set_provenance(id, Provenance::Parser);
        }
        // Fresh nodes under a fresh root cannot violate hierarchy rules
        let _ = doc.tree.append_child(doc.root, html);
        let _ = doc.tree.append_child(html, head);
        let _ = doc.tree.append_child(html, body);
        doc
    }

    /// Create a document holding only the document node
    pub fn empty(url: &str) -> Self {
        let mut tree = DomTree::new(DocumentId::next());
        let root = tree.create(NodeData::Document, Provenance::Parser);
        Self {
            tree,
            url: url.to_string(),
            root,
            error_sink: None,
            inline_handlers: None,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.tree.owner()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The document node itself
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.tree.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.tree.get(id)?.as_element()
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.tree.get_mut(id)?.as_element_mut()
    }

    /// Install the sink that receives isolated handler failures
    pub fn set_error_sink(&mut self, sink: Option<ErrorSink>) {
        self.error_sink = sink;
    }

    /// Install the compiler used for `on<type>` handler attributes
    pub fn set_inline_handler_compiler(&mut self, compiler: Option<Arc<dyn InlineHandlerCompiler>>) {
        self.inline_handlers = compiler;
    }

    // ------------------------------------------------------------------
    // Well-known elements
    // ------------------------------------------------------------------

    /// The `<html>` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.tree
            .children(self.root)
            .iter()
            .copied()
            .find(|&c| self.tree.get(c).is_some_and(Node::is_element))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.child_element(self.document_element()?, "head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.child_element(self.document_element()?, "body")
    }

    /// Return the body, creating `html` and `body` if they are missing
    pub fn ensure_body(&mut self) -> NodeId {
        if let Some(body) = self.body() {
            return body;
        }
        // Fresh elements under the document node or its element child cannot
        // violate hierarchy rules
        let html = match self.document_element() {
            Some(html) => html,
            None => {
                let html = self.create_element_with_provenance("html", Provenance::Parser);
                let _ = self.tree.append_child(self.root, html);
                html
            }
        };
        let body = self.create_element_with_provenance("body", Provenance::Parser);
        let _ = self.tree.append_child(html, body);
        body
    }

    fn child_element(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.tree
            .children(parent)
            .iter()
            .copied()
            .find(|&c| self.element(c).is_some_and(|e| e.is(tag)))
    }

    /// Text of the first `<title>` in the document
    pub fn title(&self) -> String {
        self.get_elements_by_tag_name(self.root, "title")
            .first()
            .map(|&t| self.text_content(t).trim().to_string())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Factories
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create_element_with_provenance(tag, Provenance::Script)
    }

    pub fn create_element_with_provenance(&mut self, tag: &str, provenance: Provenance) -> NodeId {
        self.tree
            .create(NodeData::Element(ElementData::new(tag)), provenance)
    }

    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        self.create_text_node_with_provenance(text, Provenance::Script)
    }

    pub fn create_text_node_with_provenance(&mut self, text: &str, provenance: Provenance) -> NodeId {
        self.tree.create(NodeData::Text(text.to_string()), provenance)
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.tree
            .create(NodeData::Comment(text.to_string()), Provenance::Script)
    }

    /// Place a doctype as the first child of the document. Returns the
    /// existing one if the document already has a doctype.
    pub fn insert_doctype(&mut self, name: &str) -> NodeId {
        if let Some(existing) = self.doctype() {
            return existing;
        }
        let doctype = self.tree.create(
            NodeData::Doctype {
                name: name.to_string(),
                public_id: String::new(),
                system_id: String::new(),
            },
            Provenance::Parser,
        );
        let first = self.tree.first_child(self.root);
        let _ = self.tree.insert_before(self.root, doctype, first);
        doctype
    }

    pub fn doctype(&self) -> Option<NodeId> {
        self.tree
            .children(self.root)
            .iter()
            .copied()
            .find(|&c| self.tree.get(c).is_some_and(|n| n.kind() == NodeKind::Doctype))
    }

    // ------------------------------------------------------------------
    // Node metadata
    // ------------------------------------------------------------------

    pub fn owner_document(&self, node: NodeId) -> Option<DocumentId> {
        self.tree.get(node).map(Node::owner_document)
    }

    pub fn provenance(&self, node: NodeId) -> Option<Provenance> {
        self.tree.get(node).map(Node::provenance)
    }

    pub fn set_provenance(&mut self, node: NodeId, provenance: Provenance) {
        if let Some(n) = self.tree.get_mut(node) {
            n.provenance = provenance;
        }
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.tree.get(node).map(Node::kind)
    }

    /// Uppercase `tagName`
    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.element(node).map(ElementData::tag_name)
    }

    pub fn local_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(ElementData::local_name)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.tree.append_child(parent, child)
    }

    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.tree.insert_before(parent, child, reference)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.tree.remove_child(parent, child)
    }

    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        self.tree.replace_child(parent, new_child, old_child)
    }

    /// `ChildNode.remove()`: detach from whatever parent the node has
    pub fn remove(&mut self, node: NodeId) -> DomResult<()> {
        if self.tree.get(node).is_none() {
            return Err(DomError::NotFound);
        }
        self.tree.detach(node);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries (computed on every call)
    // ------------------------------------------------------------------

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.parent(node)
    }

    /// Parent, grandparent, ... up to the root
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.ancestors(node).collect()
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.tree.children(node)
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.tree.first_child(node)
    }

    pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.tree.last_child(node)
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.tree.next_sibling(node)
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.tree.previous_sibling(node)
    }

    /// Descendant elements of `root` with the given tag (`*` for all)
    pub fn get_elements_by_tag_name(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.tree
            .descendants(root)
            .into_iter()
            .filter(|&id| {
                self.element(id)
                    .is_some_and(|e| tag == "*" || e.is(tag))
            })
            .collect()
    }

    /// First connected element with the given id
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(self.root)
            .into_iter()
            .find(|&n| self.element(n).and_then(ElementData::id) == Some(id))
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attributes(&self, node: NodeId) -> Option<&NamedNodeMap> {
        self.element(node).map(ElementData::attributes)
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.get_attribute(name)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.element(node).is_some_and(|e| e.has_attribute(name))
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        let elem = self.element_mut(node).ok_or(DomError::NotFound)?;
        elem.set_attribute(name, value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<bool> {
        let elem = self.element_mut(node).ok_or(DomError::NotFound)?;
        Ok(elem.remove_attribute(name))
    }

    /// Inline style of an element
    pub fn style(&self, node: NodeId) -> Option<&StyleDeclaration> {
        self.element(node).map(ElementData::style)
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// `textContent`. Script-bearing elements report their inline content.
    pub fn text_content(&self, node: NodeId) -> String {
        let Some(n) = self.tree.get(node) else {
            return String::new();
        };
        match &n.data {
            NodeData::Text(t) | NodeData::Comment(t) => t.clone(),
            NodeData::Element(e) if e.inline_content().is_some() => {
                e.inline_content().unwrap_or_default().to_string()
            }
            NodeData::Element(_) => self
                .tree
                .descendants(node)
                .into_iter()
                .filter_map(|d| self.tree.get(d).and_then(Node::as_text))
                .collect(),
            NodeData::Document | NodeData::Doctype { .. } => String::new(),
        }
    }

    /// Replace the content of a node with `text`
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> DomResult<()> {
        let n = self.tree.get_mut(node).ok_or(DomError::NotFound)?;
        match &mut n.data {
            NodeData::Text(t) | NodeData::Comment(t) => {
                *t = text.to_string();
                return Ok(());
            }
            NodeData::Element(e) if e.is_script_bearing() => {
                e.set_inline_content(text.to_string());
                return Ok(());
            }
            NodeData::Element(_) => {}
            NodeData::Document | NodeData::Doctype { .. } => return Ok(()),
        }
        for child in self.tree.children(node).to_vec() {
            self.tree.detach(child);
        }
        if !text.is_empty() {
            let text_node = self.create_text_node(text);
            self.tree.append_child(node, text_node)?;
        }
        Ok(())
    }

    /// Store the source of a script-bearing element
    pub fn set_inline_content(&mut self, node: NodeId, content: &str) -> DomResult<()> {
        let elem = self.element_mut(node).ok_or(DomError::NotFound)?;
        elem.set_inline_content(content.to_string());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------------

    /// `HTMLTableElement.insertRow()`: append a `tr` to the table's last
    /// `tbody`, creating the section if the table has none.
    pub fn insert_row(&mut self, table: NodeId) -> DomResult<NodeId> {
        if !self.element(table).is_some_and(|e| e.is("table")) {
            return Err(DomError::HierarchyRequest);
        }
        let provenance = self.provenance(table).unwrap_or_default();
        let tbody = match self
            .tree
            .children(table)
            .iter()
            .rev()
            .copied()
            .find(|&c| self.element(c).is_some_and(|e| e.is("tbody")))
        {
            Some(tbody) => tbody,
            None => {
                let tbody = self.create_element_with_provenance("tbody", provenance);
                self.tree.append_child(table, tbody)?;
                tbody
            }
        };
        let row = self.create_element_with_provenance("tr", provenance);
        self.tree.append_child(tbody, row)?;
        Ok(row)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id())
            .field("url", &self.url)
            .field("nodes", &self.tree.len())
            .finish()
    }
}
