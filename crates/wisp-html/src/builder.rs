//! Tree construction
//!
//! Turns a markup tree into live nodes, applying the structural corrections
//! browsers are expected to make: content outside `head`/`body` moves into
//! the body, table content is foster-parented, and scripts keep their source
//! as inline content instead of child nodes.

use wisp_dom::{Document, NodeId, Provenance};

use crate::markup::{MarkupElement, MarkupNode};

/// Tags that may legally sit directly inside a `table`
const TABLE_STRUCTURE: &[&str] = &["tbody", "tr", "caption", "thead", "tfoot", "colgroup", "col"];

/// Build a whole page into `doc`.
///
/// Top-level `html` elements are expanded into the document element; all
/// other top-level nodes are built as if they appeared inside it.
pub fn build_document(doc: &mut Document, nodes: &[MarkupNode]) {
    let body = doc.ensure_body();
    let html = doc.parent(body).unwrap_or_else(|| doc.root());

    let mut builder = TreeBuilder::new(doc, Provenance::Parser);
    for node in nodes {
        match node {
            MarkupNode::Element(elem) if elem.is("html") => {
                builder.copy_attributes(html, elem);
                builder.build_children(elem, html);
            }
            _ => builder.build(node, html, None),
        }
    }
}

/// Build `nodes` as children of `parent`, stamping every created node with
/// `provenance`
pub fn build_fragment(
    doc: &mut Document,
    parent: NodeId,
    nodes: &[MarkupNode],
    provenance: Provenance,
) {
    let mut builder = TreeBuilder::new(doc, provenance);
    for node in nodes {
        builder.build(node, parent, None);
    }
}

struct TreeBuilder<'a> {
    doc: &'a mut Document,
    provenance: Provenance,
}

impl<'a> TreeBuilder<'a> {
    fn new(doc: &'a mut Document, provenance: Provenance) -> Self {
        Self { doc, provenance }
    }

    fn is_html_root(&self, node: NodeId) -> bool {
        self.doc.document_element() == Some(node)
    }

    fn is_table(&self, node: NodeId) -> bool {
        self.doc.element(node).is_some_and(|e| e.is("table"))
    }

    fn build_children(&mut self, markup: &MarkupElement, parent: NodeId) {
        for child in &markup.children {
            self.build(child, parent, None);
        }
    }

    fn build(&mut self, node: &MarkupNode, parent: NodeId, before: Option<NodeId>) {
        match node {
            MarkupNode::Doctype(name) => {
                self.doc.insert_doctype(name);
            }
            MarkupNode::Comment(text) => {
                let comment = self.doc.create_comment(text);
                self.doc.set_provenance(comment, self.provenance);
                self.insert(parent, comment, before);
            }
            MarkupNode::Text(text) => {
                let (parent, before) = if self.is_html_root(parent) {
                    if text.trim().is_empty() {
                        return;
                    }
                    (self.doc.ensure_body(), None)
                } else {
                    (parent, before)
                };
                let node = self.doc.create_text_node_with_provenance(text, self.provenance);
                self.insert(parent, node, before);
            }
            MarkupNode::Element(elem) => self.build_element(elem, parent, before),
        }
    }

    fn build_element(&mut self, markup: &MarkupElement, parent: NodeId, before: Option<NodeId>) {
        let tag = markup.name();
        let (mut parent, mut before) = (parent, before);

        if self.is_html_root(parent) {
            let existing = match tag {
                "head" => self.doc.head(),
                "body" => self.doc.body(),
                _ => {
                    parent = self.doc.ensure_body();
                    before = None;
                    None
                }
            };
            if let Some(existing) = existing {
                self.copy_attributes(existing, markup);
                self.build_children(markup, existing);
                return;
            }
        }

        if self.is_table(parent) {
            match tag {
                "tr" => {
                    let Ok(row) = self.doc.insert_row(parent) else {
                        return;
                    };
                    self.doc.set_provenance(row, self.provenance);
                    self.copy_attributes(row, markup);
                    self.build_children(markup, row);
                    return;
                }
                "col" => {
                    parent = self.colgroup(parent);
                    before = None;
                }
                _ if !TABLE_STRUCTURE.contains(&tag) => {
                    if let Some(outer) = self.doc.parent(parent) {
                        tracing::trace!("Foster-parenting <{}> before its table", tag);
                        self.build_element(markup, outer, Some(parent));
                        return;
                    }
                }
                _ => {}
            }
        }

        let elem = self.doc.create_element_with_provenance(tag, self.provenance);
        self.copy_attributes(elem, markup);
        if !self.insert(parent, elem, before) {
            return;
        }

        if self.doc.element(elem).is_some_and(|e| e.is_script_bearing()) {
            let source = markup.first_text().unwrap_or_default();
            let _ = self.doc.set_inline_content(elem, source);
            return;
        }
        self.build_children(markup, elem);
    }

    /// The table's trailing `colgroup`, created if the last child is anything else
    fn colgroup(&mut self, table: NodeId) -> NodeId {
        if let Some(last) = self.doc.last_child(table) {
            if self.doc.element(last).is_some_and(|e| e.is("colgroup")) {
                return last;
            }
        }
        let colgroup = self
            .doc
            .create_element_with_provenance("colgroup", self.provenance);
        self.insert(table, colgroup, None);
        colgroup
    }

    fn copy_attributes(&mut self, elem: NodeId, markup: &MarkupElement) {
        for (name, value) in &markup.attrs {
            let _ = self.doc.set_attribute(elem, name, value);
        }
    }

    fn insert(&mut self, parent: NodeId, child: NodeId, before: Option<NodeId>) -> bool {
        let result = match before {
            Some(reference) => self.doc.insert_before(parent, child, Some(reference)),
            None => self.doc.append_child(parent, child),
        };
        match result {
            Ok(_) => true,
            Err(err) => {
                tracing::trace!("Dropping node that cannot be inserted: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize;

    fn page(html: &str) -> Document {
        let mut doc = Document::new("about:blank");
        build_document(&mut doc, &tokenize(html).nodes);
        doc
    }

    fn tags(doc: &Document, parent: NodeId) -> Vec<String> {
        doc.children(parent)
            .iter()
            .filter_map(|&c| doc.local_name(c).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_head_and_body_reused() {
        let doc = page("<html><head><title>T</title></head><body class=main><p>x</p></body></html>");
        let html = doc.document_element().unwrap();
        assert_eq!(tags(&doc, html), vec!["head", "body"]);

        let body = doc.body().unwrap();
        assert_eq!(doc.get_attribute(body, "class"), Some("main"));
        assert_eq!(tags(&doc, body), vec!["p"]);
        assert_eq!(doc.title(), "T");
    }

    #[test]
    fn test_stray_content_goes_to_body() {
        let doc = page("<div>a</div>\n  text");
        let body = doc.body().unwrap();
        assert_eq!(tags(&doc, body), vec!["div"]);
        assert_eq!(doc.children(body).len(), 2);
        assert_eq!(doc.text_content(body), "a\n  text");
    }

    #[test]
    fn test_whitespace_between_head_and_body_dropped() {
        let doc = page("<html><head></head>\n\n<body></body></html>");
        let html = doc.document_element().unwrap();
        assert_eq!(doc.children(html).len(), 2);
    }

    #[test]
    fn test_html_attributes_copied() {
        let doc = page("<html lang=en><body></body></html>");
        let html = doc.document_element().unwrap();
        assert_eq!(doc.get_attribute(html, "lang"), Some("en"));
    }

    #[test]
    fn test_col_goes_into_colgroup() {
        let doc = page("<table><col span=2><col></table>");
        let table = doc.get_elements_by_tag_name(doc.root(), "table")[0];
        assert_eq!(tags(&doc, table), vec!["colgroup"]);
        let colgroup = doc.children(table)[0];
        assert_eq!(tags(&doc, colgroup), vec!["col", "col"]);
    }

    #[test]
    fn test_fragment_provenance() {
        let mut doc = Document::new("about:blank");
        let body = doc.body().unwrap();
        build_fragment(&mut doc, body, &tokenize("<b>x</b>").nodes, Provenance::Script);

        let b = doc.children(body)[0];
        assert_eq!(doc.provenance(b), Some(Provenance::Script));
        let text = doc.children(b)[0];
        assert_eq!(doc.provenance(text), Some(Provenance::Script));
    }

    #[test]
    fn test_parser_provenance() {
        let doc = page("<p>x</p>");
        let p = doc.get_elements_by_tag_name(doc.root(), "p")[0];
        assert_eq!(doc.provenance(p), Some(Provenance::Parser));
    }
}
