//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed individually: a removed node stays in the arena,
//! detached, until the whole document is dropped.

use crate::node::{Node, NodeData, Provenance};
use crate::{DocumentId, DomError, DomResult, NodeId, NodeKind};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    owner: DocumentId,
}

impl DomTree {
    pub(crate) fn new(owner: DocumentId) -> Self {
        Self {
            nodes: Vec::new(),
            owner,
        }
    }

    pub(crate) fn create(&mut self, data: NodeData, provenance: Provenance) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(self.owner, data, provenance));
        id
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes ever created in this tree (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Document every node of this arena belongs to
    pub fn owner(&self) -> DocumentId {
        self.owner
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        siblings.get(pos + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let pos = siblings.iter().position(|&c| c == id)?;
        pos.checked_sub(1).and_then(|p| siblings.get(p).copied())
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Descendants of `id` in tree order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference`, or at the end when `reference` is `None`
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.ensure_insertable(parent, child)?;
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(DomError::NotFound);
            }
        }
        // Inserting a node before itself means "keep its slot"
        let reference = if reference == Some(child) {
            self.next_sibling(child)
        } else {
            reference
        };

        self.detach(child);
        let siblings = &mut self.nodes[parent.index()].children;
        match reference.and_then(|r| siblings.iter().position(|&c| c == r)) {
            Some(pos) => siblings.insert(pos, child),
            None => siblings.push(child),
        }
        self.nodes[child.index()].parent = Some(parent);
        Ok(child)
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.get(parent).is_none() || self.parent(child) != Some(parent) {
            return Err(DomError::NotFound);
        }
        self.detach(child);
        Ok(child)
    }

    /// Put `new_child` where `old_child` is
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> DomResult<NodeId> {
        if self.parent(old_child) != Some(parent) {
            return Err(DomError::NotFound);
        }
        if new_child == old_child {
            return Ok(old_child);
        }
        self.ensure_insertable(parent, new_child)?;
        self.insert_before(parent, new_child, Some(old_child))?;
        self.detach(old_child);
        Ok(old_child)
    }

    /// Unlink `id` from its parent, if any
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        self.nodes[parent.index()].children.retain(|&c| c != id);
        self.nodes[id.index()].parent = None;
    }

    fn ensure_insertable(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let parent_node = self.get(parent).ok_or(DomError::NotFound)?;
        let child_node = self.get(child).ok_or(DomError::NotFound)?;
        if !parent_node.kind().can_have_children() || child_node.kind() == NodeKind::Document {
            return Err(DomError::HierarchyRequest);
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        Ok(())
    }
}

/// Iterator over a node's ancestors
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ElementData;

    fn tree_with(n: usize) -> (DomTree, Vec<NodeId>) {
        let mut tree = DomTree::new(DocumentId::next());
        let ids = (0..n)
            .map(|_| tree.create(NodeData::Element(ElementData::new("div")), Provenance::Script))
            .collect();
        (tree, ids)
    }

    #[test]
    fn test_append_moves_between_parents() {
        let (mut tree, ids) = tree_with(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        tree.append_child(a, c).unwrap();
        tree.append_child(b, c).unwrap();

        assert_eq!(tree.parent(c), Some(b));
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), &[c]);
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut tree, ids) = tree_with(3);
        tree.append_child(ids[0], ids[1]).unwrap();
        tree.append_child(ids[1], ids[2]).unwrap();

        assert_eq!(tree.append_child(ids[2], ids[0]), Err(DomError::HierarchyRequest));
        assert_eq!(tree.append_child(ids[0], ids[0]), Err(DomError::HierarchyRequest));
        assert_eq!(tree.parent(ids[0]), None);
        assert_eq!(tree.children(ids[2]), &[] as &[NodeId]);
    }

    #[test]
    fn test_insert_before_positions() {
        let (mut tree, ids) = tree_with(4);
        let p = ids[0];
        tree.append_child(p, ids[1]).unwrap();
        tree.append_child(p, ids[2]).unwrap();
        tree.insert_before(p, ids[3], Some(ids[2])).unwrap();

        assert_eq!(tree.children(p), &[ids[1], ids[3], ids[2]]);
        assert_eq!(tree.next_sibling(ids[1]), Some(ids[3]));
        assert_eq!(tree.previous_sibling(ids[2]), Some(ids[3]));
        assert_eq!(tree.previous_sibling(ids[1]), None);
    }

    #[test]
    fn test_insert_before_itself_keeps_slot() {
        let (mut tree, ids) = tree_with(3);
        tree.append_child(ids[0], ids[1]).unwrap();
        tree.append_child(ids[0], ids[2]).unwrap();
        tree.insert_before(ids[0], ids[1], Some(ids[1])).unwrap();

        assert_eq!(tree.children(ids[0]), &[ids[1], ids[2]]);
    }

    #[test]
    fn test_insert_before_foreign_reference() {
        let (mut tree, ids) = tree_with(3);
        assert_eq!(
            tree.insert_before(ids[0], ids[1], Some(ids[2])),
            Err(DomError::NotFound)
        );
    }

    #[test]
    fn test_descendants_in_tree_order() {
        let (mut tree, ids) = tree_with(5);
        tree.append_child(ids[0], ids[1]).unwrap();
        tree.append_child(ids[1], ids[2]).unwrap();
        tree.append_child(ids[0], ids[3]).unwrap();
        tree.append_child(ids[3], ids[4]).unwrap();

        assert_eq!(tree.descendants(ids[0]), vec![ids[1], ids[2], ids[3], ids[4]]);
        assert_eq!(tree.ancestors(ids[4]).collect::<Vec<_>>(), vec![ids[3], ids[0]]);
    }

    #[test]
    fn test_replace_child() {
        let (mut tree, ids) = tree_with(4);
        tree.append_child(ids[0], ids[1]).unwrap();
        tree.append_child(ids[0], ids[2]).unwrap();
        tree.replace_child(ids[0], ids[3], ids[1]).unwrap();

        assert_eq!(tree.children(ids[0]), &[ids[3], ids[2]]);
        assert_eq!(tree.parent(ids[1]), None);
    }
}
