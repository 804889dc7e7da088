//! Arena-backed document tree.
//!
//! Nodes are owned by the [`Document`] and addressed by [`NodeId`].
//! Parent links are plain ids, so context lookups during traversal
//! never fight the borrow checker.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::kind::NodeKind;

/// Handle to a node inside a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single tree node: its kind, structural links, and the common
/// identifier/class/name sets shared by all kinds.
#[derive(Clone, Debug)]
pub struct Node {
    /// What this node represents, with kind-specific attributes.
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Anchor identifiers. The first becomes the rendered `id` attribute.
    pub ids: Vec<String>,
    /// Class tags merged into the rendered `class` attribute.
    pub classes: Vec<String>,
    /// Human-readable names registered for this node.
    pub names: Vec<String>,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            ids: Vec::new(),
            classes: Vec::new(),
            names: Vec::new(),
        }
    }

    /// The owning parent, `None` for the document root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered child sequence.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A parsed document: one root node plus the arena that owns every
/// node in the tree.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    /// Name-to-identifier resolution table filled by the upstream parser.
    pub nameids: HashMap<String, String>,
}

impl Document {
    /// Create an empty document without a metadata title.
    pub fn new() -> Self {
        Self::with_title(None)
    }

    /// Create an empty document with the given metadata title.
    pub fn with_title(title: Option<&str>) -> Self {
        Self {
            nodes: vec![Node::new(
                NodeKind::Document {
                    title: title.map(str::to_owned),
                },
                None,
            )],
            nameids: HashMap::new(),
        }
    }

    /// The root node id.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a new node under `parent` and return its id.
    pub fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(kind, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append a text leaf under `parent`.
    pub fn push_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        self.push(parent, NodeKind::Text(text.into()))
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// The parent of `id`, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Ordered children of `id`.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Children of `id` excluding invisible kinds (comments, targets, …).
    pub fn visible_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| !self.nodes[c.0].kind.is_invisible())
            .collect()
    }

    /// The sibling immediately following `id`, if any.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings.get(pos + 1).copied()
    }

    /// Concatenated text of every [`NodeKind::Text`] descendant of `id`,
    /// in document order. The text of `id` itself when it is a leaf.
    pub fn astext(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let NodeKind::Text(text) = &self.nodes[id.0].kind {
            out.push_str(text);
        }
        for &child in self.children(id) {
            self.collect_text(child, out);
        }
    }

    /// Replace the content of a text leaf. Returns `false` when `id` is
    /// not a [`NodeKind::Text`] node.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> bool {
        match &mut self.nodes[id.0].kind {
            NodeKind::Text(current) => {
                *current = text.into();
                true
            }
            _ => false,
        }
    }

    /// Pre-order list of `id` and all its descendants.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &child in self.children(id) {
            self.collect_descendants(child, out);
        }
    }

    /// Pre-order list of the text leaves under `id`.
    pub fn text_leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&d| matches!(self.nodes[d.0].kind, NodeKind::Text(_)))
            .collect()
    }

    /// Total number of nodes in the arena, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds only the root node.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<NodeId> for Document {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Document {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_and_query() {
        let mut doc = Document::with_title(Some("Doc"));
        let para = doc.push(doc.root(), NodeKind::Paragraph);
        let text = doc.push_text(para, "Hello");

        assert_eq!(doc.parent(para), Some(doc.root()));
        assert_eq!(doc.parent(text), Some(para));
        assert_eq!(doc.children(doc.root()), &[para]);
        assert_eq!(doc.astext(para), "Hello");
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_astext_concatenates_descendants() {
        let mut doc = Document::new();
        let para = doc.push(doc.root(), NodeKind::Paragraph);
        doc.push_text(para, "one ");
        let em = doc.push(para, NodeKind::Emphasis);
        doc.push_text(em, "two");
        doc.push_text(para, " three");

        assert_eq!(doc.astext(para), "one two three");
    }

    #[test]
    fn test_next_sibling() {
        let mut doc = Document::new();
        let a = doc.push(doc.root(), NodeKind::Paragraph);
        let b = doc.push(doc.root(), NodeKind::Paragraph);

        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.next_sibling(b), None);
        assert_eq!(doc.next_sibling(doc.root()), None);
    }

    #[test]
    fn test_visible_children_skips_invisible() {
        let mut doc = Document::new();
        let item = doc.push(doc.root(), NodeKind::ListItem);
        let para = doc.push(item, NodeKind::Paragraph);
        doc.push(item, NodeKind::Comment);
        let list = doc.push(item, NodeKind::BulletList);

        assert_eq!(doc.visible_children(item), vec![para, list]);
    }

    #[test]
    fn test_set_text() {
        let mut doc = Document::new();
        let para = doc.push(doc.root(), NodeKind::Paragraph);
        let text = doc.push_text(para, "before");

        assert!(doc.set_text(text, "after"));
        assert!(!doc.set_text(para, "nope"));
        assert_eq!(doc.astext(para), "after");
    }

    #[test]
    fn test_text_leaves_in_order() {
        let mut doc = Document::new();
        let para = doc.push(doc.root(), NodeKind::Paragraph);
        let t1 = doc.push_text(para, "a");
        let strong = doc.push(para, NodeKind::Strong);
        let t2 = doc.push_text(strong, "b");
        let t3 = doc.push_text(para, "c");

        assert_eq!(doc.text_leaves(para), vec![t1, t2, t3]);
    }
}
