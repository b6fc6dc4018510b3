//! Document tree.
//!
//! Nodes live in a flat arena owned by [`Document`] and refer to their
//! children by [`NodeId`].  The root is always at index 0.  A finished
//! document is immutable and can be shared across threads and rendered by
//! any number of callers at once.

use super::element::Element;

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);
}

/// A `FOR` loop: `{$ FOR variable start end [step] $} ... {$END$}`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopNode {
    pub variable: String,
    pub start: Element,
    pub end: Element,
    pub step: Option<Element>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Document { children: Vec<NodeId> },
    Text(String),
    Echo(Vec<Element>),
    Loop(LoopNode),
}

impl Node {
    /// Children of a container node; empty for leaves.
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::Document { children } => children,
            Node::Loop(lp) => &lp.children,
            Node::Text(_) | Node::Echo(_) => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Node::Document { children } => Some(children),
            Node::Loop(lp) => Some(&mut lp.children),
            Node::Text(_) | Node::Echo(_) => None,
        }
    }
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            nodes: vec![Node::Document {
                children: Vec::new(),
            }],
        }
    }
}

impl Document {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Look up a node.  Ids come from this document, so the index is valid.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(NodeId::ROOT).is_empty()
    }

    /// Append `node` as the last child of `parent` and return its id.
    ///
    /// Returns `None` if `parent` cannot hold children.
    pub(crate) fn append(&mut self, parent: NodeId, node: Node) -> Option<NodeId> {
        let id = NodeId(self.nodes.len());
        self.nodes.get_mut(parent.0)?.children_mut()?.push(id);
        self.nodes.push(node);
        Some(id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lp(var: &str) -> Node {
        Node::Loop(LoopNode {
            variable: var.into(),
            start: Element::Integer(1),
            end: Element::Integer(2),
            step: None,
            children: Vec::new(),
        })
    }

    #[test]
    fn new_document_has_only_root() {
        let doc = Document::new();
        assert_eq!(doc.len(), 1);
        assert!(doc.is_empty());
        assert!(doc.node(doc.root()).children().is_empty());
    }

    #[test]
    fn append_keeps_source_order() {
        let mut doc = Document::new();
        let a = doc.append(NodeId::ROOT, Node::Text("a".into())).unwrap();
        let l = doc.append(NodeId::ROOT, lp("i")).unwrap();
        let b = doc.append(l, Node::Text("b".into())).unwrap();
        assert_eq!(doc.children(NodeId::ROOT), &[a, l]);
        assert_eq!(doc.children(l), &[b]);
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn leaves_reject_children() {
        let mut doc = Document::new();
        let t = doc.append(NodeId::ROOT, Node::Text("a".into())).unwrap();
        assert_eq!(doc.append(t, Node::Text("b".into())), None);
        assert_eq!(doc.len(), 2);
    }
}
