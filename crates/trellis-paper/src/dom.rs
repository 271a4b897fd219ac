//! In-memory SVG node tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. A node has at most one parent and
//! child order is explicit. Every call that actually changes the tree (structure or an
//! attribute value) bumps [`Dom::revision`]; calls that would leave the tree as it is do not,
//! which lets callers observe whether an update pass touched the document at all.
//!
//! Slots of removed nodes are recycled. Each slot carries a generation that is bumped when it
//! is freed, so an id kept past [`Dom::remove`] reads as dead instead of aliasing the node
//! that reuses its slot.

use std::fmt::Write as _;

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
    },
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    generation: u32,
    alive: bool,
}

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: NodeId,
    revision: u64,
}

impl Dom {
    pub fn new(root_tag: &str) -> Self {
        let root = Node {
            kind: NodeKind::Element {
                tag: root_tag.to_string(),
                attrs: IndexMap::new(),
            },
            parent: None,
            children: Vec::new(),
            generation: 0,
            alive: true,
        };
        Self {
            nodes: vec![root],
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            revision: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of arena slots, live or waiting for reuse.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live nodes.
    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.index)
            .filter(|n| n.alive && n.generation == id.generation)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.index)
            .filter(|n| n.alive && n.generation == id.generation)
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.nodes[index];
            slot.kind = kind;
            slot.parent = None;
            slot.alive = true;
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            generation: 0,
            alive: true,
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
        })
    }

    /// Creates a detached comment.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.node(node).is_some()
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.node(node).map(|n| &n.kind)
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Comment(_) => None,
        }
    }

    pub fn comment_text(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Comment(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn is_comment(&self, node: NodeId) -> bool {
        self.node(node)
            .is_some_and(|n| matches!(n.kind, NodeKind::Comment(_)))
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    fn index_in_parent(&self, node: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(node)?;
        let idx = self.children(parent).iter().position(|c| *c == node)?;
        Some((parent, idx))
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let (parent, idx) = self.index_in_parent(node)?;
        self.children(parent).get(idx + 1).copied()
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let (parent, idx) = self.index_in_parent(node)?;
        idx.checked_sub(1).map(|i| self.children(parent)[i])
    }

    fn unlink(&mut self, node: NodeId) {
        if let Some((parent, idx)) = self.index_in_parent(node) {
            if let Some(p) = self.node_mut(parent) {
                p.children.remove(idx);
            }
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }

    /// Appends `child` to `parent`, moving it from its current position if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.is_alive(parent) || !self.is_alive(child) {
            return;
        }
        if self.children(parent).last() == Some(&child) {
            return;
        }
        self.unlink(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        self.revision += 1;
    }

    /// Inserts `child` right before `reference`, or appends it when there is no reference.
    ///
    /// `reference` must be a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let Some(reference) = reference else {
            self.append_child(parent, child);
            return;
        };
        if child == reference || !self.is_alive(parent) || !self.is_alive(child) {
            return;
        }
        if self.parent(child) == Some(parent) && self.next_sibling(child) == Some(reference) {
            return;
        }
        self.unlink(child);
        if let Some(p) = self.node_mut(parent) {
            let idx = p
                .children
                .iter()
                .position(|c| *c == reference)
                .unwrap_or(p.children.len());
            p.children.insert(idx, child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        self.revision += 1;
    }

    /// Detaches `node` from its parent, keeping the subtree alive.
    pub fn detach(&mut self, node: NodeId) {
        if self.parent(node).is_none() {
            return;
        }
        self.unlink(node);
        self.revision += 1;
    }

    /// Detaches `node` and frees its whole subtree. The root cannot be removed.
    pub fn remove(&mut self, node: NodeId) {
        if !self.is_alive(node) || node == self.root {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            let slot = &mut self.nodes[n.index];
            slot.alive = false;
            slot.parent = None;
            slot.generation = slot.generation.wrapping_add(1);
            slot.kind = NodeKind::Comment(String::new());
            stack.append(&mut slot.children);
            self.free.push(n.index);
        }
        self.revision += 1;
    }

    /// Removes every child of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        let children = self.children(node).to_vec();
        for child in children {
            self.remove(child);
        }
    }

    /// Sets an attribute; returns whether the stored value changed.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        let Some(NodeKind::Element { attrs, .. }) = self.node_mut(node).map(|n| &mut n.kind) else {
            return false;
        };
        if attrs.get(name).map(String::as_str) == Some(value) {
            return false;
        }
        attrs.insert(name.to_string(), value.to_string());
        self.revision += 1;
        true
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> bool {
        let Some(NodeKind::Element { attrs, .. }) = self.node_mut(node).map(|n| &mut n.kind) else {
            return false;
        };
        if attrs.shift_remove(name).is_none() {
            return false;
        }
        self.revision += 1;
        true
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeKind::Comment(_) => None,
        }
    }

    /// Serializes the subtree rooted at `node`.
    pub fn to_svg(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, node);
        out
    }

    fn write_node(&self, out: &mut String, node: NodeId) {
        let Some(n) = self.node(node) else {
            return;
        };
        match &n.kind {
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    escape_attr_into(out, v);
                    out.push('"');
                }
                if n.children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in &n.children {
                    self.write_node(out, *child);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape_attr_into(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
