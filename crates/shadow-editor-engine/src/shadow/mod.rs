//! Offset-annotated mirror of the host tree.
//!
//! Nodes live in an arena owned by [`ShadowTree`]; parent links and the
//! host-to-shadow index are plain ids, so the whole structure can be thrown
//! away and rebuilt after every host mutation without any cleanup.

use std::collections::HashMap;

use crate::EditorError;
use crate::host::{HostId, HostKind, HostTree, char_len};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Text,
    Tag,
    Other,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub host: HostId,
    /// Absolute offsets, half-open.
    pub start: usize,
    pub end: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Text of a text node; empty otherwise.
    pub text: String,
    pub tag: Option<String>,
    pub void: bool,
    /// Zero-length whitespace inside list containers.
    pub ignorable: bool,
}

impl Node {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// Inclusive at both ends: a caret at `end` still belongs to the node.
    pub fn contains_position(&self, position: usize) -> bool {
        self.start <= position && position <= self.end
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }
}

/// Node description used when splicing freshly created host nodes into the
/// tree without a full rebuild.
#[derive(Debug, Clone)]
pub(crate) enum Seed {
    Text {
        host: HostId,
        start: usize,
        text: String,
    },
    Tag {
        host: HostId,
        tag: String,
        start: usize,
        end: usize,
        children: Vec<Seed>,
    },
}

#[derive(Debug, Clone)]
pub struct ShadowTree {
    nodes: Vec<Node>,
    root: NodeId,
    by_host: HashMap<HostId, NodeId>,
}

impl ShadowTree {
    /// Walks the host tree depth-first, assigning offsets in document order.
    pub fn build<H: HostTree + ?Sized>(host: &H) -> Result<Self, EditorError> {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            by_host: HashMap::new(),
        };
        let mut counter = 0;
        tree.root = tree.walk(host, host.root(), None, &mut counter)?;
        Ok(tree)
    }

    fn walk<H: HostTree + ?Sized>(
        &mut self,
        host: &H,
        host_id: HostId,
        parent: Option<NodeId>,
        counter: &mut usize,
    ) -> Result<NodeId, EditorError> {
        let kind = host
            .kind(host_id)
            .ok_or(EditorError::UnclassifiableNode(host_id))?;
        let id = NodeId(self.nodes.len());
        let start = *counter;
        let mut node = Node {
            kind: NodeKind::Other,
            host: host_id,
            start,
            end: start,
            parent,
            children: Vec::new(),
            text: String::new(),
            tag: None,
            void: false,
            ignorable: false,
        };

        match kind {
            HostKind::Text => {
                node.kind = NodeKind::Text;
                node.text = host.text(host_id).unwrap_or_default().to_string();
                node.ignorable = host.is_ignorable(host_id);
                if !node.ignorable {
                    *counter += char_len(&node.text);
                }
                node.end = *counter;
                self.push(node);
            }
            HostKind::Element => {
                node.kind = NodeKind::Tag;
                node.tag = host.tag_name(host_id).map(str::to_string);
                node.void = host.is_void(host_id);
                self.push(node);
                let mut children = Vec::new();
                for &child in host.children(host_id) {
                    children.push(self.walk(host, child, Some(id), counter)?);
                }
                let tag_node = &mut self.nodes[id.0];
                tag_node.children = children;
                tag_node.end = *counter;
            }
            HostKind::Other => {
                self.push(node);
            }
        }

        Ok(id)
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.by_host.insert(node.host, id);
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Panics on an id from another tree; ids are only valid until the next
    /// rebuild.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn lookup(&self, host: HostId) -> Option<NodeId> {
        self.by_host.get(&host).copied()
    }

    /// Total document length in characters.
    pub fn len(&self) -> usize {
        self.node(self.root).end
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Pre-order listing of the subtree rooted at `from`.
    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev());
        }
        out
    }

    /// Pre-order listing restricted to nodes matching `predicate`.
    pub fn filter(&self, from: NodeId, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.preorder(from)
            .into_iter()
            .filter(|&id| predicate(self.node(id)))
            .collect()
    }

    /// Text nodes that contribute to the document text, in document order.
    pub fn text_leaves(&self) -> Vec<NodeId> {
        self.filter(self.root, |n| n.is_text() && !n.ignorable)
    }

    pub fn text_content(&self) -> String {
        self.text_leaves()
            .into_iter()
            .map(|id| self.node(id).text.as_str())
            .collect()
    }

    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    /// Closest text leaf before `node` in document order, outside its subtree.
    pub fn previous_text_leaf(&self, node: NodeId) -> Option<NodeId> {
        let order = self.preorder(self.root);
        let index = order.iter().position(|&id| id == node)?;
        order[..index]
            .iter()
            .rev()
            .copied()
            .find(|&id| {
                let n = self.node(id);
                n.is_text() && !n.ignorable && !self.is_descendant(node, id)
            })
    }

    /// Replaces `old` (a child of some tag) with freshly created nodes.
    ///
    /// Offsets in `seeds` must cover exactly the range `old` covered; the rest
    /// of the tree is left untouched.
    pub(crate) fn splice(&mut self, old: NodeId, seeds: Vec<Seed>) -> Vec<NodeId> {
        let Some(parent) = self.node(old).parent else {
            return Vec::new();
        };
        for dead in self.preorder(old) {
            let host = self.node(dead).host;
            if self.by_host.get(&host) == Some(&dead) {
                self.by_host.remove(&host);
            }
        }

        let fresh: Vec<NodeId> = seeds
            .into_iter()
            .map(|seed| self.plant(seed, parent))
            .collect();

        let siblings = &mut self.nodes[parent.0].children;
        if let Some(index) = siblings.iter().position(|&c| c == old) {
            siblings.splice(index..=index, fresh.iter().copied());
        }
        fresh
    }

    fn plant(&mut self, seed: Seed, parent: NodeId) -> NodeId {
        match seed {
            Seed::Text { host, start, text } => {
                let end = start + char_len(&text);
                self.push(Node {
                    kind: NodeKind::Text,
                    host,
                    start,
                    end,
                    parent: Some(parent),
                    children: Vec::new(),
                    text,
                    tag: None,
                    void: false,
                    ignorable: false,
                })
            }
            Seed::Tag {
                host,
                tag,
                start,
                end,
                children,
            } => {
                let id = self.push(Node {
                    kind: NodeKind::Tag,
                    host,
                    start,
                    end,
                    parent: Some(parent),
                    children: Vec::new(),
                    text: String::new(),
                    tag: Some(tag),
                    void: false,
                    ignorable: false,
                });
                let planted: Vec<NodeId> =
                    children.into_iter().map(|c| self.plant(c, id)).collect();
                self.nodes[id.0].children = planted;
                id
            }
        }
    }

    /// Indented one-line-per-node listing, for diagnostics.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(self.root, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let indent = "  ".repeat(depth);
        let label = match node.kind {
            NodeKind::Text => format!("text {:?}", node.text),
            NodeKind::Tag => format!("<{}>", node.tag.as_deref().unwrap_or("?")),
            NodeKind::Other => "other".to_string(),
        };
        out.push_str(&format!("{indent}{label} [{}, {})\n", node.start, node.end));
        for &child in &node.children {
            self.dump_into(child, depth + 1, out);
        }
    }
}
