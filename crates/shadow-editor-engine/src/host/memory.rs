use super::markup::{self, MarkupNode, escape_attribute, escape_text, is_void_tag};
use super::{HostId, HostKind, HostPoint, HostRange, HostTree, MarkupError};

#[derive(Debug, Clone)]
struct HostNode {
    kind: HostKind,
    tag: Option<String>,
    /// Text for text nodes, body for comments.
    text: String,
    attributes: Vec<(String, String)>,
    parent: Option<HostId>,
    children: Vec<HostId>,
}

impl HostNode {
    fn new(kind: HostKind) -> Self {
        Self {
            kind,
            tag: None,
            text: String::new(),
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed host tree.
///
/// Stands in for a browser DOM wherever no real host exists: in tests, in
/// benchmarks and in the CLI. Detached nodes stay in the arena, so handles
/// never dangle; they simply stop being reachable from the root.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    nodes: Vec<HostNode>,
    root: HostId,
    selection: Option<HostRange>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// An empty editable root (`<div>`).
    pub fn new() -> Self {
        let mut root = HostNode::new(HostKind::Element);
        root.tag = Some("div".to_string());
        Self {
            nodes: vec![root],
            root: HostId::from_raw(0),
            selection: None,
        }
    }

    /// A root whose children are parsed from `markup`.
    pub fn from_markup(markup: &str) -> Result<Self, MarkupError> {
        let mut host = Self::new();
        let root = host.root;
        host.set_inner_markup(root, markup)?;
        Ok(host)
    }

    /// Simulates the user moving the selection.
    pub fn set_selection(&mut self, selection: Option<HostRange>) {
        self.selection = selection;
    }

    /// Serializes `node` including its own tag.
    pub fn outer_markup(&self, node: HostId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn node(&self, id: HostId) -> Option<&HostNode> {
        self.nodes.get(id.raw() as usize)
    }

    fn node_mut(&mut self, id: HostId) -> Option<&mut HostNode> {
        self.nodes.get_mut(id.raw() as usize)
    }

    fn alloc(&mut self, node: HostNode) -> HostId {
        let id = HostId::from_raw(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn materialize(&mut self, source: MarkupNode) -> HostId {
        match source {
            MarkupNode::Text(text) => self.create_text(&text),
            MarkupNode::Comment(body) => {
                let mut node = HostNode::new(HostKind::Other);
                node.text = body;
                self.alloc(node)
            }
            MarkupNode::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.create_element(&tag);
                if let Some(node) = self.node_mut(id) {
                    node.attributes = attributes;
                }
                for child in children {
                    let child = self.materialize(child);
                    self.insert_before(id, child, None);
                }
                id
            }
        }
    }

    fn write_markup(&self, id: HostId, out: &mut String) {
        let Some(node) = self.node(id) else { return };
        match node.kind {
            HostKind::Text => out.push_str(&escape_text(&node.text)),
            HostKind::Other => {
                out.push_str("<!--");
                out.push_str(&node.text);
                out.push_str("-->");
            }
            HostKind::Element => {
                let tag = node.tag.as_deref().unwrap_or("span");
                out.push('<');
                out.push_str(tag);
                for (name, value) in &node.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if is_void_tag(tag) {
                    return;
                }
                for &child in &node.children {
                    self.write_markup(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl HostTree for MemoryHost {
    fn root(&self) -> HostId {
        self.root
    }

    fn kind(&self, node: HostId) -> Option<HostKind> {
        self.node(node).map(|n| n.kind)
    }

    fn tag_name(&self, node: HostId) -> Option<&str> {
        self.node(node).and_then(|n| n.tag.as_deref())
    }

    fn text(&self, node: HostId) -> Option<&str> {
        self.node(node)
            .filter(|n| n.kind == HostKind::Text)
            .map(|n| n.text.as_str())
    }

    fn set_text(&mut self, node: HostId, text: &str) {
        if let Some(n) = self.node_mut(node).filter(|n| n.kind == HostKind::Text) {
            n.text = text.to_string();
        }
    }

    fn parent(&self, node: HostId) -> Option<HostId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn children(&self, node: HostId) -> &[HostId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn create_text(&mut self, text: &str) -> HostId {
        let mut node = HostNode::new(HostKind::Text);
        node.text = text.to_string();
        self.alloc(node)
    }

    fn create_element(&mut self, tag: &str) -> HostId {
        let mut node = HostNode::new(HostKind::Element);
        node.tag = Some(tag.to_ascii_lowercase());
        self.alloc(node)
    }

    fn insert_before(&mut self, parent: HostId, node: HostId, reference: Option<HostId>) {
        if self.kind(parent) != Some(HostKind::Element)
            || self.node(node).is_none()
            || self.contains(node, parent)
        {
            return;
        }
        self.detach(node);

        let Some(parent_node) = self.node_mut(parent) else {
            return;
        };
        let index = reference
            .and_then(|r| parent_node.children.iter().position(|&c| c == r))
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(index, node);

        if let Some(n) = self.node_mut(node) {
            n.parent = Some(parent);
        }
    }

    fn detach(&mut self, node: HostId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }

    fn attribute(&self, node: HostId, name: &str) -> Option<&str> {
        self.node(node)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attribute(&mut self, node: HostId, name: &str, value: &str) {
        let Some(n) = self.node_mut(node).filter(|n| n.kind == HostKind::Element) else {
            return;
        };
        match n.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => n.attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn remove_attribute(&mut self, node: HostId, name: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.retain(|(k, _)| k != name);
        }
    }

    fn parse_fragment(&mut self, markup: &str) -> Result<Vec<HostId>, MarkupError> {
        let parsed = markup::parse(markup)?;
        Ok(parsed
            .into_iter()
            .map(|node| self.materialize(node))
            .collect())
    }

    fn inner_markup(&self, node: HostId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_markup(child, &mut out);
        }
        out
    }

    fn selection(&self) -> Option<HostRange> {
        self.selection
    }

    fn place_caret(&mut self, node: HostId, offset: usize) {
        self.selection = Some(HostRange::collapsed(HostPoint::new(node, offset)));
    }
}
