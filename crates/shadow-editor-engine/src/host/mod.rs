//! Host node tree contract.
//!
//! The editor never owns the document it edits. The surrounding runtime
//! supplies a mutable node tree (a browser DOM, a native widget tree, or the
//! [`MemoryHost`] used by tests and the CLI) and the editor drives it through
//! [`HostTree`]. Node handles are plain [`HostId`] values so that the shadow
//! tree can refer back to host nodes without holding borrows across edits.

pub mod markup;
mod memory;

pub use markup::MarkupError;
pub use memory::MemoryHost;

/// Zero-width space used as a caret anchor inside otherwise empty nodes.
pub const INVISIBLE_SPACE: char = '\u{200B}';

/// Space variant that the host renders without collapsing.
pub const NON_BREAKING_SPACE: char = '\u{00A0}';

/// Host node types that can never hold children or text.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Opaque handle to a node owned by the host tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(u32);

impl HostId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Text,
    Element,
    /// Comments, processing instructions and anything else without text.
    Other,
}

/// A point inside the host tree, in host coordinates: characters for a text
/// node, children for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPoint {
    pub node: HostId,
    pub offset: usize,
}

impl HostPoint {
    pub fn new(node: HostId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// The user's current selection as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRange {
    pub start: HostPoint,
    pub end: HostPoint,
}

impl HostRange {
    pub fn collapsed(point: HostPoint) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Operations the editor core needs from the host node tree.
///
/// Mutating methods on detached or unknown handles are no-ops; the editor
/// validates handles against its shadow tree before calling them.
pub trait HostTree {
    /// The editable root element. It is never removed.
    fn root(&self) -> HostId;

    /// `None` for handles the host does not know about.
    fn kind(&self, node: HostId) -> Option<HostKind>;

    /// Lowercase tag name for elements.
    fn tag_name(&self, node: HostId) -> Option<&str>;

    fn text(&self, node: HostId) -> Option<&str>;

    fn set_text(&mut self, node: HostId, text: &str);

    fn parent(&self, node: HostId) -> Option<HostId>;

    fn children(&self, node: HostId) -> &[HostId];

    fn create_text(&mut self, text: &str) -> HostId;

    fn create_element(&mut self, tag: &str) -> HostId;

    /// Moves `node` under `parent`, before `reference` or at the end when
    /// `reference` is `None`. The node is detached from its old parent first.
    fn insert_before(&mut self, parent: HostId, node: HostId, reference: Option<HostId>);

    /// Removes `node` (and its subtree) from its parent.
    fn detach(&mut self, node: HostId);

    fn attribute(&self, node: HostId, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, node: HostId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: HostId, name: &str);

    /// Parses a markup fragment into detached host nodes, in document order.
    fn parse_fragment(&mut self, markup: &str) -> Result<Vec<HostId>, MarkupError>;

    /// Serializes the children of `node`.
    fn inner_markup(&self, node: HostId) -> String;

    /// The current user selection, if the host has one.
    fn selection(&self) -> Option<HostRange>;

    /// Places a collapsed host selection inside a text node.
    fn place_caret(&mut self, node: HostId, offset: usize);

    fn first_child(&self, node: HostId) -> Option<HostId> {
        self.children(node).first().copied()
    }

    fn next_sibling(&self, node: HostId) -> Option<HostId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&child| child == node)?;
        siblings.get(index + 1).copied()
    }

    fn previous_sibling(&self, node: HostId) -> Option<HostId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|&child| child == node)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    /// True when `node` is `ancestor` or lies inside it.
    fn contains(&self, ancestor: HostId, node: HostId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }

    /// True when the node is reachable from the root.
    fn is_attached(&self, node: HostId) -> bool {
        self.contains(self.root(), node)
    }

    fn has_attribute(&self, node: HostId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    fn is_void(&self, node: HostId) -> bool {
        self.kind(node) == Some(HostKind::Element)
            && self
                .tag_name(node)
                .is_some_and(|tag| VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag)))
    }

    /// Whitespace-only text directly inside a list container.
    fn is_ignorable(&self, node: HostId) -> bool {
        if self.kind(node) != Some(HostKind::Text) {
            return false;
        }
        let whitespace_only = self
            .text(node)
            .is_some_and(|text| text.chars().all(char::is_whitespace));
        let in_list = self
            .parent(node)
            .and_then(|parent| self.tag_name(parent))
            .is_some_and(|tag| tag == "ul" || tag == "ol");
        whitespace_only && in_list
    }

    /// Replaces all children of `node` with the parsed `markup`.
    fn set_inner_markup(&mut self, node: HostId, markup: &str) -> Result<(), MarkupError> {
        let fresh = self.parse_fragment(markup)?;
        for child in self.children(node).to_vec() {
            self.detach(child);
        }
        for child in fresh {
            self.insert_before(node, child, None);
        }
        Ok(())
    }

    /// Concatenated text of the subtree, skipping ignorable text.
    fn text_content(&self, node: HostId) -> String {
        let mut out = String::new();
        collect_text(self, node, &mut out);
        out
    }
}

fn collect_text<H: HostTree + ?Sized>(host: &H, node: HostId, out: &mut String) {
    match host.kind(node) {
        Some(HostKind::Text) if !host.is_ignorable(node) => {
            if let Some(text) = host.text(node) {
                out.push_str(text);
            }
        }
        Some(HostKind::Element) => {
            for &child in host.children(node) {
                collect_text(host, child, out);
            }
        }
        _ => {}
    }
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits `text` at a character (not byte) offset.
pub(crate) fn split_chars(text: &str, at: usize) -> (&str, &str) {
    let byte = text
        .char_indices()
        .nth(at)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    text.split_at(byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_chars_counts_scalars_not_bytes() {
        assert_eq!(split_chars("héllo", 2), ("hé", "llo"));
        assert_eq!(split_chars("abc", 0), ("", "abc"));
        assert_eq!(split_chars("abc", 10), ("abc", ""));
    }

    #[test]
    fn void_and_ignorable_classification() {
        let host = MemoryHost::from_markup("<ul>\n  <li>a<br></li>\n</ul>").unwrap();
        let ul = host.children(host.root())[0];
        let whitespace = host.children(ul)[0];
        let li = host.children(ul)[1];
        let br = host.children(li)[1];

        assert!(host.is_ignorable(whitespace));
        assert!(!host.is_ignorable(host.children(li)[0]));
        assert!(host.is_void(br));
        assert!(!host.is_void(li));
    }

    #[test]
    fn text_content_skips_ignorable_whitespace() {
        let host = MemoryHost::from_markup("<ul>\n <li>one</li>\n <li>two</li>\n</ul>").unwrap();
        assert_eq!(host.text_content(host.root()), "onetwo");
    }

    #[test]
    fn sibling_navigation() {
        let host = MemoryHost::from_markup("<b>x</b>y<i>z</i>").unwrap();
        let kids = host.children(host.root()).to_vec();
        assert_eq!(host.next_sibling(kids[0]), Some(kids[1]));
        assert_eq!(host.previous_sibling(kids[0]), None);
        assert_eq!(host.previous_sibling(kids[2]), Some(kids[1]));
        assert!(host.contains(host.root(), kids[2]));
    }
}
