use crate::EditorError;
use crate::host::{HostId, HostTree};

use crate::editing::Editor;

/// Part of a text node covered by a range selection, in absolute offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionFragment {
    pub node: HostId,
    pub start: usize,
    pub end: usize,
}

/// Free character span, possibly cutting through text nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSelection {
    /// Ordered by position.
    pub fragments: Vec<SelectionFragment>,
}

impl RangeSelection {
    pub fn start(&self) -> Option<usize> {
        self.fragments.iter().map(|f| f.start).min()
    }

    pub fn end(&self) -> Option<usize> {
        self.fragments.iter().map(|f| f.end).max()
    }
}

/// Whole structural nodes, not necessarily adjacent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSetSelection {
    pub nodes: Vec<HostId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Range(RangeSelection),
    Nodes(NodeSetSelection),
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        match self {
            Selection::Range(range) => range.fragments.iter().all(|f| f.start == f.end),
            Selection::Nodes(set) => set.nodes.is_empty(),
        }
    }

    /// Number of nodes the selection touches.
    pub fn len(&self) -> usize {
        match self {
            Selection::Range(range) => range.fragments.len(),
            Selection::Nodes(set) => set.nodes.len(),
        }
    }
}

impl<H: HostTree> Editor<H> {
    /// Range selection over the text in `[start, end)`.
    pub fn select_range(&mut self, start: usize, end: usize) -> Result<Selection, EditorError> {
        let (start, end) = (start.min(end), start.max(end));
        let (start, end) = (self.clamp_position(start), self.clamp_position(end));
        self.rebuild()?;

        let fragments = self
            .tree
            .text_leaves()
            .into_iter()
            .map(|id| self.tree.node(id))
            .filter(|n| n.start < end && n.end > start)
            .map(|n| SelectionFragment {
                node: n.host,
                start: start.max(n.start),
                end: end.min(n.end),
            })
            .collect();
        Ok(Selection::Range(RangeSelection { fragments }))
    }

    /// Node-set selection; duplicates are dropped.
    pub fn select_nodes(&self, nodes: &[HostId]) -> Selection {
        let mut unique: Vec<HostId> = Vec::with_capacity(nodes.len());
        for &node in nodes {
            if !unique.contains(&node) {
                unique.push(node);
            }
        }
        Selection::Nodes(NodeSetSelection { nodes: unique })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::EditorOptions;
    use crate::host::MemoryHost;
    use pretty_assertions::assert_eq;

    #[test]
    fn range_selection_fragments_cover_overlapping_text() {
        let host = MemoryHost::from_markup("<p>ab</p><p>cde</p><p>f</p>").unwrap();
        let mut editor = Editor::new(host, EditorOptions::default()).unwrap();

        let Selection::Range(range) = editor.select_range(1, 4).unwrap() else {
            panic!("expected a range selection");
        };
        let spans: Vec<(usize, usize)> = range.fragments.iter().map(|f| (f.start, f.end)).collect();
        assert_eq!(spans, vec![(1, 2), (2, 4)]);
        assert_eq!(range.start(), Some(1));
        assert_eq!(range.end(), Some(4));
    }

    #[test]
    fn caret_range_is_empty() {
        let host = MemoryHost::from_markup("<p>ab</p>").unwrap();
        let mut editor = Editor::new(host, EditorOptions::default()).unwrap();
        assert!(editor.select_range(1, 1).unwrap().is_empty());
    }

    #[test]
    fn node_selection_drops_duplicates() {
        let host = MemoryHost::from_markup("<p>ab</p>").unwrap();
        let editor = Editor::new(host, EditorOptions::default()).unwrap();
        let p = editor.host().children(editor.host().root())[0];
        assert_eq!(editor.select_nodes(&[p, p]).len(), 1);
    }
}
