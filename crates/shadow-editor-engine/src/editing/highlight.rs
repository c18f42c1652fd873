use crate::EditorError;
use crate::host::{HostTree, split_chars};
use crate::shadow::{Node, NodeId, NodeKind, Seed};

use super::Editor;

impl<H: HostTree> Editor<H> {
    /// Marks `[start, end)` as highlighted.
    ///
    /// Nodes wholly inside the range get the marker attribute; text cut by a
    /// range edge is split and its covered part wrapped in a marker element.
    /// The shadow tree is patched in place rather than rebuilt. Returns
    /// `false` when the exact range is already highlighted.
    pub fn highlight_range(&mut self, start: usize, end: usize) -> Result<bool, EditorError> {
        let (start, end) = (start.min(end), start.max(end));
        let end = self.clamp_position(end);
        if start >= end {
            log::warn!("ignoring empty highlight range [{start}, {end})");
            return Ok(false);
        }
        if !self
            .find_highlights(|n| n.start == start && n.end == end)
            .is_empty()
        {
            log::warn!("highlighting already highlighted region [{start}, {end})");
            return Ok(false);
        }

        let caret = self.selection.anchor;
        let targets = self.nodes_to_highlight(self.tree.root(), start, end);
        for id in targets {
            self.highlight_node(id, start, end);
        }

        let caret_displaced = self.current.is_some_and(|c| !self.host.is_attached(c));
        if caret_displaced || (start <= caret && caret <= end) {
            self.current = None;
            self.set_current_position(caret, false)?;
        }
        Ok(true)
    }

    /// Strips the marker from highlights lying within `[start, end)`.
    pub fn clear_highlight_for_range(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<usize, EditorError> {
        let found = self.find_highlights(|n| n.start >= start && n.end <= end);
        if found.is_empty() {
            log::warn!("no highlight found contained in range [{start}, {end})");
        }
        self.clear_highlights(found)
    }

    /// Strips the marker from highlights lying within any of `locations`.
    pub fn clear_highlight_for_locations(
        &mut self,
        locations: &[(usize, usize)],
    ) -> Result<usize, EditorError> {
        let found = self.find_highlights(|n| {
            locations
                .iter()
                .any(|&(start, end)| n.start >= start && n.end <= end)
        });
        self.clear_highlights(found)
    }

    pub fn clear_all_highlights(&mut self) -> Result<usize, EditorError> {
        let found = self.find_highlights(|_| true);
        if found.is_empty() {
            log::warn!("no highlights found");
        }
        self.clear_highlights(found)
    }

    /// Marked tag nodes matching `predicate`, in document order.
    pub fn find_highlights(&self, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.tree.filter(self.tree.root(), |n| {
            n.kind == NodeKind::Tag && self.is_marker(n.host) && predicate(n)
        })
    }

    /// Leaves the wrapper elements in place; only the marker goes.
    fn clear_highlights(&mut self, found: Vec<NodeId>) -> Result<usize, EditorError> {
        if found.is_empty() {
            return Ok(0);
        }
        for &id in &found {
            let host = self.tree.node(id).host;
            self.host
                .remove_attribute(host, &self.options.highlight_attribute);
        }
        self.set_current_position(self.selection.anchor, false)?;
        self.rebuild()?;
        Ok(found.len())
    }

    fn nodes_to_highlight(&self, id: NodeId, start: usize, end: usize) -> Vec<NodeId> {
        let node = self.tree.node(id);
        let outside = node.end <= start || node.start >= end || node.is_empty();
        if outside || node.ignorable || node.kind == NodeKind::Other {
            return Vec::new();
        }
        let inside = start <= node.start && node.end <= end;
        match node.kind {
            NodeKind::Tag if inside && id != self.tree.root() => vec![id],
            NodeKind::Tag => node
                .children
                .iter()
                .flat_map(|&child| self.nodes_to_highlight(child, start, end))
                .collect(),
            _ => vec![id],
        }
    }

    fn highlight_node(&mut self, id: NodeId, start: usize, end: usize) {
        let node = self.tree.node(id);
        let host = node.host;
        if node.kind == NodeKind::Tag {
            self.host
                .set_attribute(host, &self.options.highlight_attribute, "true");
            return;
        }
        let Some(parent) = self.host.parent(host) else {
            return;
        };

        let from = start.max(node.start) - node.start;
        let to = end.min(node.end) - node.start;
        let origin = node.start;
        let text = node.text.clone();
        let (before, rest) = split_chars(&text, from);
        let (infix, after) = split_chars(rest, to - from);

        let mut seeds = Vec::new();
        if !before.is_empty() {
            let pre = self.host.create_text(before);
            self.host.insert_before(parent, pre, Some(host));
            seeds.push(Seed::Text {
                host: pre,
                start: origin,
                text: before.to_string(),
            });
        }

        let marker = self.host.create_element(&self.options.highlight_tag);
        self.host
            .set_attribute(marker, &self.options.highlight_attribute, "true");
        let inner = self.host.create_text(infix);
        self.host.insert_before(marker, inner, None);
        self.host.insert_before(parent, marker, Some(host));
        seeds.push(Seed::Tag {
            host: marker,
            tag: self.options.highlight_tag.clone(),
            start: origin + from,
            end: origin + to,
            children: vec![Seed::Text {
                host: inner,
                start: origin + from,
                text: infix.to_string(),
            }],
        });

        if !after.is_empty() {
            let post = self.host.create_text(after);
            self.host.insert_before(parent, post, Some(host));
            seeds.push(Seed::Text {
                host: post,
                start: origin + to,
                text: after.to_string(),
            });
        }

        self.host.detach(host);
        self.tree.splice(id, seeds);
    }
}
