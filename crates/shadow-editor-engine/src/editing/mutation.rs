//! Text and subtree mutation primitives.
//!
//! Each primitive edits the host, rebuilds the shadow tree, puts the caret
//! back somewhere sensible and schedules a diff pass. Markup is parsed before
//! anything is touched, so a malformed fragment leaves the document as it was.

use crate::EditorError;
use crate::host::{
    HostId, HostKind, HostTree, INVISIBLE_SPACE, NON_BREAKING_SPACE, char_len, split_chars,
};
use crate::shadow::NodeId;

use super::{ChangeContext, Editor};

enum MarkerEdge {
    Before(HostId),
    After(HostId),
}

impl<H: HostTree> Editor<H> {
    /// Inserts `text` at absolute `position` and moves the caret after it.
    ///
    /// Highlight markers do not grow at their edges: text typed at either end
    /// of a marker lands just outside it. A space typed after another space
    /// becomes a non-breaking space.
    pub fn insert_text(&mut self, text: &str, position: usize) -> Result<(), EditorError> {
        if text.is_empty() {
            return Ok(());
        }
        let position = self.clamp_position(position);
        let id = self.find_suitable_node_for_position(position)?;
        let node = self.tree.node(id);
        let host = node.host;
        let local = position.clamp(node.start, node.end) - node.start;

        let text = if text == " " && self.preceding_char(id, local).is_some_and(is_space) {
            NON_BREAKING_SPACE.to_string()
        } else {
            text.to_string()
        };
        let inserted = char_len(&text);

        let (target, caret) = match self.marker_edge(id, local) {
            Some(MarkerEdge::After(marker)) => {
                let next = self.host.next_sibling(marker);
                match next.filter(|&n| self.is_text(n)) {
                    Some(next) => {
                        self.splice_text(next, 0, &text);
                        (next, inserted)
                    }
                    None => (self.text_beside(marker, next, &text)?, inserted),
                }
            }
            Some(MarkerEdge::Before(marker)) => match self.host.previous_sibling(marker) {
                Some(previous) if self.is_text(previous) => {
                    let length = self.host.text(previous).map_or(0, char_len);
                    self.splice_text(previous, length, &text);
                    (previous, length + inserted)
                }
                _ => (self.text_beside(marker, Some(marker), &text)?, inserted),
            },
            None => {
                self.splice_text(host, local, &text);
                (host, local + inserted)
            }
        };

        self.rebuild()?;
        self.set_carret(target, caret, true)?;
        self.schedule_diff(ChangeContext::default());
        Ok(())
    }

    /// Replaces the text in `[start, end)` with parsed `markup` and returns
    /// the inserted top-level nodes.
    ///
    /// A text node always follows the inserted content so the caret has
    /// somewhere to go; it ends up at `start` plus the inserted text length.
    pub fn replace_text_with_html(
        &mut self,
        start: usize,
        end: usize,
        markup: &str,
        context: ChangeContext,
    ) -> Result<Vec<HostId>, EditorError> {
        let (start, end) = (start.min(end), start.max(end));
        let (start, end) = (self.clamp_position(start), self.clamp_position(end));
        let fresh = self.host.parse_fragment(markup)?;

        self.remove_text_range(start, end)?;
        let anchor_id = self.find_suitable_node_for_position(start)?;
        let anchor = self.tree.node(anchor_id);
        let anchor_host = anchor.host;
        let local = start.clamp(anchor.start, anchor.end) - anchor.start;
        let parent = self
            .host
            .parent(anchor_host)
            .ok_or(EditorError::DetachedNode(anchor_host))?;

        let content = self.host.text(anchor_host).unwrap_or_default().to_string();
        let (left, right) = split_chars(&content, local);
        self.host.set_text(anchor_host, left);
        let reference = self.host.next_sibling(anchor_host);
        if !right.is_empty() {
            let tail = self.host.create_text(right);
            self.host.insert_before(parent, tail, reference);
        }
        let reference = self.host.next_sibling(anchor_host);
        for &node in &fresh {
            self.host.insert_before(parent, node, reference);
        }

        let inserted: usize = fresh
            .iter()
            .map(|&node| char_len(&self.host.text_content(node)))
            .sum();
        match fresh.last() {
            Some(&last) => {
                let trailing = self.ensure_trailing_anchor(parent, last);
                self.rebuild()?;
                self.current = Some(trailing);
            }
            None => self.rebuild()?,
        }
        self.set_current_position(start + inserted, true)?;
        self.schedule_diff(context);
        self.listener.element_update();
        Ok(fresh)
    }

    /// Puts parsed `markup` where `node` was.
    ///
    /// The caret stays put unless it was inside `node` or
    /// `place_cursor_after` is set, in which case it moves to the text anchor
    /// following the new content. Returns the inserted nodes plus that
    /// anchor.
    pub fn replace_node_with_html(
        &mut self,
        node: HostId,
        markup: &str,
        place_cursor_after: bool,
        context: ChangeContext,
    ) -> Result<Vec<HostId>, EditorError> {
        let parent = self.removable_parent(node)?;
        self.shadow_for(node)?;
        let fresh = self.host.parse_fragment(markup)?;

        let current = self.current;
        let relative = self.relative_cursor_position();
        let cursor_inside = current.is_some_and(|c| self.host.contains(node, c));
        if !place_cursor_after && cursor_inside {
            log::warn!("current node is replaced, the caret will move after the new content");
        }

        let reference = self.host.next_sibling(node);
        for &new in &fresh {
            self.host.insert_before(parent, new, reference);
        }
        let trailing = self.ensure_trailing_anchor(parent, fresh.last().copied().unwrap_or(node));
        self.host.detach(node);
        self.rebuild()?;
        self.schedule_diff(context);

        match current.zip(relative) {
            Some((current, relative)) if !place_cursor_after && !cursor_inside => {
                self.set_carret(current, relative, true)?
            }
            _ => self.set_carret(trailing, 0, true)?,
        }

        let mut nodes = fresh;
        if !nodes.contains(&trailing) {
            nodes.push(trailing);
        }
        Ok(nodes)
    }

    /// Detaches `node`. A caret inside it moves to the end of the closest
    /// preceding text node.
    pub fn remove_node(&mut self, node: HostId, context: ChangeContext) -> Result<(), EditorError> {
        self.removable_parent(node)?;
        let id = self.shadow_for(node)?;
        let start = self.tree.node(id).start;

        let current = self.current;
        let relative = self.relative_cursor_position();
        let cursor_inside = current.is_none_or(|c| self.host.contains(node, c));
        let target = if cursor_inside {
            self.tree.previous_text_leaf(id).map(|previous| {
                let previous = self.tree.node(previous);
                (previous.host, previous.len())
            })
        } else {
            current.zip(relative)
        };

        self.host.detach(node);
        self.rebuild()?;
        self.schedule_diff(context);

        match target {
            Some((text, offset)) => self.set_carret(text, offset, true),
            None => self.set_current_position(start, true),
        }
    }

    /// Inserts parsed `markup` as the first children of `node`. Cursor rules
    /// follow [`Editor::replace_node_with_html`].
    pub fn prepend_children_html(
        &mut self,
        node: HostId,
        markup: &str,
        place_cursor_after: bool,
        context: ChangeContext,
    ) -> Result<Vec<HostId>, EditorError> {
        if !self.host.is_attached(node) {
            return Err(EditorError::DetachedNode(node));
        }
        if self.host.kind(node) != Some(HostKind::Element) {
            log::warn!("cannot prepend children to non-element {node:?}");
            return Ok(Vec::new());
        }
        let fresh = self.host.parse_fragment(markup)?;
        let Some(&last) = fresh.last() else {
            return Ok(Vec::new());
        };

        let current = self.current;
        let relative = self.relative_cursor_position();
        let first = self.host.first_child(node);
        for &new in &fresh {
            self.host.insert_before(node, new, first);
        }
        let trailing = self.ensure_trailing_anchor(node, last);
        self.rebuild()?;
        self.schedule_diff(context);

        match current.zip(relative) {
            Some((current, relative)) if !place_cursor_after && self.host.is_attached(current) => {
                self.set_carret(current, relative, true)?
            }
            _ => self.set_carret(trailing, 0, true)?,
        }

        let mut nodes = fresh;
        if !nodes.contains(&trailing) {
            nodes.push(trailing);
        }
        Ok(nodes)
    }

    /// Runs an arbitrary host mutation and brings the editor back in step.
    pub fn external_dom_update(
        &mut self,
        description: &str,
        update: impl FnOnce(&mut H),
    ) -> Result<(), EditorError> {
        log::debug!("executing an external host update: {description}");
        update(&mut self.host);
        self.rebuild()?;
        self.update_selection_after_complex_input()?;
        self.listener.element_update();
        self.schedule_diff(ChangeContext::default());
        Ok(())
    }

    /// Deletes the characters in `[start, end)`, dropping text nodes that
    /// become empty.
    pub(crate) fn remove_text_range(
        &mut self,
        start: usize,
        end: usize,
    ) -> Result<(), EditorError> {
        if start >= end {
            return Ok(());
        }
        let cuts: Vec<(HostId, String)> = self
            .tree
            .text_leaves()
            .into_iter()
            .map(|id| self.tree.node(id))
            .filter(|n| n.start < end && n.end > start)
            .map(|n| {
                let from = start.max(n.start) - n.start;
                let to = end.min(n.end) - n.start;
                let kept: String = n
                    .text
                    .chars()
                    .enumerate()
                    .filter(|(i, _)| *i < from || *i >= to)
                    .map(|(_, c)| c)
                    .collect();
                (n.host, kept)
            })
            .collect();

        for (host, kept) in cuts {
            if kept.is_empty() {
                self.host.detach(host);
            } else {
                self.host.set_text(host, &kept);
            }
        }
        self.rebuild()
    }

    /// The text node right after `last`, creating a placeholder when the
    /// next sibling is missing or not text.
    fn ensure_trailing_anchor(&mut self, parent: HostId, last: HostId) -> HostId {
        let next = self.host.next_sibling(last);
        if let Some(next) = next.filter(|&n| self.host.kind(n) == Some(HostKind::Text)) {
            return next;
        }
        let anchor = self.host.create_text(&INVISIBLE_SPACE.to_string());
        self.host.insert_before(parent, anchor, next);
        anchor
    }

    fn removable_parent(&self, node: HostId) -> Result<HostId, EditorError> {
        if node == self.host.root() {
            return Err(EditorError::RootNode(node));
        }
        if !self.host.is_attached(node) {
            return Err(EditorError::DetachedNode(node));
        }
        self.host.parent(node).ok_or(EditorError::DetachedNode(node))
    }

    fn marker_edge(&self, id: NodeId, local: usize) -> Option<MarkerEdge> {
        let node = self.tree.node(id);
        let marker = self.host.parent(node.host)?;
        if marker == self.host.root() || !self.is_marker(marker) {
            return None;
        }
        let siblings = self.host.children(marker);
        if local == node.len() && siblings.last() == Some(&node.host) {
            Some(MarkerEdge::After(marker))
        } else if local == 0 && siblings.first() == Some(&node.host) {
            Some(MarkerEdge::Before(marker))
        } else {
            None
        }
    }

    pub(crate) fn is_marker(&self, node: HostId) -> bool {
        self.host.attribute(node, &self.options.highlight_attribute) == Some("true")
    }

    fn is_text(&self, node: HostId) -> bool {
        self.host.kind(node) == Some(HostKind::Text) && !self.host.is_ignorable(node)
    }

    fn preceding_char(&self, id: NodeId, local: usize) -> Option<char> {
        if local > 0 {
            return self.tree.node(id).text.chars().nth(local - 1);
        }
        let previous = self.tree.previous_text_leaf(id)?;
        self.tree.node(previous).text.chars().last()
    }

    fn splice_text(&mut self, node: HostId, at: usize, text: &str) {
        let content = self.host.text(node).unwrap_or_default();
        let (left, right) = split_chars(content, at);
        let joined = format!("{left}{text}{right}");
        self.host.set_text(node, &joined);
    }

    /// New text node next to `marker`, under the marker's parent.
    fn text_beside(
        &mut self,
        marker: HostId,
        reference: Option<HostId>,
        text: &str,
    ) -> Result<HostId, EditorError> {
        let parent = self
            .host
            .parent(marker)
            .ok_or(EditorError::DetachedNode(marker))?;
        let node = self.host.create_text(text);
        self.host.insert_before(parent, node, reference);
        Ok(node)
    }
}

fn is_space(c: char) -> bool {
    c == ' ' || c == NON_BREAKING_SPACE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{DocumentSelection, EditorEvent, EditorOptions, EventQueue};
    use crate::host::MemoryHost;
    use pretty_assertions::assert_eq;

    fn editor(markup: &str) -> (Editor<MemoryHost>, EventQueue) {
        let events = EventQueue::new();
        let editor = Editor::new(
            MemoryHost::from_markup(markup).unwrap(),
            EditorOptions::default(),
        )
        .unwrap()
        .with_listener(events.clone());
        (editor, events)
    }

    fn child(editor: &Editor<MemoryHost>, path: &[usize]) -> HostId {
        path.iter().fold(editor.host().root(), |node, &index| {
            editor.host().children(node)[index]
        })
    }

    #[test]
    fn insert_text_moves_the_caret_after_the_text() {
        let (mut editor, _) = editor("<p>held</p>");
        editor.insert_text("llo wor", 3).unwrap();
        assert_eq!(editor.text(), "helllo word");
        assert_eq!(editor.selection(), DocumentSelection::caret(10));
        assert!(editor.diff_pending());
    }

    #[test]
    fn second_space_becomes_non_breaking() {
        let (mut editor, _) = editor("<p>a</p>");
        editor.insert_text(" ", 1).unwrap();
        editor.insert_text(" ", 2).unwrap();
        editor.insert_text(" ", 3).unwrap();
        assert_eq!(editor.text(), "a \u{a0}\u{a0}");
    }

    #[test]
    fn typing_at_marker_edges_stays_outside() {
        let (mut editor, _) = editor(r#"a<mark data-editor-highlight="true">bc</mark>"#);
        editor.insert_text("X", 3).unwrap();
        editor.insert_text("Y", 1).unwrap();
        insta::assert_snapshot!(
            editor.markup(),
            @r#"aY<mark data-editor-highlight="true">bc</mark>X"#
        );
        assert_eq!(editor.selection(), DocumentSelection::caret(2));
    }

    #[test]
    fn typing_inside_a_marker_extends_it() {
        let (mut editor, _) = editor(r#"<mark data-editor-highlight="true">bc</mark>"#);
        editor.insert_text("X", 1).unwrap();
        assert_eq!(
            editor.markup(),
            r#"<mark data-editor-highlight="true">bXc</mark>"#
        );
    }

    #[test]
    fn replace_text_with_html_splits_and_anchors() {
        let (mut editor, events) = editor("<p>hello world</p>");
        let nodes = editor
            .replace_text_with_html(6, 11, "<b>there</b>", ChangeContext::default())
            .unwrap();
        assert_eq!(nodes.len(), 1);
        insta::assert_snapshot!(editor.markup(), @"<p>hello <b>there</b>\u{200B}</p>");
        assert_eq!(editor.selection(), DocumentSelection::caret(11));
        assert!(events.drain().contains(&EditorEvent::ElementUpdated));
    }

    #[test]
    fn replace_text_with_html_keeps_following_text() {
        let (mut editor, _) = editor("<p>abcd</p>");
        editor
            .replace_text_with_html(1, 2, "<i>X</i>", ChangeContext::default())
            .unwrap();
        assert_eq!(editor.markup(), "<p>a<i>X</i>cd</p>");
        assert_eq!(editor.selection(), DocumentSelection::caret(2));
    }

    #[test]
    fn replace_text_with_html_across_nodes() {
        let (mut editor, _) = editor("<p>ab</p><p>cd</p>");
        editor
            .replace_text_with_html(1, 3, "-", ChangeContext::default())
            .unwrap();
        assert_eq!(editor.text(), "a-d");
        // Position 1 resolves to the start of the second paragraph.
        assert_eq!(editor.markup(), "<p>a</p><p>-d</p>");
    }

    #[test]
    fn malformed_markup_leaves_the_document_alone() {
        let (mut editor, _) = editor("<p>abcd</p>");
        let result = editor.replace_text_with_html(0, 2, "<b>x</i>", ChangeContext::default());
        assert!(matches!(result, Err(EditorError::Markup(_))));
        assert_eq!(editor.markup(), "<p>abcd</p>");
    }

    #[test]
    fn replace_node_keeps_an_unrelated_caret() {
        let (mut editor, _) = editor("<p>abc</p><p>def</p>");
        editor.set_current_position(5, false).unwrap();
        let first = child(&editor, &[0]);

        editor
            .replace_node_with_html(first, "<h1>title</h1>", false, ChangeContext::default())
            .unwrap();
        assert_eq!(editor.markup(), "<h1>title</h1>\u{200B}<p>def</p>");
        // "de|f" moved with its text node.
        assert_eq!(editor.selection(), DocumentSelection::caret(8));
    }

    #[test]
    fn replace_node_moves_a_caret_inside_it() {
        let (mut editor, _) = editor("<p>abc</p>tail");
        editor.set_current_position(1, false).unwrap();
        let first = child(&editor, &[0]);

        let nodes = editor
            .replace_node_with_html(first, "<p>xy</p>", false, ChangeContext::default())
            .unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(editor.markup(), "<p>xy</p>tail");
        assert_eq!(editor.selection(), DocumentSelection::caret(2));
    }

    #[test]
    fn root_cannot_be_replaced() {
        let (mut editor, _) = editor("x");
        let root = editor.host().root();
        assert!(matches!(
            editor.replace_node_with_html(root, "y", false, ChangeContext::default()),
            Err(EditorError::RootNode(_))
        ));
    }

    #[test]
    fn remove_node_moves_caret_to_previous_text() {
        let (mut editor, _) = editor("<p>ab</p><p>cd</p>");
        editor.set_current_position(3, false).unwrap();
        let second = child(&editor, &[1]);

        editor.remove_node(second, ChangeContext::default()).unwrap();
        assert_eq!(editor.markup(), "<p>ab</p>");
        assert_eq!(editor.selection(), DocumentSelection::caret(2));
    }

    #[test]
    fn remove_node_keeps_an_unrelated_caret() {
        let (mut editor, _) = editor("<p>ab</p><p>cd</p>");
        editor.set_current_position(3, false).unwrap();
        let first = child(&editor, &[0]);

        editor.remove_node(first, ChangeContext::default()).unwrap();
        assert_eq!(editor.text(), "cd");
        assert_eq!(editor.selection(), DocumentSelection::caret(1));
    }

    #[test]
    fn prepend_children_keeps_the_caret_by_default() {
        let (mut editor, _) = editor("<p>ab</p>");
        editor.set_current_position(1, false).unwrap();
        let p = child(&editor, &[0]);

        editor
            .prepend_children_html(p, "<b>x</b>", false, ChangeContext::default())
            .unwrap();
        assert_eq!(editor.markup(), "<p><b>x</b>ab</p>");
        assert_eq!(editor.selection(), DocumentSelection::caret(2));

        editor
            .prepend_children_html(p, "<i>y</i>", true, ChangeContext::default())
            .unwrap();
        assert_eq!(editor.markup(), "<p><i>y</i>\u{200B}<b>x</b>ab</p>");
        assert_eq!(editor.selection(), DocumentSelection::caret(1));
    }

    #[test]
    fn external_update_resyncs_the_tree() {
        let (mut editor, events) = editor("<p>ab</p>");
        editor
            .external_dom_update("append text", |host| {
                let p = host.children(host.root())[0];
                let text = host.create_text("cd");
                host.insert_before(p, text, None);
                host.place_caret(text, 2);
            })
            .unwrap();
        assert_eq!(editor.text(), "abcd");
        assert_eq!(editor.selection(), DocumentSelection::caret(4));
        let events = events.drain();
        assert_eq!(events.last(), Some(&EditorEvent::ElementUpdated));
    }
}
