use crate::EditorError;
use crate::host::{HostId, HostKind, HostTree, INVISIBLE_SPACE};
use crate::shadow::NodeKind;

use super::{ChangeContext, Editor};

/// Absolute selection, in characters. A caret when both ends coincide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DocumentSelection {
    pub anchor: usize,
    pub focus: usize,
}

impl DocumentSelection {
    pub fn caret(position: usize) -> Self {
        Self {
            anchor: position,
            focus: position,
        }
    }

    pub fn is_caret(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn start(&self) -> usize {
        self.anchor.min(self.focus)
    }

    pub fn end(&self) -> usize {
        self.anchor.max(self.focus)
    }
}

impl<H: HostTree> Editor<H> {
    /// Places the caret at a host point.
    ///
    /// For a text node `offset` counts characters. For an element it counts
    /// children: the caret goes to the start of the text child at `offset`,
    /// else to the end of the text child before it, else into a new
    /// placeholder text node at that slot.
    pub fn set_carret(
        &mut self,
        node: HostId,
        offset: usize,
        notify: bool,
    ) -> Result<(), EditorError> {
        match self.host.kind(node) {
            Some(HostKind::Text) => {
                let id = self.shadow_for(node)?;
                let length = self.tree.node(id).len();
                if offset > length {
                    log::warn!("caret offset {offset} beyond text node of length {length}");
                }
                self.place_caret(node, offset.min(length), notify)
            }
            Some(HostKind::Element) => {
                let children = self.host.children(node).to_vec();
                if offset > children.len() {
                    log::warn!(
                        "invalid caret offset {offset} for element with {} children",
                        children.len()
                    );
                    return Ok(());
                }
                let is_text = |host: &H, child: HostId| {
                    host.kind(child) == Some(HostKind::Text) && !host.is_ignorable(child)
                };

                if let Some(&after) = children.get(offset).filter(|&&c| is_text(&self.host, c)) {
                    return self.place_caret(after, 0, notify);
                }
                if let Some(&before) = offset
                    .checked_sub(1)
                    .and_then(|i| children.get(i))
                    .filter(|&&c| is_text(&self.host, c))
                {
                    let length = self.host.text(before).map_or(0, crate::host::char_len);
                    return self.place_caret(before, length, notify);
                }

                let reference = children.get(offset).copied();
                let placeholder = self.insert_placeholder(node, reference, None)?;
                self.place_caret(placeholder, 0, notify)
            }
            Some(HostKind::Other) => Err(EditorError::UnclassifiableNode(node)),
            None => Err(EditorError::DetachedNode(node)),
        }
    }

    /// Moves the caret to absolute position `position`, clamped to the
    /// document.
    pub fn set_current_position(
        &mut self,
        position: usize,
        notify: bool,
    ) -> Result<(), EditorError> {
        let position = self.clamp_position(position);
        let id = self.find_suitable_node_for_position(position)?;
        let node = self.tree.node(id);
        let local = position.saturating_sub(node.start).min(node.len());
        let host = node.host;
        self.set_carret(host, local, notify)
    }

    /// Absolute position of a host selection point.
    pub fn calculate_position(
        &mut self,
        node: HostId,
        offset: usize,
    ) -> Result<usize, EditorError> {
        let id = self.shadow_for(node)?;
        let shadow = self.tree.node(id);
        match shadow.kind {
            NodeKind::Text => Ok(shadow.start + offset.min(shadow.len())),
            NodeKind::Tag => match shadow.children.get(offset) {
                Some(&child) => Ok(self.tree.node(child).start),
                None => {
                    if offset > shadow.children.len() {
                        log::warn!(
                            "offset {offset} is invalid for a tag with {} children",
                            shadow.children.len()
                        );
                    }
                    Ok(shadow.end)
                }
            },
            NodeKind::Other => Err(EditorError::UnclassifiableNode(node)),
        }
    }

    /// Re-reads the host selection after input the editor did not perform
    /// itself.
    pub fn update_selection_after_complex_input(&mut self) -> Result<(), EditorError> {
        let Some(range) = self.host.selection() else {
            log::warn!("no host selection found");
            return Ok(());
        };
        if !self.host.is_attached(range.start.node) || !self.host.is_attached(range.end.node) {
            log::warn!("host selection lies outside the editor");
            return Ok(());
        }

        if range.is_collapsed() {
            return self.set_carret(range.start.node, range.start.offset, true);
        }
        let anchor = self.calculate_position(range.start.node, range.start.offset)?;
        let focus = self.calculate_position(range.end.node, range.end.offset)?;
        self.current = None;
        self.selection = DocumentSelection { anchor, focus };
        self.listener.selection_update(&self.selection);
        Ok(())
    }

    /// Caret offset inside the current node, if there is one.
    pub fn relative_cursor_position(&self) -> Option<usize> {
        let node = self.tree.node(self.current_shadow()?);
        Some(self.selection.anchor.saturating_sub(node.start).min(node.len()))
    }

    pub(crate) fn clamp_position(&self, position: usize) -> usize {
        let length = self.tree.len();
        if position > length {
            log::warn!("position {position} is outside the document [0, {length}], clamping");
            length
        } else {
            position
        }
    }

    /// Inserts a zero-width text node under `parent` before `reference`,
    /// optionally detaching `replaces`, and rebuilds.
    pub(crate) fn insert_placeholder(
        &mut self,
        parent: HostId,
        reference: Option<HostId>,
        replaces: Option<HostId>,
    ) -> Result<HostId, EditorError> {
        let placeholder = self.host.create_text(&INVISIBLE_SPACE.to_string());
        self.host.insert_before(parent, placeholder, reference);
        if let Some(old) = replaces {
            self.host.detach(old);
        }
        self.rebuild()?;
        self.schedule_diff(ChangeContext::no_snapshot());
        Ok(placeholder)
    }

    fn place_caret(
        &mut self,
        text: HostId,
        offset: usize,
        notify: bool,
    ) -> Result<(), EditorError> {
        let id = self.shadow_for(text)?;
        let position = self.tree.node(id).start + offset;
        self.current = Some(text);
        self.selection = DocumentSelection::caret(position);
        self.host.place_caret(text, offset);
        if notify {
            self.listener.selection_update(&self.selection);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{EditorEvent, EditorOptions, EventQueue};
    use crate::host::{HostPoint, HostRange, MemoryHost};
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

    #[test]
    fn caret_in_text_node() {
        let (mut editor, events) = editor("<p>ab</p><p>cd</p>");
        let second = editor.host().children(editor.host().root())[1];
        let text = editor.host().children(second)[0];

        editor.set_carret(text, 1, true).unwrap();
        assert_eq!(editor.selection(), DocumentSelection::caret(3));
        assert_eq!(editor.current_node(), Some(text));
        assert_eq!(
            editor.host().selection(),
            Some(HostRange::collapsed(HostPoint::new(text, 1)))
        );
        assert_eq!(
            events.drain(),
            vec![EditorEvent::SelectionUpdated(DocumentSelection::caret(3))]
        );
    }

    #[test]
    fn element_offsets_prefer_following_then_preceding_text() {
        let (mut editor, _) = editor("a<b>x</b>c");
        let root = editor.host().root();

        editor.set_carret(root, 2, false).unwrap();
        assert_eq!(editor.selection(), DocumentSelection::caret(2));

        editor.set_carret(root, 3, false).unwrap();
        assert_eq!(editor.selection(), DocumentSelection::caret(3));
        assert_eq!(editor.markup(), "a<b>x</b>c");
    }

    #[test]
    fn element_without_text_gets_a_placeholder() {
        let (mut editor, _) = editor("<b>x</b><i>y</i>");
        let root = editor.host().root();

        editor.set_carret(root, 1, false).unwrap();
        assert_eq!(editor.markup(), "<b>x</b>\u{200B}<i>y</i>");
        assert_eq!(editor.selection(), DocumentSelection::caret(1));
        assert!(editor.diff_pending());
    }

    #[test]
    fn calculate_position_for_tags() {
        let (mut editor, _) = editor("a<b>x</b>c");
        let root = editor.host().root();
        assert_eq!(editor.calculate_position(root, 1).unwrap(), 1);
        assert_eq!(editor.calculate_position(root, 3).unwrap(), 3);
        assert_eq!(editor.calculate_position(root, 9).unwrap(), 3);
    }

    #[test]
    fn complex_input_reads_range_selection() {
        let (mut editor, events) = editor("<p>abc</p><p>def</p>");
        let root = editor.host().root();
        let first = editor.host().children(editor.host().children(root)[0])[0];
        let second = editor.host().children(editor.host().children(root)[1])[0];
        editor.host.set_selection(Some(HostRange {
            start: HostPoint::new(first, 1),
            end: HostPoint::new(second, 2),
        }));

        editor.update_selection_after_complex_input().unwrap();
        let expected = DocumentSelection { anchor: 1, focus: 5 };
        assert_eq!(editor.selection(), expected);
        assert_eq!(editor.current_node(), None);
        assert_eq!(events.drain(), vec![EditorEvent::SelectionUpdated(expected)]);
    }

    #[test]
    fn relative_cursor_position_tracks_current_node() {
        let (mut editor, _) = editor("<p>ab</p><p>cdef</p>");
        editor.set_current_position(4, false).unwrap();
        assert_eq!(editor.relative_cursor_position(), Some(2));
    }

    #[test]
    fn other_nodes_are_rejected() {
        let (mut editor, _) = editor("a<!-- c -->");
        let comment = editor.host().children(editor.host().root())[1];
        assert!(matches!(
            editor.set_carret(comment, 0, false),
            Err(EditorError::UnclassifiableNode(_))
        ));
    }
}
