use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::DocumentSelection;
use super::notifier::ChangeContext;

/// Notifications the editor sends to whoever embeds it.
///
/// Every method has a default body, so a consumer only implements what it
/// cares about. Unhandled notifications are logged.
pub trait EditorListener {
    fn text_insert(&mut self, position: usize, text: &str, _context: &ChangeContext) {
        log::warn!("text inserted at {position} ({text:?}) but no listener handles it");
    }

    fn text_remove(&mut self, start: usize, end: usize, _context: &ChangeContext) {
        log::debug!("unhandled text_remove [{start}, {end})");
    }

    fn selection_update(&mut self, selection: &DocumentSelection) {
        log::debug!("unhandled selection_update {selection:?}");
    }

    fn element_update(&mut self) {
        log::debug!("unhandled element_update");
    }

    fn handle_full_content_update(&mut self, context: &ChangeContext) {
        log::debug!("unhandled handle_full_content_update {context:?}");
    }
}

/// Listener that handles nothing.
#[derive(Debug, Default)]
pub struct NullListener;

impl EditorListener for NullListener {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    TextInserted { position: usize, text: String },
    TextRemoved { start: usize, end: usize },
    SelectionUpdated(DocumentSelection),
    ElementUpdated,
    ContentUpdated(ChangeContext),
}

/// Listener that records every notification for later inspection.
///
/// Clones share the same queue, so one clone can be handed to the editor
/// while the other is drained.
#[derive(Debug, Clone, Default)]
pub struct EventQueue(Rc<RefCell<VecDeque<EditorEvent>>>);

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<EditorEvent> {
        self.0.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    fn push(&self, event: EditorEvent) {
        self.0.borrow_mut().push_back(event);
    }
}

impl EditorListener for EventQueue {
    fn text_insert(&mut self, position: usize, text: &str, _context: &ChangeContext) {
        self.push(EditorEvent::TextInserted {
            position,
            text: text.to_string(),
        });
    }

    fn text_remove(&mut self, start: usize, end: usize, _context: &ChangeContext) {
        self.push(EditorEvent::TextRemoved { start, end });
    }

    fn selection_update(&mut self, selection: &DocumentSelection) {
        self.push(EditorEvent::SelectionUpdated(*selection));
    }

    fn element_update(&mut self) {
        self.push(EditorEvent::ElementUpdated);
    }

    fn handle_full_content_update(&mut self, context: &ChangeContext) {
        self.push(EditorEvent::ContentUpdated(context.clone()));
    }
}
