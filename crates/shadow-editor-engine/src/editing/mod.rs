/*!
 * # Editing Core
 *
 * [`Editor`] keeps a [`ShadowTree`] in step with a host node tree that both
 * the user and the embedding application mutate.
 *
 * ## Architecture Overview
 *
 * ### 1. The host tree is the source of truth
 * - The editor never stores document content of its own
 * - Every primitive mutates the host first, then rebuilds the shadow tree
 *   wholesale; there is no incremental patching except on the highlight path
 *
 * ### 2. Absolute positions
 * - Callers address the document by character offset into its text content
 * - The position resolver maps an offset onto a text node, synthesizing a
 *   zero-width placeholder where no text exists
 *
 * ### 3. Deferred change events
 * - Primitives only schedule a diff pass; the pass fires after a quiet
 *   interval and reports what changed as insert/remove events
 * - Settled passes feed the bounded undo history
 *
 * ## Module Structure
 *
 * - **`position`**: offset to text node resolution
 * - **`cursor`**: caret placement and selection bookkeeping
 * - **`mutation`**: insert/replace/remove primitives
 * - **`highlight`**: marker-attribute region highlighting
 * - **`components`**: registry of mounted external components
 * - **`notifier`**: debounced text diffing
 * - **`history`**: capped undo snapshots
 * - **`listener`**: consumer notifications
 *
 * ## Usage Pattern
 *
 * ```rust
 * use shadow_editor_engine::{Editor, EditorOptions, EventQueue, MemoryHost};
 *
 * let host = MemoryHost::from_markup("<p>hello world</p>").unwrap();
 * let events = EventQueue::new();
 * let mut editor = Editor::new(host, EditorOptions::default())
 *     .unwrap()
 *     .with_listener(events.clone());
 *
 * editor.insert_text("!", 11).unwrap();
 * editor.flush().unwrap();
 * assert_eq!(editor.text(), "hello world!");
 * assert!(!events.drain().is_empty());
 * ```
 */

pub mod components;
pub mod cursor;
pub mod highlight;
pub mod history;
pub mod listener;
pub mod mutation;
pub mod notifier;
pub mod position;

use std::collections::HashMap;
use std::time::Duration;

use uuid::Uuid;

use crate::EditorError;
use crate::host::{HostId, HostTree};
use crate::shadow::{NodeId, ShadowTree};

pub use components::Component;
pub use cursor::DocumentSelection;
pub use history::{CappedHistory, Snapshot};
pub use listener::{EditorEvent, EditorListener, EventQueue, NullListener};
pub use notifier::{ChangeContext, Clock, ManualClock, SystemClock, TextChange, diff_text};

/// Tunables for an [`Editor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorOptions {
    /// Quiet interval before a scheduled diff pass runs.
    pub debounce: Duration,
    pub history_capacity: usize,
    /// Container created when wrapping a selection.
    pub wrap_tag: String,
    /// Container created when nesting inside a selection.
    pub nest_tag: String,
    /// Inline wrapper for partially highlighted text.
    pub highlight_tag: String,
    /// Boolean marker attribute for highlighted nodes.
    pub highlight_attribute: String,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(320),
            history_capacity: 100,
            wrap_tag: "div".to_string(),
            nest_tag: "span".to_string(),
            highlight_tag: "mark".to_string(),
            highlight_attribute: "data-editor-highlight".to_string(),
        }
    }
}

/// Document model over a host tree.
///
/// Single-writer: every public operation runs to completion, including its
/// rebuild and notifier scheduling, before the next may start.
pub struct Editor<H: HostTree> {
    pub(crate) host: H,
    pub(crate) tree: ShadowTree,
    pub(crate) options: EditorOptions,
    pub(crate) selection: DocumentSelection,
    /// Host text node holding the caret; resolved through the tree on use.
    pub(crate) current: Option<HostId>,
    pub(crate) notifier: notifier::ChangeNotifier,
    pub(crate) history: CappedHistory<Snapshot>,
    /// State as of the last diff pass; pushed to history when the next pass
    /// finds changes.
    pub(crate) settled: Snapshot,
    pub(crate) listener: Box<dyn EditorListener>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) components: HashMap<Uuid, Component>,
}

impl<H: HostTree> Editor<H> {
    pub fn new(host: H, options: EditorOptions) -> Result<Self, EditorError> {
        let tree = ShadowTree::build(&host)?;
        let text = tree.text_content();
        let settled = Snapshot {
            content: host.inner_markup(host.root()),
            selection: DocumentSelection::default(),
        };
        log::debug!("editor created over {} characters", tree.len());

        Ok(Self {
            notifier: notifier::ChangeNotifier::new(options.debounce, text),
            history: CappedHistory::new(options.history_capacity),
            host,
            tree,
            options,
            selection: DocumentSelection::default(),
            current: None,
            settled,
            listener: Box::new(NullListener),
            clock: Box::new(SystemClock::default()),
            components: HashMap::new(),
        })
    }

    pub fn with_listener(mut self, listener: impl EditorListener + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn tree(&self) -> &ShadowTree {
        &self.tree
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn selection(&self) -> DocumentSelection {
        self.selection
    }

    /// Host text node the caret was last placed in.
    pub fn current_node(&self) -> Option<HostId> {
        self.current
    }

    /// Full document text content.
    pub fn text(&self) -> String {
        self.tree.text_content()
    }

    /// Inner markup of the editor root.
    pub fn markup(&self) -> String {
        self.host.inner_markup(self.host.root())
    }

    pub fn history(&self) -> &CappedHistory<Snapshot> {
        &self.history
    }

    /// Rebuilds the shadow tree from the host.
    pub fn rebuild(&mut self) -> Result<(), EditorError> {
        self.tree = ShadowTree::build(&self.host)?;
        Ok(())
    }

    /// Shadow node for `host`, rebuilding once if the tree has drifted.
    pub(crate) fn shadow_for(&mut self, host: HostId) -> Result<NodeId, EditorError> {
        if let Some(id) = self.tree.lookup(host) {
            return Ok(id);
        }
        log::warn!("no shadow node for {host:?}, rebuilding and retrying");
        self.rebuild()?;
        self.tree
            .lookup(host)
            .ok_or(EditorError::MissingShadowNode(host))
    }

    pub(crate) fn current_shadow(&self) -> Option<NodeId> {
        self.current.and_then(|host| self.tree.lookup(host))
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            content: self.markup(),
            selection: self.selection,
        }
    }

    /// Starts (or restarts) the quiet interval before the next diff pass.
    pub fn schedule_diff(&mut self, context: ChangeContext) {
        let now = self.clock.now();
        self.notifier.schedule(now, context);
    }

    pub fn diff_pending(&self) -> bool {
        self.notifier.due_at().is_some()
    }

    pub fn diff_due_at(&self) -> Option<Duration> {
        self.notifier.due_at()
    }

    /// Runs the scheduled diff pass if its quiet interval has elapsed.
    /// Returns whether a pass ran.
    pub fn poll(&mut self) -> Result<bool, EditorError> {
        let now = self.clock.now();
        match self.notifier.take_due(now) {
            Some(context) => {
                self.run_diff(context)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs any scheduled diff pass immediately.
    pub fn flush(&mut self) -> Result<bool, EditorError> {
        match self.notifier.take_pending() {
            Some(context) => {
                self.run_diff(context)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn run_diff(&mut self, context: ChangeContext) -> Result<(), EditorError> {
        self.rebuild()?;
        let current = self.tree.text_content();
        let changes = self.notifier.run(&current);

        for change in &changes {
            match change {
                TextChange::Inserted { position, text } => {
                    self.listener.text_insert(*position, text, &context)
                }
                TextChange::Removed { start, end } => {
                    self.listener.text_remove(*start, *end, &context)
                }
            }
        }

        let snapshot = self.snapshot();
        let previous = std::mem::replace(&mut self.settled, snapshot);
        if !changes.is_empty() {
            log::debug!("diff pass found {} changes", changes.len());
            if !context.no_snapshot {
                self.history.push(previous);
            }
            self.listener.handle_full_content_update(&context);
        }
        Ok(())
    }

    /// Restores the most recent history snapshot.
    pub fn undo(&mut self) -> Result<(), EditorError> {
        let Some(snapshot) = self.history.pop() else {
            log::warn!("no more history to undo");
            return Ok(());
        };
        let root = self.host.root();
        self.host.set_inner_markup(root, &snapshot.content)?;
        self.rebuild()?;
        self.current = None;
        self.selection = snapshot.selection;
        self.set_current_position(snapshot.selection.anchor, true)?;
        // The restore supersedes any pending edit, so only its context applies.
        self.notifier.take_pending();
        self.schedule_diff(ChangeContext::no_snapshot());
        Ok(())
    }
}
