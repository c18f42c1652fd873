//! Debounced text change detection.
//!
//! Edits only schedule a diff pass. The pass compares the text recorded at
//! the previous pass with the current text and turns the difference into
//! position-addressed insert/remove events.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use similar::{Algorithm, DiffTag, TextDiff};

/// Monotonic time source for the debounce deadline.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock time measured from when the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<Duration>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.0.get()
    }
}

/// Extra information passed along with an edit to the content
/// notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeContext {
    /// Skip the history snapshot for this change (undo, placeholders).
    pub no_snapshot: bool,
    /// Free-form tag identifying who made the edit.
    pub source: Option<String>,
}

impl ChangeContext {
    pub fn no_snapshot() -> Self {
        Self {
            no_snapshot: true,
            source: None,
        }
    }

    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            no_snapshot: false,
            source: Some(source.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextChange {
    Inserted { position: usize, text: String },
    Removed { start: usize, end: usize },
}

/// Character-level diff of `old` against `new`, expressed as events that
/// can be applied in order to `old`.
///
/// Positions are in characters. An insert is reported at the running
/// position and advances it; a removal spans `[pos, pos + len)` and leaves the
/// position where it was, since the removed text is gone afterwards.
pub fn diff_text(old: &str, new: &str) -> Vec<TextChange> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_chars(old, new);
    let new_chars = diff.new_slices();

    let mut changes = Vec::new();
    let mut pos = 0;
    for op in diff.ops() {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => pos += old_range.len(),
            DiffTag::Delete => changes.push(TextChange::Removed {
                start: pos,
                end: pos + old_range.len(),
            }),
            DiffTag::Insert => {
                changes.push(TextChange::Inserted {
                    position: pos,
                    text: new_chars[new_range.clone()].concat(),
                });
                pos += new_range.len();
            }
            DiffTag::Replace => {
                changes.push(TextChange::Removed {
                    start: pos,
                    end: pos + old_range.len(),
                });
                changes.push(TextChange::Inserted {
                    position: pos,
                    text: new_chars[new_range.clone()].concat(),
                });
                pos += new_range.len();
            }
        }
    }
    changes
}

/// Restartable deadline plus the text recorded at the last pass.
#[derive(Debug)]
pub(crate) struct ChangeNotifier {
    debounce: Duration,
    due: Option<Duration>,
    context: ChangeContext,
    recorded: String,
}

impl ChangeNotifier {
    pub(crate) fn new(debounce: Duration, text: String) -> Self {
        Self {
            debounce,
            due: None,
            context: ChangeContext::default(),
            recorded: text,
        }
    }

    /// Cancels any pending pass and starts the quiet interval again.
    ///
    /// A pass that is already pending keeps its earliest source and only
    /// skips the snapshot if every request merged into it asked to.
    pub(crate) fn schedule(&mut self, now: Duration, context: ChangeContext) {
        if self.due.is_some() {
            let pending = &mut self.context;
            pending.no_snapshot &= context.no_snapshot;
            if pending.source.is_none() {
                pending.source = context.source;
            }
        } else {
            self.context = context;
        }
        self.due = Some(now + self.debounce);
    }

    pub(crate) fn due_at(&self) -> Option<Duration> {
        self.due
    }

    /// The pending context if the deadline has passed.
    pub(crate) fn take_due(&mut self, now: Duration) -> Option<ChangeContext> {
        match self.due {
            Some(due) if due <= now => self.take_pending(),
            _ => None,
        }
    }

    pub(crate) fn take_pending(&mut self) -> Option<ChangeContext> {
        self.due.take()?;
        Some(std::mem::take(&mut self.context))
    }

    /// Diffs against the recorded text and records `current`.
    pub(crate) fn run(&mut self, current: &str) -> Vec<TextChange> {
        let changes = diff_text(&self.recorded, current);
        self.recorded = current.to_string();
        changes
    }
}
