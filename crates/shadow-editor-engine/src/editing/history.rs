use std::collections::VecDeque;

use super::DocumentSelection;

/// Serialized editor state restored by undo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Inner markup of the editor root.
    pub content: String,
    pub selection: DocumentSelection,
}

/// Bounded LIFO of snapshots. Pushing onto a full history evicts the oldest
/// entry.
#[derive(Debug, Clone)]
pub struct CappedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> CappedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Removes and returns the most recent entry.
    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_back()
    }

    pub fn peek(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entry_is_evicted() {
        let mut history = CappedHistory::new(3);
        for n in 1..=4 {
            history.push(n);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.pop(), Some(4));
        assert_eq!(history.pop(), Some(3));
        assert_eq!(history.pop(), Some(2));
        assert_eq!(history.pop(), None);
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = CappedHistory::new(0);
        history.push("a");
        assert!(history.is_empty());
    }
}
