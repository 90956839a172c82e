//! # History Store
//!
//! Undo/redo over whole-state snapshots.
//!
//! The history is a sequence of snapshots plus a cursor pointing at the
//! present one. Edits go through [`History::push_producer`], which derives a
//! draft from the present snapshot, lets the caller mutate it, and records it
//! only when it actually differs. Snapshots are full clones, so each edit
//! costs O(state size); that is fine for workflows of a few hundred nodes.

use std::convert::Infallible;

/// Default number of snapshots kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Bounded undo/redo history of `S` snapshots.
///
/// Invariants:
/// - the sequence is never empty and `cursor < len`;
/// - recording after an undo discards every redo entry;
/// - `len <= max_entries`, evicting the oldest snapshot first.
#[derive(Clone, Debug)]
pub struct History<S> {
    entries: Vec<S>,
    cursor: usize,
    max_entries: usize,
}

impl<S: Clone + PartialEq + Default> Default for History<S> {
    fn default() -> Self {
        Self::new(S::default(), DEFAULT_HISTORY_LIMIT)
    }
}

impl<S: Clone + PartialEq> History<S> {
    /// Creates a history holding only `initial`.
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn new(initial: S, max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        let mut entries = Vec::with_capacity(max_entries.min(64));
        entries.push(initial);
        Self {
            entries,
            cursor: 0,
            max_entries,
        }
    }

    /// Resets the history to a single entry. The previous timeline is discarded
    /// and cannot be undone into.
    pub fn push_snapshot(&mut self, snapshot: S) {
        self.entries.clear();
        self.entries.push(snapshot);
        self.cursor = 0;
    }

    /// Resets the history when a different document is loaded.
    ///
    /// Same effect as [`History::push_snapshot`]; kept separate so call sites read
    /// as "load" rather than "initialize".
    pub fn replace(&mut self, snapshot: S) {
        self.push_snapshot(snapshot);
    }

    /// Applies `mutator` to a draft of the present snapshot and records the result.
    ///
    /// Returns `true` when a new entry was recorded, `false` when the draft was
    /// equal to the present snapshot.
    pub fn push_producer<F>(&mut self, mutator: F) -> bool
    where
        F: FnOnce(&mut S),
    {
        match self.try_push_producer::<_, _, Infallible>(|draft| {
            mutator(draft);
            Ok(())
        }) {
            Ok(((), recorded)) => recorded,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`History::push_producer`] that also hands back the
    /// mutator's output.
    ///
    /// When `mutator` fails the draft is discarded and the history is untouched.
    pub fn try_push_producer<F, R, E>(&mut self, mutator: F) -> Result<(R, bool), E>
    where
        F: FnOnce(&mut S) -> Result<R, E>,
    {
        let mut draft = self.present().clone();
        let output = mutator(&mut draft)?;

        if &draft == self.present() {
            return Ok((output, false));
        }

        self.entries.truncate(self.cursor + 1);
        self.entries.push(draft);

        let overflow = self.entries.len().saturating_sub(self.max_entries);
        if overflow > 0 {
            self.entries.drain(..overflow);
        }
        self.cursor = self.entries.len() - 1;
        Ok((output, true))
    }

    /// Moves the cursor one step back. Returns false if already at the oldest entry.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Moves the cursor one step forward. Returns false if already at the newest entry.
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// The snapshot at the cursor.
    pub fn present(&self) -> &S {
        &self.entries[self.cursor]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a history holds at least one snapshot.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
