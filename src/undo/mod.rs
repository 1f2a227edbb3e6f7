//! Bounded undo log.
//!
//! Every mutating operation pushes the data needed to invert itself. Undo pops
//! the most recent action and applies its inverse to the store. There is no
//! redo: an undone action is gone.

use crate::model::{Entry, EntryId, Payload, Point};
use crate::store::EntryStore;
use std::collections::VecDeque;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "undo_tests.rs"]
mod tests;

/// Default number of actions retained.
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

/// A recorded mutation, carrying exactly what its inverse needs.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoAction {
    /// An entry and its descendants were deleted. Snapshot is parent-before-child.
    Delete {
        /// Removed entries as they were.
        snapshot: Vec<Entry>,
    },
    /// Entries were moved; holds each one's prior position.
    Move {
        /// Each moved entry with its position before the move.
        prior: Vec<(EntryId, Point)>,
    },
    /// An entry was created.
    Create {
        /// The new entry.
        id: EntryId,
    },
    /// An entry's content was edited; holds the prior content.
    Edit {
        /// Entry that was edited.
        id: EntryId,
        /// Text before the edit.
        prior_text: String,
        /// Rich text before the edit.
        prior_html: Option<String>,
        /// Payload before the edit.
        prior_payload: Payload,
    },
}

impl UndoAction {
    /// Capture the current content of `entry` before an edit.
    pub fn edit_of(entry: &Entry) -> Self {
        UndoAction::Edit {
            id: entry.id().clone(),
            prior_text: entry.text().to_string(),
            prior_html: entry.text_html().map(str::to_string),
            prior_payload: entry.payload.clone(),
        }
    }

    fn kind(&self) -> UndoKind {
        match self {
            UndoAction::Delete { .. } => UndoKind::Delete,
            UndoAction::Move { .. } => UndoKind::Move,
            UndoAction::Create { .. } => UndoKind::Create,
            UndoAction::Edit { .. } => UndoKind::Edit,
        }
    }
}

/// Which kind of action an undo reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    /// Entries were deleted.
    Delete,
    /// Entries were moved.
    Move,
    /// An entry was created.
    Create,
    /// An entry's content was edited.
    Edit,
}

/// What an undo changed in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoOutcome {
    /// What kind of action was reverted.
    pub kind: UndoKind,
    /// Entries re-inserted or modified; these need saving. Parent-before-child
    /// for a reverted delete.
    pub restored: Vec<EntryId>,
    /// Entries removed; these need deleting remotely.
    pub removed: Vec<EntryId>,
    /// `false` if the target no longer existed and nothing changed.
    pub applied: bool,
}

/// Bounded LIFO of undo actions. The oldest action is evicted silently.
#[derive(Debug, Clone)]
pub struct UndoLog {
    actions: VecDeque<UndoAction>,
    capacity: usize,
}

impl Default for UndoLog {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_CAPACITY)
    }
}

impl UndoLog {
    /// Empty log holding at most `capacity` actions.
    pub fn new(capacity: usize) -> Self {
        Self {
            actions: VecDeque::with_capacity(capacity.min(DEFAULT_UNDO_CAPACITY)),
            capacity,
        }
    }

    /// Actions currently held.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True when there is nothing to undo.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Most actions the log holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent action, if any.
    pub fn peek(&self) -> Option<&UndoAction> {
        self.actions.back()
    }

    /// Record an action, evicting the oldest when full.
    ///
    /// Empty move lists are not recorded.
    pub fn push(&mut self, action: UndoAction) {
        if self.capacity == 0 {
            return;
        }
        if let UndoAction::Move { prior } = &action {
            if prior.is_empty() {
                return;
            }
        }
        if self.actions.len() >= self.capacity {
            self.actions.pop_front();
        }
        self.actions.push_back(action);
    }

    /// Forget every action.
    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Pop the most recent action and apply its inverse to `store`.
    ///
    /// Returns `None` when the log is empty. An action whose target has since
    /// disappeared is still consumed and reported with `applied == false`.
    pub fn perform_undo(&mut self, store: &mut EntryStore) -> Option<UndoOutcome> {
        let action = self.actions.pop_back()?;
        let kind = action.kind();
        let mut outcome = UndoOutcome {
            kind,
            restored: Vec::new(),
            removed: Vec::new(),
            applied: false,
        };

        match action {
            UndoAction::Delete { snapshot } => {
                let ids: Vec<EntryId> = snapshot.iter().map(|e| e.id().clone()).collect();
                match store.restore(snapshot) {
                    Ok(()) => {
                        outcome.restored = ids;
                        outcome.applied = true;
                    }
                    Err(err) => warn!(error = %err, "Undo of delete could not restore entries"),
                }
            }
            UndoAction::Move { prior } => {
                for (id, position) in prior {
                    if store.set_position(&id, position).is_ok() {
                        outcome.restored.push(id);
                    }
                }
                outcome.applied = !outcome.restored.is_empty();
            }
            UndoAction::Create { id } => match store.remove_subtree(&id) {
                Ok(removed) => {
                    outcome.removed = removed.iter().map(|e| e.id().clone()).collect();
                    outcome.applied = true;
                }
                Err(err) => warn!(error = %err, "Undo of create found nothing to remove"),
            },
            UndoAction::Edit {
                id,
                prior_text,
                prior_html,
                prior_payload,
            } => match store.get_mut(&id) {
                Some(entry) => {
                    entry.set_text(prior_text, prior_html);
                    entry.payload = prior_payload;
                    outcome.restored.push(id);
                    outcome.applied = true;
                }
                None => warn!(entry = %id, "Undo of edit target no longer exists"),
            },
        }

        debug!(?kind, applied = outcome.applied, remaining = self.actions.len(), "Undo performed");
        Some(outcome)
    }
}
