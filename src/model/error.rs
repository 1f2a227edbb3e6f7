//! Error types for the canvas core.
//!
//! This module defines a hierarchical error taxonomy using `thiserror`. Domain
//! errors compose into [`CanvasError`] via `From` conversions so callers can use
//! `?` across component boundaries.
//!
//! # Error Hierarchy
//!
//! - [`CanvasError`] - Top-level error wrapping every domain failure
//!   - [`StoreError`] - Entry store integrity violations (missing ids, cycles)
//!   - [`NavigationError`] - Navigation targets that cannot be entered
//!   - [`PersistError`] - Failures reported by the remote persistence API
//!
//! # Recovery Strategy
//!
//! Nothing here is fatal to the process. Every failure degrades to "local
//! state diverges from the server until the next successful sync":
//!
//! - **AuthRequired**: the session flips to read-only, local edits are kept.
//! - **Validation**: surfaced to the caller, no retry.
//! - **NotFound**: surfaced; navigation falls back to the root view.
//! - **Transient**: logged and retried with backoff by the save queue.

use super::identifiers::EntryId;
use thiserror::Error;

/// Top-level error for the canvas core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CanvasError {
    /// The entry store rejected a mutation.
    #[error("Entry store error: {0}")]
    Store(#[from] StoreError),

    /// A navigation request could not be honoured.
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// The remote store rejected a write.
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// Integrity violations detected by the entry store.
///
/// The store checks these before mutating, so an `Err` always means the store
/// is unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No entry with this id exists.
    #[error("Entry not found: {0}")]
    NotFound(EntryId),

    /// Inserting would shadow an existing entry.
    #[error("Entry already exists: {0}")]
    DuplicateId(EntryId),

    /// The referenced parent is not in the store.
    #[error("Parent {parent} of entry {id} does not exist")]
    UnknownParent {
        /// Entry being inserted or re-parented.
        id: EntryId,
        /// The missing parent.
        parent: EntryId,
    },

    /// Re-parenting would make an entry its own ancestor.
    #[error("Making {parent} the parent of {id} would form a cycle")]
    Cycle {
        /// Entry being re-parented.
        id: EntryId,
        /// Proposed parent, which is `id` itself or one of its descendants.
        parent: EntryId,
    },
}

/// Reasons a navigation request fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// The target entry (or URL segment) does not exist.
    #[error("Navigation target not found: {0}")]
    NotFound(String),

    /// The target exists but is not a direct child of the current view.
    #[error("Entry {0} is not a child of the current view")]
    NotAChild(EntryId),

    /// A transition is still settling; the request needs a stable view.
    #[error("Navigation in progress")]
    Locked,
}

/// Failure categories reported by the remote persistence API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// 401-class response: the identity is missing or expired.
    #[error("Authentication required")]
    AuthRequired,

    /// The request was malformed (missing position, text, ...).
    #[error("Request rejected as invalid: {0}")]
    Validation(String),

    /// The referenced user, page or entry does not exist remotely.
    #[error("Remote resource not found: {0}")]
    NotFound(String),

    /// Server-side failure that may succeed on retry.
    #[error("Transient server error: {0}")]
    Transient(String),
}

impl PersistError {
    /// Only transient failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistError::Transient(_))
    }
}
