//! Entry-hierarchy navigation state machine.
//!
//! Tracks which subtree is visible (the children of the current view) and the
//! chain of ancestors leading to it.
//!
//! # State Machine
//!
//! The view is `Root` (empty stack) or `InEntry(id)` at some depth. Every
//! transition also drives a guard phase:
//!
//! ```text
//! Idle --navigate--> Navigating --fit started--> Settling --fit complete--> Idle
//!                         \                          /
//!                          +------ lock timeout ----+
//! ```
//!
//! While the phase is not `Idle`, commits and pastes are refused. The timeout
//! releases the lock even if no fit animation ever runs (e.g. zero entries).
//!
//! # Invariant
//! For every `i > 0`, `stack[i]`'s parent is `stack[i - 1]`, and `stack[0]`
//! sits at the root. [`NavigationState::revalidate`] restores this after the
//! store changes underneath the stack.

pub mod slug;

use crate::model::{EntryId, Millis, NavigationError};
use crate::store::EntryStore;
use tracing::{debug, info};

#[cfg(test)]
#[path = "navigation_tests.rs"]
mod tests;

/// Tunables for the navigation guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationSettings {
    /// How long a transition may hold the commit lock without a fit completing.
    pub lock_timeout_ms: u64,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 1_200,
        }
    }
}

/// Guard phase around a navigation transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavPhase {
    /// No transition in progress; commits allowed.
    #[default]
    Idle,
    /// Stack changed, waiting for the host to start the zoom-to-fit.
    Navigating {
        /// When the lock lapses if the fit never starts.
        deadline: Millis,
    },
    /// Fit animation running.
    Settling {
        /// When the lock lapses if the fit never reports completion.
        deadline: Millis,
    },
}

/// Result of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationChange {
    /// The new current view (`None` = root).
    pub current: Option<EntryId>,
    /// Slug path for the new stack.
    pub url_path: String,
}

/// Navigation stack plus guard phase.
#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    stack: Vec<EntryId>,
    phase: NavPhase,
    settings: NavigationSettings,
}

impl NavigationState {
    /// Navigation at the root level, unlocked.
    pub fn new(settings: NavigationSettings) -> Self {
        Self {
            stack: Vec::new(),
            phase: NavPhase::Idle,
            settings,
        }
    }

    /// The entry whose children are visible, or `None` at the root.
    pub fn current_view(&self) -> Option<&EntryId> {
        self.stack.last()
    }

    /// Ancestors from the root down to the current view.
    pub fn stack(&self) -> &[EntryId] {
        &self.stack
    }

    /// Number of levels below the root.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Where the lock currently is.
    pub fn phase(&self) -> NavPhase {
        self.phase
    }

    /// Whether a transition currently blocks commits and pastes.
    pub fn is_locked(&self) -> bool {
        self.phase != NavPhase::Idle
    }

    /// Entries visible at the current level: direct children only.
    pub fn visible_entries<'s>(&self, store: &'s EntryStore) -> &'s [EntryId] {
        store.children_of(self.current_view())
    }

    /// Slug path of the current stack.
    pub fn url_path(&self, store: &EntryStore) -> String {
        slug::url_path(store, &self.stack)
    }

    /// Enter a direct child of the current view.
    ///
    /// # Errors
    /// - [`NavigationError::NotFound`] if `id` is not in the store
    /// - [`NavigationError::NotAChild`] if `id` is not visible at this level
    pub fn navigate_to_entry(
        &mut self,
        store: &EntryStore,
        id: &EntryId,
        now: Millis,
    ) -> Result<NavigationChange, NavigationError> {
        let entry = store
            .get(id)
            .ok_or_else(|| NavigationError::NotFound(id.to_string()))?;
        if entry.parent() != self.current_view() {
            return Err(NavigationError::NotAChild(id.clone()));
        }
        self.stack.push(id.clone());
        info!(entry = %id, depth = self.stack.len(), "Navigated into entry");
        Ok(self.begin_transition(store, now))
    }

    /// Pop `n` levels (clamped to the stack length).
    ///
    /// Returns `None` when nothing was popped.
    pub fn navigate_back(
        &mut self,
        store: &EntryStore,
        n: usize,
        now: Millis,
    ) -> Option<NavigationChange> {
        let n = n.min(self.stack.len());
        if n == 0 {
            return None;
        }
        self.stack.truncate(self.stack.len() - n);
        info!(levels = n, depth = self.stack.len(), "Navigated back");
        Some(self.begin_transition(store, now))
    }

    /// Return to the root. `None` if already there.
    pub fn navigate_to_root(&mut self, store: &EntryStore, now: Millis) -> Option<NavigationChange> {
        if self.stack.is_empty() {
            return None;
        }
        self.stack.clear();
        info!("Navigated to root");
        Some(self.begin_transition(store, now))
    }

    /// Jump to the stack described by a slug path.
    ///
    /// On error the stack is left untouched; callers fall back to the root.
    pub fn navigate_to_path(
        &mut self,
        store: &EntryStore,
        path: &str,
        now: Millis,
    ) -> Result<NavigationChange, NavigationError> {
        let stack = slug::resolve_path(store, path)?;
        self.stack = stack;
        info!(path, depth = self.stack.len(), "Navigated to path");
        Ok(self.begin_transition(store, now))
    }

    /// Truncate the stack at the first level that no longer exists or whose
    /// parent link changed. Returns `true` if the stack changed.
    pub fn revalidate(&mut self, store: &EntryStore) -> bool {
        let mut parent: Option<&EntryId> = None;
        let mut valid = 0;
        for id in &self.stack {
            match store.get(id) {
                Some(entry) if entry.parent() == parent => {
                    valid += 1;
                    parent = Some(id);
                }
                _ => break,
            }
        }
        if valid == self.stack.len() {
            return false;
        }
        debug!(from = self.stack.len(), to = valid, "Navigation stack truncated after store change");
        self.stack.truncate(valid);
        true
    }

    /// Whether the stack satisfies the parent-chain invariant against `store`.
    pub fn is_consistent(&self, store: &EntryStore) -> bool {
        let mut parent: Option<&EntryId> = None;
        for id in &self.stack {
            match store.get(id) {
                Some(entry) if entry.parent() == parent => parent = Some(id),
                _ => return false,
            }
        }
        true
    }

    /// The host started the zoom-to-fit animation for the last transition.
    pub fn on_fit_started(&mut self, now: Millis) {
        if let NavPhase::Navigating { .. } = self.phase {
            self.phase = NavPhase::Settling {
                deadline: now + self.settings.lock_timeout_ms,
            };
        }
    }

    /// The fit animation finished (or was unnecessary): release the lock.
    pub fn on_fit_complete(&mut self) {
        if self.phase != NavPhase::Idle {
            debug!("Navigation lock released by fit completion");
            self.phase = NavPhase::Idle;
        }
    }

    /// Release the lock once its deadline passes. Returns `true` if released.
    pub fn tick(&mut self, now: Millis) -> bool {
        let deadline = match self.phase {
            NavPhase::Idle => return false,
            NavPhase::Navigating { deadline } | NavPhase::Settling { deadline } => deadline,
        };
        if now >= deadline {
            debug!("Navigation lock released by timeout");
            self.phase = NavPhase::Idle;
            true
        } else {
            false
        }
    }

    fn begin_transition(&mut self, store: &EntryStore, now: Millis) -> NavigationChange {
        self.phase = NavPhase::Navigating {
            deadline: now + self.settings.lock_timeout_ms,
        };
        NavigationChange {
            current: self.current_view().cloned(),
            url_path: self.url_path(store),
        }
    }
}
