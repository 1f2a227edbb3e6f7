//! Seam to the remote entry API.
//!
//! The core never performs I/O. [`EntryBackend`] describes the remote
//! operations; the host owns an implementation and runs the
//! [`WriteRequest`]s produced by the save queue through [`execute`].

use super::WriteRequest;
use crate::model::{EntryId, PersistError, PersistedEntry};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Identity and page a call acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Authenticated user; empty means signed out.
    pub user: String,
    /// Owner of the page being viewed. `None` means the user's own page.
    pub page_owner: Option<String>,
}

impl Scope {
    /// Scope for a signed-in user viewing their own page.
    pub fn own(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            page_owner: None,
        }
    }

    /// The page the call reads from or writes to.
    pub fn owner(&self) -> &str {
        self.page_owner.as_deref().unwrap_or(&self.user)
    }

    /// Whether an identity is present.
    pub fn is_signed_in(&self) -> bool {
        !self.user.trim().is_empty()
    }
}

/// One page of the paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Entries in this page.
    pub entries: Vec<PersistedEntry>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Remote entry API.
pub trait EntryBackend {
    /// Create or replace one entry.
    fn upsert(&mut self, scope: &Scope, entry: &PersistedEntry) -> Result<(), PersistError>;

    /// Create or replace several entries in one request.
    fn upsert_many(&mut self, scope: &Scope, entries: &[PersistedEntry]) -> Result<(), PersistError>;

    /// Mark an entry deleted. Deleted entries disappear from listings.
    fn soft_delete(&mut self, scope: &Scope, id: &EntryId) -> Result<(), PersistError>;

    /// Entries on the scope's page in creation order, `limit` at a time.
    fn list_page(&self, scope: &Scope, cursor: Option<&str>, limit: usize) -> Result<Page, PersistError>;
}

/// Run one request against `backend`.
pub fn execute<B: EntryBackend + ?Sized>(
    backend: &mut B,
    scope: &Scope,
    request: &WriteRequest,
) -> Result<(), PersistError> {
    let result = match request {
        WriteRequest::Single { entry, .. } => backend.upsert(scope, entry),
        WriteRequest::Batch { entries, .. } => backend.upsert_many(scope, entries),
        WriteRequest::Delete { id, .. } => backend.soft_delete(scope, id),
    };
    if let Err(err) = &result {
        warn!(request = %request.request_id(), error = %err, "Write failed");
    }
    result
}

/// Walk every page of the listing.
pub fn load_all<B: EntryBackend + ?Sized>(
    backend: &B,
    scope: &Scope,
    page_size: usize,
) -> Result<Vec<PersistedEntry>, PersistError> {
    let page_size = page_size.max(1);
    let mut cursor: Option<String> = None;
    let mut records = Vec::new();
    loop {
        let page = backend.list_page(scope, cursor.as_deref(), page_size)?;
        records.extend(page.entries);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    debug!(owner = scope.owner(), count = records.len(), "Loaded entries");
    Ok(records)
}

#[derive(Debug, Clone)]
struct StoredRecord {
    record: PersistedEntry,
    deleted: bool,
}

/// In-process backend for tests and the CLI.
///
/// Rejects signed-out calls with `AuthRequired`, writes to someone else's page
/// and records with non-finite positions with `Validation`. Failures can be
/// injected with [`InMemoryBackend::fail_next`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    pages: HashMap<String, Vec<StoredRecord>>,
    injected: VecDeque<PersistError>,
    calls: usize,
}

impl InMemoryBackend {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a page directly, bypassing validation.
    pub fn with_records(owner: impl Into<String>, records: Vec<PersistedEntry>) -> Self {
        let mut backend = Self::new();
        backend.pages.insert(
            owner.into(),
            records
                .into_iter()
                .map(|record| StoredRecord {
                    record,
                    deleted: false,
                })
                .collect(),
        );
        backend
    }

    /// Make the next call fail with `error`. Injected failures queue up.
    pub fn fail_next(&mut self, error: PersistError) {
        self.injected.push_back(error);
    }

    /// Number of write calls received.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Live (not deleted) record with this id on `owner`'s page.
    pub fn get(&self, owner: &str, id: &EntryId) -> Option<&PersistedEntry> {
        self.pages
            .get(owner)?
            .iter()
            .find(|r| !r.deleted && &r.record.id == id)
            .map(|r| &r.record)
    }

    /// Count of live records on `owner`'s page.
    pub fn live_count(&self, owner: &str) -> usize {
        self.pages
            .get(owner)
            .map_or(0, |page| page.iter().filter(|r| !r.deleted).count())
    }

    fn authorize_write(&mut self, scope: &Scope) -> Result<(), PersistError> {
        self.calls += 1;
        if let Some(err) = self.injected.pop_front() {
            return Err(err);
        }
        if !scope.is_signed_in() {
            return Err(PersistError::AuthRequired);
        }
        if scope.owner() != scope.user {
            return Err(PersistError::Validation(format!(
                "cannot write to the page of {}",
                scope.owner()
            )));
        }
        Ok(())
    }

    fn validate(entry: &PersistedEntry) -> Result<(), PersistError> {
        if !entry.position.is_finite() {
            return Err(PersistError::Validation(format!("entry {} has no valid position", entry.id)));
        }
        Ok(())
    }

    fn put(&mut self, owner: &str, entry: &PersistedEntry) {
        let page = self.pages.entry(owner.to_string()).or_default();
        match page.iter_mut().find(|r| r.record.id == entry.id) {
            Some(existing) => {
                existing.record = entry.clone();
                existing.deleted = false;
            }
            None => page.push(StoredRecord {
                record: entry.clone(),
                deleted: false,
            }),
        }
    }
}

impl EntryBackend for InMemoryBackend {
    /// Create or replace one entry.
    fn upsert(&mut self, scope: &Scope, entry: &PersistedEntry) -> Result<(), PersistError> {
        self.authorize_write(scope)?;
        Self::validate(entry)?;
        let owner = scope.owner().to_string();
        self.put(&owner, entry);
        Ok(())
    }

    /// Create or replace several entries in one request.
    fn upsert_many(&mut self, scope: &Scope, entries: &[PersistedEntry]) -> Result<(), PersistError> {
        self.authorize_write(scope)?;
        // All-or-nothing.
        for entry in entries {
            Self::validate(entry)?;
        }
        let owner = scope.owner().to_string();
        for entry in entries {
            self.put(&owner, entry);
        }
        Ok(())
    }

    fn soft_delete(&mut self, scope: &Scope, id: &EntryId) -> Result<(), PersistError> {
        self.authorize_write(scope)?;
        let record = self
            .pages
            .get_mut(scope.owner())
            .and_then(|page| page.iter_mut().find(|r| !r.deleted && &r.record.id == id))
            .ok_or_else(|| PersistError::NotFound(format!("entry {id}")))?;
        record.deleted = true;
        Ok(())
    }

    fn list_page(&self, scope: &Scope, cursor: Option<&str>, limit: usize) -> Result<Page, PersistError> {
        let page = self
            .pages
            .get(scope.owner())
            .ok_or_else(|| PersistError::NotFound(format!("page {}", scope.owner())))?;

        let offset = match cursor {
            None => 0,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| PersistError::Validation(format!("bad cursor {raw:?}")))?,
        };

        let mut live: Vec<&PersistedEntry> = page.iter().filter(|r| !r.deleted).map(|r| &r.record).collect();
        live.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let end = offset.saturating_add(limit).min(live.len());
        let entries: Vec<PersistedEntry> = live
            .get(offset..end)
            .map(|slice| slice.iter().map(|r| (*r).clone()).collect())
            .unwrap_or_default();
        let next_cursor = (end < live.len()).then(|| end.to_string());
        Ok(Page { entries, next_cursor })
    }
}
