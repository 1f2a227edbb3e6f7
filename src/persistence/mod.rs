//! Optimistic, debounced save queue.
//!
//! The entry store is the source of truth. Mutations record the affected ids
//! here; the queue coalesces them per id, waits for a quiet period, then hands
//! the host [`WriteRequest`]s built from the store *at flush time*. The host
//! executes them (see [`backend`]) and reports each result through
//! [`SaveQueue::complete`].
//!
//! # Outcomes
//!
//! | Result | Effect |
//! |---|---|
//! | `Ok` | [`SyncEvent::Saved`] |
//! | `AuthRequired` | queue goes read-only, writes kept for [`SaveQueue::resume`] |
//! | `Validation`, `NotFound` | [`SyncEvent::Rejected`], no retry |
//! | `Transient` | retried with exponential backoff unless superseded |

pub mod backend;

pub use backend::{execute, load_all, EntryBackend, InMemoryBackend, Page, Scope};

use crate::model::{EntryId, Millis, PersistError, PersistedEntry, RequestId};
use crate::store::EntryStore;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;

/// Result the host reports for a finished request.
pub type WriteOutcome = Result<(), PersistError>;

/// Tunables for the save queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Quiet period after the latest record before writes go out.
    pub debounce_ms: u64,
    /// Total attempts for a write that keeps failing transiently.
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles each time.
    pub retry_base_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            retry_attempts: 3,
            retry_base_ms: 250,
        }
    }
}

impl QueueSettings {
    /// Backoff before retry number `failures` (1-based).
    pub fn backoff_ms(&self, failures: u32) -> u64 {
        let shift = failures.saturating_sub(1).min(16);
        self.retry_base_ms.saturating_mul(1u64 << shift)
    }
}

/// Kind of write pending for an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    /// Create or replace the entry.
    Upsert,
    /// Remove the entry.
    Delete,
}

/// Request for the host to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    /// One entry created or updated.
    Single {
        /// Correlates the host's reply.
        request_id: RequestId,
        /// Full entry state to store.
        entry: PersistedEntry,
    },
    /// Parent-before-child.
    Batch {
        /// Correlates the host's reply.
        request_id: RequestId,
        /// Full entry states to store.
        entries: Vec<PersistedEntry>,
    },
    /// One entry removed.
    Delete {
        /// Correlates the host's reply.
        request_id: RequestId,
        /// Entry to remove.
        id: EntryId,
    },
}

impl WriteRequest {
    /// Id the host must echo in its reply.
    pub fn request_id(&self) -> RequestId {
        match self {
            WriteRequest::Single { request_id, .. }
            | WriteRequest::Batch { request_id, .. }
            | WriteRequest::Delete { request_id, .. } => *request_id,
        }
    }

    /// Ids written by this request.
    pub fn ids(&self) -> Vec<EntryId> {
        match self {
            WriteRequest::Single { entry, .. } => vec![entry.id.clone()],
            WriteRequest::Batch { entries, .. } => entries.iter().map(|e| e.id.clone()).collect(),
            WriteRequest::Delete { id, .. } => vec![id.clone()],
        }
    }
}

/// What a completion meant for the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The write was stored.
    Saved {
        /// Entries the write covered.
        ids: Vec<EntryId>,
    },
    /// The identity expired; the queue is now read-only.
    AuthRequired,
    /// Permanent failure; local state is kept as is.
    Rejected {
        /// Entries the write covered.
        ids: Vec<EntryId>,
        /// Error reported by the backend.
        error: PersistError,
    },
    /// Transient failure; the write goes out again at `retry_at`.
    RetryScheduled {
        /// Entries the write covered.
        ids: Vec<EntryId>,
        /// Attempt number of the retry, starting at 2.
        attempt: u32,
        /// When the retry is sent.
        retry_at: Millis,
    },
    /// A newer local write made the failed one irrelevant.
    Superseded {
        /// Entries the write covered.
        ids: Vec<EntryId>,
    },
    /// Transient failures used up every attempt.
    GaveUp {
        /// Entries the write covered.
        ids: Vec<EntryId>,
        /// Error from the final attempt.
        error: PersistError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingWrite {
    op: WriteOp,
    /// Failed attempts so far.
    failures: u32,
    /// Set for retries; fresh writes follow the debounce window instead.
    retry_at: Option<Millis>,
}

impl PendingWrite {
    fn fresh(op: WriteOp) -> Self {
        Self {
            op,
            failures: 0,
            retry_at: None,
        }
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    ops: Vec<(EntryId, WriteOp)>,
    failures: u32,
}

/// Coalescing, debounced write queue.
#[derive(Debug, Clone)]
pub struct SaveQueue {
    settings: QueueSettings,
    pending: HashMap<EntryId, PendingWrite>,
    in_flight: HashMap<RequestId, InFlight>,
    last_record: Option<Millis>,
    next_request: RequestId,
    read_only: bool,
}

impl Default for SaveQueue {
    fn default() -> Self {
        Self::new(QueueSettings::default())
    }
}

impl SaveQueue {
    /// Empty queue.
    pub fn new(settings: QueueSettings) -> Self {
        Self {
            settings,
            pending: HashMap::new(),
            in_flight: HashMap::new(),
            last_record: None,
            next_request: RequestId::new(1),
            read_only: false,
        }
    }

    /// Timing the queue runs with.
    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Set after an auth failure until [`SaveQueue::resume`].
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Entries waiting for their debounce window.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Requests handed to the host and not yet answered.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Pending write for `id`, if any.
    pub fn pending_op(&self, id: &EntryId) -> Option<WriteOp> {
        self.pending.get(id).map(|p| p.op)
    }

    /// Schedule a save of `id`'s current state. Replaces any pending write.
    pub fn record_upsert(&mut self, id: EntryId, now: Millis) {
        self.record(id, WriteOp::Upsert, now);
    }

    /// Schedule a remote delete of `id`. Replaces any pending upsert.
    pub fn record_delete(&mut self, id: EntryId, now: Millis) {
        self.record(id, WriteOp::Delete, now);
    }

    fn record(&mut self, id: EntryId, op: WriteOp, now: Millis) {
        self.pending.insert(id, PendingWrite::fresh(op));
        self.last_record = Some(now);
    }

    /// Earliest time at which [`SaveQueue::poll`] would emit something.
    pub fn next_deadline(&self) -> Option<Millis> {
        if self.read_only {
            return None;
        }
        let debounce = self.last_record.map(|t| t + self.settings.debounce_ms);
        self.pending
            .values()
            .filter_map(|p| p.retry_at.or(debounce))
            .min()
    }

    /// Emit writes whose debounce window or retry delay has elapsed.
    pub fn poll(&mut self, now: Millis, store: &EntryStore) -> Vec<WriteRequest> {
        if self.read_only || self.pending.is_empty() {
            return Vec::new();
        }
        let debounced = self
            .last_record
            .map_or(true, |t| now.since(t) >= self.settings.debounce_ms);
        let ready: Vec<EntryId> = self
            .pending
            .iter()
            .filter(|(_, p)| match p.retry_at {
                Some(at) => now >= at,
                None => debounced,
            })
            .map(|(id, _)| id.clone())
            .collect();
        self.emit(ready, store)
    }

    /// Emit everything pending now, ignoring debounce and backoff.
    pub fn flush_now(&mut self, store: &EntryStore) -> Vec<WriteRequest> {
        if self.read_only {
            debug!(pending = self.pending.len(), "Flush skipped while read-only");
            return Vec::new();
        }
        let ready: Vec<EntryId> = self.pending.keys().cloned().collect();
        self.emit(ready, store)
    }

    fn emit(&mut self, ready: Vec<EntryId>, store: &EntryStore) -> Vec<WriteRequest> {
        let mut upserts: Vec<(EntryId, u32)> = Vec::new();
        let mut deletes: Vec<(EntryId, u32)> = Vec::new();
        for id in ready {
            let Some(pending) = self.pending.remove(&id) else {
                continue;
            };
            match pending.op {
                WriteOp::Upsert if store.contains(&id) => upserts.push((id, pending.failures)),
                WriteOp::Upsert => debug!(entry = %id, "Dropping save of entry no longer in store"),
                WriteOp::Delete => deletes.push((id, pending.failures)),
            }
        }

        let mut requests = Vec::new();

        // Parent-before-child so the remote side never sees a dangling parent.
        upserts.sort_by_cached_key(|(id, _)| {
            let depth = store.ancestry(id).map_or(0, |a| a.len());
            let created = store.get(id).map(|e| e.created_at());
            (depth, created, id.clone())
        });
        let records: Vec<PersistedEntry> = upserts
            .iter()
            .filter_map(|(id, _)| store.get(id).map(|e| e.to_record()))
            .collect();
        let failures = upserts.iter().map(|(_, f)| *f).max().unwrap_or(0);
        let ops: Vec<(EntryId, WriteOp)> = upserts.into_iter().map(|(id, _)| (id, WriteOp::Upsert)).collect();

        match records.len() {
            0 => {}
            1 => {
                let request_id = self.track(ops, failures);
                if let Some(entry) = records.into_iter().next() {
                    requests.push(WriteRequest::Single { request_id, entry });
                }
            }
            n => {
                let request_id = self.track(ops, failures);
                info!(request = %request_id, count = n, "Flushing batched saves");
                requests.push(WriteRequest::Batch {
                    request_id,
                    entries: records,
                });
            }
        }

        deletes.sort();
        for (id, failures) in deletes {
            let request_id = self.track(vec![(id.clone(), WriteOp::Delete)], failures);
            requests.push(WriteRequest::Delete { request_id, id });
        }

        if !requests.is_empty() {
            debug!(requests = requests.len(), pending = self.pending.len(), "Writes emitted");
        }
        requests
    }

    fn track(&mut self, ops: Vec<(EntryId, WriteOp)>, failures: u32) -> RequestId {
        let request_id = self.next_request;
        self.next_request = request_id.next();
        self.in_flight.insert(request_id, InFlight { ops, failures });
        request_id
    }

    /// Handle the host's report for `request_id`.
    ///
    /// Unknown ids (already handled or never issued) are ignored.
    pub fn complete(&mut self, request_id: RequestId, outcome: WriteOutcome, now: Millis) -> Vec<SyncEvent> {
        let Some(flight) = self.in_flight.remove(&request_id) else {
            debug!(request = %request_id, "Ignoring completion for unknown request");
            return Vec::new();
        };
        let ids: Vec<EntryId> = flight.ops.iter().map(|(id, _)| id.clone()).collect();

        match outcome {
            Ok(()) => {
                debug!(request = %request_id, count = ids.len(), "Write confirmed");
                vec![SyncEvent::Saved { ids }]
            }
            Err(PersistError::AuthRequired) => {
                warn!(request = %request_id, "Write refused: authentication required, entering read-only mode");
                self.read_only = true;
                for (id, op) in flight.ops {
                    self.pending.entry(id).or_insert(PendingWrite {
                        op,
                        failures: flight.failures,
                        retry_at: None,
                    });
                }
                vec![SyncEvent::AuthRequired]
            }
            Err(error) if error.is_retryable() => self.schedule_retry(request_id, flight, error, now),
            Err(error) => {
                warn!(request = %request_id, error = %error, "Write rejected");
                vec![SyncEvent::Rejected { ids, error }]
            }
        }
    }

    fn schedule_retry(
        &mut self,
        request_id: RequestId,
        flight: InFlight,
        error: PersistError,
        now: Millis,
    ) -> Vec<SyncEvent> {
        let failures = flight.failures + 1;
        let (superseded, retry): (Vec<_>, Vec<_>) = flight
            .ops
            .into_iter()
            .partition(|(id, _)| self.pending.contains_key(id));

        let mut events = Vec::new();
        if !superseded.is_empty() {
            debug!(request = %request_id, count = superseded.len(), "Failed write superseded by newer edit");
            events.push(SyncEvent::Superseded {
                ids: superseded.into_iter().map(|(id, _)| id).collect(),
            });
        }
        if retry.is_empty() {
            return events;
        }

        let ids: Vec<EntryId> = retry.iter().map(|(id, _)| id.clone()).collect();
        if failures >= self.settings.retry_attempts {
            warn!(request = %request_id, attempts = failures, error = %error, "Giving up on write");
            events.push(SyncEvent::GaveUp { ids, error });
            return events;
        }

        let retry_at = now + self.settings.backoff_ms(failures);
        warn!(
            request = %request_id,
            attempt = failures + 1,
            retry_at = retry_at.get(),
            error = %error,
            "Transient write failure, retrying"
        );
        for (id, op) in retry {
            self.pending.insert(
                id,
                PendingWrite {
                    op,
                    failures,
                    retry_at: Some(retry_at),
                },
            );
        }
        events.push(SyncEvent::RetryScheduled {
            ids,
            attempt: failures + 1,
            retry_at,
        });
        events
    }

    /// Leave read-only mode after re-authentication. Pending writes go out
    /// after a fresh debounce window.
    pub fn resume(&mut self, now: Millis) {
        if !self.read_only {
            return;
        }
        self.read_only = false;
        for pending in self.pending.values_mut() {
            pending.retry_at = None;
        }
        if !self.pending.is_empty() {
            self.last_record = Some(now);
        }
        info!(pending = self.pending.len(), "Save queue resumed");
    }
}
