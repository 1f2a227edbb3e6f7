//! Tests for the save queue and the in-memory backend.
//!
//! Tests verify:
//! - rapid edits coalesce into one write carrying the final state
//! - debounce is measured from the latest record
//! - batching, delete handling and parent-first ordering
//! - auth, validation and transient outcomes
//! - pagination of the in-memory backend

use super::*;
use crate::model::{Entry, Point};
use chrono::{TimeZone, Utc};

fn id(raw: &str) -> EntryId {
    EntryId::new(raw).unwrap()
}

fn ms(v: u64) -> Millis {
    Millis::new(v)
}

fn store_with(ids: &[(&str, Option<&str>)]) -> EntryStore {
    let mut store = EntryStore::new();
    for (i, (raw, parent)) in ids.iter().enumerate() {
        store
            .insert(Entry::new(
                id(raw),
                format!("text {raw}"),
                Point::new(i as f64, 0.0),
                parent.map(id),
                Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, i as u32).unwrap(),
            ))
            .unwrap();
    }
    store
}

// ===== coalescing and debounce =====

#[test]
fn rapid_edits_produce_one_write_with_final_text() {
    let mut store = store_with(&[("a", None)]);
    let mut queue = SaveQueue::default();

    for (t, text) in [(0, "h"), (50, "he"), (100, "hel"), (150, "hello")] {
        store.get_mut(&id("a")).unwrap().set_text(text, None);
        queue.record_upsert(id("a"), ms(t));
    }

    assert!(queue.poll(ms(600), &store).is_empty(), "window restarts at the last record");
    let requests = queue.poll(ms(650), &store);
    assert_eq!(requests.len(), 1);
    match &requests[0] {
        WriteRequest::Single { entry, .. } => assert_eq!(entry.text, "hello"),
        other => panic!("expected single write, got {other:?}"),
    }
    assert!(queue.poll(ms(2000), &store).is_empty());
}

#[test]
fn next_deadline_tracks_debounce() {
    let store = store_with(&[("a", None)]);
    let mut queue = SaveQueue::default();
    assert_eq!(queue.next_deadline(), None);
    queue.record_upsert(id("a"), ms(100));
    assert_eq!(queue.next_deadline(), Some(ms(600)));
    queue.flush_now(&store);
    assert_eq!(queue.next_deadline(), None);
}

#[test]
fn several_upserts_go_out_as_one_parent_first_batch() {
    let store = store_with(&[("p", None), ("c", Some("p")), ("q", None)]);
    let mut queue = SaveQueue::default();
    queue.record_upsert(id("c"), ms(0));
    queue.record_upsert(id("q"), ms(0));
    queue.record_upsert(id("p"), ms(0));

    let requests = queue.flush_now(&store);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].ids(), vec![id("p"), id("q"), id("c")]);
}

#[test]
fn delete_supersedes_upsert_and_upsert_supersedes_delete() {
    let store = store_with(&[("a", None)]);
    let mut queue = SaveQueue::default();

    queue.record_upsert(id("a"), ms(0));
    queue.record_delete(id("a"), ms(10));
    assert_eq!(queue.pending_op(&id("a")), Some(WriteOp::Delete));

    queue.record_upsert(id("a"), ms(20));
    assert_eq!(queue.pending_op(&id("a")), Some(WriteOp::Upsert));
    assert!(matches!(queue.flush_now(&store)[..], [WriteRequest::Single { .. }]));
}

#[test]
fn deletes_are_individual_requests() {
    let store = store_with(&[("keep", None)]);
    let mut queue = SaveQueue::default();
    queue.record_delete(id("x"), ms(0));
    queue.record_delete(id("y"), ms(0));
    queue.record_upsert(id("keep"), ms(0));

    let requests = queue.flush_now(&store);
    let deletes: Vec<_> = requests
        .iter()
        .filter(|r| matches!(r, WriteRequest::Delete { .. }))
        .collect();
    assert_eq!(requests.len(), 3);
    assert_eq!(deletes.len(), 2);
}

#[test]
fn upsert_of_vanished_entry_is_dropped() {
    let store = EntryStore::new();
    let mut queue = SaveQueue::default();
    queue.record_upsert(id("ghost"), ms(0));
    assert!(queue.flush_now(&store).is_empty());
    assert_eq!(queue.pending_len(), 0);
}

// ===== outcomes =====

#[test]
fn success_reports_saved() {
    let store = store_with(&[("a", None)]);
    let mut queue = SaveQueue::default();
    queue.record_upsert(id("a"), ms(0));
    let request = queue.flush_now(&store).remove(0);

    let events = queue.complete(request.request_id(), Ok(()), ms(10));
    assert_eq!(events, vec![SyncEvent::Saved { ids: vec![id("a")] }]);
    assert_eq!(queue.in_flight_len(), 0);
}

#[test]
fn unknown_completion_is_ignored() {
    let mut queue = SaveQueue::default();
    assert!(queue.complete(RequestId::new(77), Ok(()), ms(0)).is_empty());
}

#[test]
fn auth_failure_enters_read_only_and_keeps_writes() {
    let store = store_with(&[("a", None)]);
    let mut queue = SaveQueue::default();
    queue.record_upsert(id("a"), ms(0));
    let request = queue.flush_now(&store).remove(0);

    let events = queue.complete(request.request_id(), Err(PersistError::AuthRequired), ms(10));
    assert_eq!(events, vec![SyncEvent::AuthRequired]);
    assert!(queue.is_read_only());
    assert_eq!(queue.pending_len(), 1);
    assert!(queue.poll(ms(10_000), &store).is_empty());
    assert!(queue.flush_now(&store).is_empty());

    queue.resume(ms(20_000));
    assert!(!queue.is_read_only());
    assert!(queue.poll(ms(20_100), &store).is_empty());
    assert_eq!(queue.poll(ms(20_500), &store).len(), 1);
}

#[test]
fn validation_failure_is_rejected_without_retry() {
    let store = store_with(&[("a", None)]);
    let mut queue = SaveQueue::default();
    queue.record_upsert(id("a"), ms(0));
    let request = queue.flush_now(&store).remove(0);

    let error = PersistError::Validation("missing position".into());
    let events = queue.complete(request.request_id(), Err(error.clone()), ms(10));
    assert_eq!(
        events,
        vec![SyncEvent::Rejected {
            ids: vec![id("a")],
            error
        }]
    );
    assert_eq!(queue.pending_len(), 0);
}

#[test]
fn transient_failure_retries_with_doubling_backoff_then_gives_up() {
    let store = store_with(&[("a", None)]);
    let mut queue = SaveQueue::default();
    queue.record_upsert(id("a"), ms(0));
    let transient = || Err(PersistError::Transient("503".into()));

    let first = queue.flush_now(&store).remove(0);
    let events = queue.complete(first.request_id(), transient(), ms(100));
    assert_eq!(
        events,
        vec![SyncEvent::RetryScheduled {
            ids: vec![id("a")],
            attempt: 2,
            retry_at: ms(350)
        }]
    );
    assert!(queue.poll(ms(349), &store).is_empty());

    let second = queue.poll(ms(350), &store).remove(0);
    let events = queue.complete(second.request_id(), transient(), ms(400));
    assert!(matches!(
        events[..],
        [SyncEvent::RetryScheduled { attempt: 3, retry_at, .. }] if retry_at == ms(900)
    ));

    let third = queue.poll(ms(900), &store).remove(0);
    let events = queue.complete(third.request_id(), transient(), ms(950));
    assert!(matches!(events[..], [SyncEvent::GaveUp { .. }]));
    assert_eq!(queue.pending_len(), 0);
}

#[test]
fn retry_is_dropped_when_a_newer_write_is_pending() {
    let store = store_with(&[("a", None)]);
    let mut queue = SaveQueue::default();
    queue.record_upsert(id("a"), ms(0));
    let request = queue.flush_now(&store).remove(0);

    queue.record_upsert(id("a"), ms(50));
    let events = queue.complete(request.request_id(), Err(PersistError::Transient("timeout".into())), ms(60));
    assert_eq!(events, vec![SyncEvent::Superseded { ids: vec![id("a")] }]);
    assert_eq!(queue.pending_len(), 1);
    assert_eq!(queue.next_deadline(), Some(ms(550)));
}

#[test]
fn backoff_doubles() {
    let settings = QueueSettings::default();
    assert_eq!(settings.backoff_ms(1), 250);
    assert_eq!(settings.backoff_ms(2), 500);
    assert_eq!(settings.backoff_ms(3), 1000);
}

// ===== backend =====

#[test]
fn execute_applies_requests_to_backend() {
    let store = store_with(&[("a", None), ("b", None)]);
    let mut queue = SaveQueue::default();
    let mut backend = InMemoryBackend::new();
    let scope = Scope::own("ana");

    queue.record_upsert(id("a"), ms(0));
    queue.record_upsert(id("b"), ms(0));
    for request in queue.flush_now(&store) {
        execute(&mut backend, &scope, &request).unwrap();
    }
    assert_eq!(backend.live_count("ana"), 2);

    queue.record_delete(id("a"), ms(10));
    for request in queue.flush_now(&store) {
        execute(&mut backend, &scope, &request).unwrap();
    }
    assert_eq!(backend.live_count("ana"), 1);
    assert!(backend.get("ana", &id("a")).is_none());
}

#[test]
fn backend_maps_failures_to_persist_errors() {
    let store = store_with(&[("a", None)]);
    let record = store.get(&id("a")).unwrap().to_record();
    let mut backend = InMemoryBackend::new();

    assert_eq!(
        backend.upsert(&Scope::own(""), &record),
        Err(PersistError::AuthRequired)
    );
    let foreign = Scope {
        user: "ana".into(),
        page_owner: Some("bo".into()),
    };
    assert!(matches!(backend.upsert(&foreign, &record), Err(PersistError::Validation(_))));
    assert!(matches!(
        backend.soft_delete(&Scope::own("ana"), &id("missing")),
        Err(PersistError::NotFound(_))
    ));

    backend.fail_next(PersistError::Transient("503".into()));
    assert!(backend.upsert(&Scope::own("ana"), &record).unwrap_err().is_retryable());
    assert!(backend.upsert(&Scope::own("ana"), &record).is_ok());
}

#[test]
fn load_all_walks_pages_in_creation_order() {
    let store = store_with(&[("a", None), ("b", Some("a")), ("c", None), ("d", None), ("e", Some("c"))]);
    let mut records = store.to_records();
    records.reverse();
    let backend = InMemoryBackend::with_records("ana", records);

    let loaded = load_all(&backend, &Scope::own("ana"), 2).unwrap();
    let ids: Vec<&str> = loaded.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn listing_a_missing_page_is_not_found() {
    let backend = InMemoryBackend::new();
    assert!(matches!(
        load_all(&backend, &Scope::own("nobody"), 10),
        Err(PersistError::NotFound(_))
    ));
}
