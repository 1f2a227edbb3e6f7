//! Tests for what the core logs.
//!
//! Events are captured with a scoped subscriber writing into a buffer, so these
//! do not touch the global subscriber.

use crate::model::{Entry, EntryId, Millis, PersistError, PersistedEntry, Point};
use crate::persistence::SaveQueue;
use crate::store::EntryStore;
use chrono::{TimeZone, Utc};
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

/// Run `f` with an `info`-level subscriber and return everything it logged.
fn captured(f: impl FnOnce()) -> String {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    capture.text()
}

fn id(raw: &str) -> EntryId {
    EntryId::new(raw).unwrap()
}

#[test]
fn orphan_on_load_is_logged_as_warning() {
    // GIVEN a record whose parent is missing
    let record = PersistedEntry {
        id: id("child"),
        text: "lost".into(),
        text_html: None,
        position: Point::ORIGIN,
        parent_entry_id: Some(id("gone")),
        payload: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    };

    // WHEN the store is rebuilt
    let output = captured(|| {
        let _ = EntryStore::from_records(vec![record]);
    });

    // THEN a warning names both ids
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("child") && output.contains("gone"), "{output}");
}

#[test]
fn transient_write_failure_is_logged_with_retry() {
    // GIVEN a queued write that fails transiently
    let mut store = EntryStore::new();
    store
        .insert(Entry::new(
            id("a"),
            "text",
            Point::ORIGIN,
            None,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
        .unwrap();
    let mut queue = SaveQueue::default();
    queue.record_upsert(id("a"), Millis::ZERO);
    let request = queue.flush_now(&store).remove(0);

    // WHEN the failure is reported
    let output = captured(|| {
        queue.complete(
            request.request_id(),
            Err(PersistError::Transient("503".into())),
            Millis::new(10),
        );
    });

    // THEN the retry is logged at warn level
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("retrying"), "{output}");
}

#[test]
fn debug_events_are_filtered_at_info() {
    // GIVEN a completion for an unknown request, which logs at debug
    let mut queue = SaveQueue::default();

    // WHEN it is reported under an info filter
    let output = captured(|| {
        queue.complete(crate::model::RequestId::new(9), Ok(()), Millis::ZERO);
    });

    // THEN nothing is written
    assert!(output.is_empty(), "{output}");
}
