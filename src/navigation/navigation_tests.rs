//! Tests for the navigation state machine.
//!
//! Tests verify:
//! - navigate_to_entry pushes only direct children
//! - navigate_back clamps and navigate_to_root clears
//! - the guard phase moves Idle -> Navigating -> Settling -> Idle
//! - the lock timeout releases a transition with no fit
//! - revalidate repairs the stack after deletes

use super::*;
use crate::model::{Entry, Point};
use chrono::{TimeZone, Utc};

fn id(raw: &str) -> EntryId {
    EntryId::new(raw).unwrap()
}

/// a -> b -> c, plus root sibling d
fn store() -> EntryStore {
    let mut store = EntryStore::new();
    let specs = [("a", "Alpha", None), ("b", "Beta", Some("a")), ("c", "Gamma", Some("b")), ("d", "Delta", None)];
    for (i, (raw, text, parent)) in specs.iter().enumerate() {
        store
            .insert(Entry::new(
                id(raw),
                *text,
                Point::ORIGIN,
                parent.map(id),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, i as u32).unwrap(),
            ))
            .unwrap();
    }
    store
}

fn nav() -> NavigationState {
    NavigationState::new(NavigationSettings::default())
}

// ===== transitions =====

#[test]
fn starts_at_root() {
    let nav = nav();
    assert_eq!(nav.current_view(), None);
    assert!(nav.stack().is_empty());
    assert!(!nav.is_locked());
}

#[test]
fn navigate_into_child_then_grandchild() {
    let store = store();
    let mut nav = nav();

    nav.navigate_to_entry(&store, &id("a"), Millis::new(0)).unwrap();
    let change = nav.navigate_to_entry(&store, &id("b"), Millis::new(10)).unwrap();

    assert_eq!(nav.stack(), &[id("a"), id("b")]);
    assert_eq!(change.current, Some(id("b")));
    assert_eq!(change.url_path, "/alpha/beta");
    assert!(nav.is_consistent(&store));
}

#[test]
fn visible_entries_are_direct_children_only() {
    let store = store();
    let mut nav = nav();
    assert_eq!(nav.visible_entries(&store), &[id("a"), id("d")]);

    nav.navigate_to_entry(&store, &id("a"), Millis::ZERO).unwrap();
    assert_eq!(nav.visible_entries(&store), &[id("b")]);
}

#[test]
fn navigate_to_grandchild_directly_is_rejected() {
    let store = store();
    let mut nav = nav();
    let err = nav.navigate_to_entry(&store, &id("c"), Millis::ZERO).unwrap_err();
    assert_eq!(err, NavigationError::NotAChild(id("c")));
    assert!(nav.stack().is_empty());
    assert!(!nav.is_locked(), "failed navigation must not take the lock");
}

#[test]
fn navigate_to_missing_entry_is_not_found() {
    let store = store();
    let mut nav = nav();
    assert!(matches!(
        nav.navigate_to_entry(&store, &id("zzz"), Millis::ZERO),
        Err(NavigationError::NotFound(_))
    ));
}

#[test]
fn navigate_back_clamps_to_stack_length() {
    let store = store();
    let mut nav = nav();
    nav.navigate_to_entry(&store, &id("a"), Millis::ZERO).unwrap();
    nav.navigate_to_entry(&store, &id("b"), Millis::ZERO).unwrap();

    let change = nav.navigate_back(&store, 1, Millis::ZERO).unwrap();
    assert_eq!(change.current, Some(id("a")));

    let change = nav.navigate_back(&store, 99, Millis::ZERO).unwrap();
    assert_eq!(change.current, None);
    assert_eq!(change.url_path, "/");

    assert!(nav.navigate_back(&store, 1, Millis::ZERO).is_none());
}

#[test]
fn navigate_to_root_clears_stack() {
    let store = store();
    let mut nav = nav();
    nav.navigate_to_entry(&store, &id("a"), Millis::ZERO).unwrap();
    assert!(nav.navigate_to_root(&store, Millis::ZERO).is_some());
    assert!(nav.stack().is_empty());
    assert!(nav.navigate_to_root(&store, Millis::ZERO).is_none());
}

#[test]
fn navigate_to_path_sets_whole_stack() {
    let store = store();
    let mut nav = nav();
    let change = nav.navigate_to_path(&store, "/alpha/beta/gamma", Millis::ZERO).unwrap();
    assert_eq!(change.current, Some(id("c")));
    assert_eq!(nav.depth(), 3);
}

#[test]
fn navigate_to_bad_path_leaves_stack() {
    let store = store();
    let mut nav = nav();
    nav.navigate_to_entry(&store, &id("d"), Millis::ZERO).unwrap();
    assert!(nav.navigate_to_path(&store, "/alpha/nope", Millis::ZERO).is_err());
    assert_eq!(nav.stack(), &[id("d")]);
}

// ===== guard phase =====

#[test]
fn guard_phase_follows_fit_lifecycle() {
    let store = store();
    let mut nav = nav();
    nav.navigate_to_entry(&store, &id("a"), Millis::new(100)).unwrap();
    assert!(matches!(nav.phase(), NavPhase::Navigating { .. }));

    nav.on_fit_started(Millis::new(120));
    assert!(matches!(nav.phase(), NavPhase::Settling { .. }));
    assert!(nav.is_locked());

    nav.on_fit_complete();
    assert_eq!(nav.phase(), NavPhase::Idle);
}

#[test]
fn timeout_releases_lock_without_fit() {
    let store = store();
    let mut nav = nav();
    nav.navigate_to_entry(&store, &id("a"), Millis::new(1_000)).unwrap();

    assert!(!nav.tick(Millis::new(2_199)));
    assert!(nav.is_locked());
    assert!(nav.tick(Millis::new(2_200)));
    assert!(!nav.is_locked());
}

#[test]
fn fit_started_when_idle_is_ignored() {
    let mut nav = nav();
    nav.on_fit_started(Millis::new(5));
    assert_eq!(nav.phase(), NavPhase::Idle);
}

// ===== revalidate =====

#[test]
fn revalidate_truncates_at_deleted_level() {
    let mut store = store();
    let mut nav = nav();
    nav.navigate_to_path(&store, "/alpha/beta/gamma", Millis::ZERO).unwrap();

    store.remove_subtree(&id("b")).unwrap();
    assert!(!nav.is_consistent(&store));
    assert!(nav.revalidate(&store));
    assert_eq!(nav.stack(), &[id("a")]);
    assert!(nav.is_consistent(&store));
}

#[test]
fn revalidate_is_a_no_op_when_consistent() {
    let store = store();
    let mut nav = nav();
    nav.navigate_to_entry(&store, &id("a"), Millis::ZERO).unwrap();
    assert!(!nav.revalidate(&store));
}
