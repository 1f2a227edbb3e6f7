//! Entry store: the single owner of every entry on a canvas.
//!
//! Arena-style storage keyed by [`EntryId`] plus a child index kept in creation
//! order. Visual elements and every other component refer to entries by id
//! only; nothing else owns an `Entry`.
//!
//! # Invariants
//! - Every `parent` reference points at an entry in the store.
//! - Parent links never form a cycle.
//! - `children_of(p)` lists exactly the entries whose parent is `p`, ordered by
//!   `(created_at, id)`.

use crate::model::{Entry, EntryId, PersistedEntry, Point, StoreError};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// Problems found while rebuilding a store from remote records.
///
/// None of these abort the load; they are repaired and reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// A record appeared twice; the later copy replaced the earlier one.
    DuplicateRecord(EntryId),
    /// The record's parent was absent, so it was moved to the root.
    OrphanRehomed {
        /// The re-homed record.
        id: EntryId,
        /// Parent id the record named.
        missing_parent: EntryId,
    },
    /// The record's parent chain looped back on itself; it was moved to the root.
    CycleBroken(EntryId),
}

/// Tree-structured mapping of entry ids to entries.
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    entries: HashMap<EntryId, Entry>,
    /// Child lists keyed by parent (`None` = implicit root).
    children: HashMap<Option<EntryId>, Vec<EntryId>>,
}

impl EntryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from records returned by the retrieval API.
    ///
    /// Records are expected in creation order, but parents are resolved only
    /// after every record is known, so a child listed before its parent is fine.
    pub fn from_records<I>(records: I) -> (Self, Vec<LoadWarning>)
    where
        I: IntoIterator<Item = PersistedEntry>,
    {
        let mut warnings = Vec::new();
        let mut entries: HashMap<EntryId, Entry> = HashMap::new();

        for record in records {
            let entry = Entry::from_record(record);
            if entries.contains_key(entry.id()) {
                warnings.push(LoadWarning::DuplicateRecord(entry.id().clone()));
            }
            entries.insert(entry.id().clone(), entry);
        }

        // Orphans go to the root.
        let orphans: Vec<(EntryId, EntryId)> = entries
            .values()
            .filter_map(|e| {
                let parent = e.parent()?;
                (!entries.contains_key(parent)).then(|| (e.id().clone(), parent.clone()))
            })
            .collect();
        for (id, missing_parent) in orphans {
            if let Some(entry) = entries.get_mut(&id) {
                entry.set_parent(None);
            }
            warn!(entry = %id, parent = %missing_parent, "Parent missing on load, re-homing to root");
            warnings.push(LoadWarning::OrphanRehomed { id, missing_parent });
        }

        // Break cycles deterministically: visit ids in sorted order and cut the
        // first entry found on a loop.
        let mut ids: Vec<EntryId> = entries.keys().cloned().collect();
        ids.sort();
        for id in ids {
            if let Some(culprit) = find_cycle_from(&entries, &id) {
                if let Some(entry) = entries.get_mut(&culprit) {
                    entry.set_parent(None);
                }
                warn!(entry = %culprit, "Parent cycle on load, re-homing to root");
                warnings.push(LoadWarning::CycleBroken(culprit));
            }
        }

        let mut store = Self {
            entries,
            children: HashMap::new(),
        };
        store.rebuild_index();
        (store, warnings)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    /// Entry by id.
    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Mutable access for content and position edits.
    ///
    /// Parent links are not reachable through this; use [`EntryStore::reparent`].
    pub fn get_mut(&mut self, id: &EntryId) -> Option<&mut Entry> {
        self.entries.get_mut(id)
    }

    /// Iterate over every entry in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Insert a new entry.
    ///
    /// # Errors
    /// - [`StoreError::DuplicateId`] if the id is taken
    /// - [`StoreError::UnknownParent`] if the parent is absent
    /// - [`StoreError::Cycle`] if the entry names itself as parent
    pub fn insert(&mut self, entry: Entry) -> Result<(), StoreError> {
        let id = entry.id().clone();
        if self.entries.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }
        if let Some(parent) = entry.parent() {
            if parent == &id {
                return Err(StoreError::Cycle {
                    id,
                    parent: parent.clone(),
                });
            }
            if !self.entries.contains_key(parent) {
                return Err(StoreError::UnknownParent {
                    id,
                    parent: parent.clone(),
                });
            }
        }
        let parent = entry.parent().cloned();
        self.entries.insert(id.clone(), entry);
        self.index_child(parent, id);
        Ok(())
    }

    /// Move an entry to a position. Returns the previous position.
    pub fn set_position(&mut self, id: &EntryId, position: Point) -> Result<Point, StoreError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(std::mem::replace(&mut entry.position, position))
    }

    /// Change an entry's parent, refusing anything that would form a cycle.
    pub fn reparent(&mut self, id: &EntryId, new_parent: Option<EntryId>) -> Result<(), StoreError> {
        let current = self
            .entries
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?
            .parent()
            .cloned();
        if current == new_parent {
            return Ok(());
        }
        if let Some(parent) = &new_parent {
            if !self.entries.contains_key(parent) {
                return Err(StoreError::UnknownParent {
                    id: id.clone(),
                    parent: parent.clone(),
                });
            }
            if parent == id || self.is_ancestor(id, parent) {
                return Err(StoreError::Cycle {
                    id: id.clone(),
                    parent: parent.clone(),
                });
            }
        }

        self.unindex_child(&current, id);
        if let Some(entry) = self.entries.get_mut(id) {
            entry.set_parent(new_parent.clone());
        }
        self.index_child(new_parent, id.clone());
        Ok(())
    }

    /// Remove an entry and all of its descendants.
    ///
    /// Returns the removed entries ordered parent-before-child, which is the
    /// order [`EntryStore::restore`] needs to re-insert them.
    pub fn remove_subtree(&mut self, id: &EntryId) -> Result<Vec<Entry>, StoreError> {
        if !self.entries.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        let mut order = vec![id.clone()];
        order.extend(self.descendants(id));

        let parent = self.entries.get(id).and_then(|e| e.parent().cloned());
        self.unindex_child(&parent, id);

        let removed = order
            .iter()
            .filter_map(|victim| {
                self.children.remove(&Some(victim.clone()));
                self.entries.remove(victim)
            })
            .collect();
        Ok(removed)
    }

    /// Re-insert a parent-before-child snapshot produced by `remove_subtree`.
    ///
    /// All-or-nothing: if any entry cannot be inserted, the ones already
    /// restored are removed again and the error is returned.
    pub fn restore(&mut self, snapshot: Vec<Entry>) -> Result<(), StoreError> {
        let mut inserted: Vec<EntryId> = Vec::with_capacity(snapshot.len());
        for entry in snapshot {
            let id = entry.id().clone();
            if let Err(err) = self.insert(entry) {
                for done in inserted.iter().rev() {
                    let _ = self.remove_subtree(done);
                }
                return Err(err);
            }
            inserted.push(id);
        }
        Ok(())
    }

    /// Direct children of `parent` (`None` = root) in creation order.
    pub fn children_of(&self, parent: Option<&EntryId>) -> &[EntryId] {
        self.children
            .get(&parent.cloned())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All descendants of `id` in breadth-first order (parents before children).
    pub fn descendants(&self, id: &EntryId) -> Vec<EntryId> {
        let mut out = Vec::new();
        let mut queue: VecDeque<&EntryId> = VecDeque::new();
        queue.push_back(id);
        while let Some(current) = queue.pop_front() {
            for child in self.children_of(Some(current)) {
                out.push(child.clone());
                queue.push_back(child);
            }
        }
        out
    }

    /// Path from the root down to and including `id`.
    pub fn ancestry(&self, id: &EntryId) -> Result<Vec<EntryId>, StoreError> {
        let mut path = Vec::new();
        let mut cursor = Some(id.clone());
        while let Some(current) = cursor {
            let entry = self
                .entries
                .get(&current)
                .ok_or_else(|| StoreError::NotFound(current.clone()))?;
            cursor = entry.parent().cloned();
            path.push(current);
        }
        path.reverse();
        Ok(path)
    }

    /// Whether `ancestor` appears on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: &EntryId, id: &EntryId) -> bool {
        let mut cursor = self.entries.get(id).and_then(|e| e.parent());
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.entries.get(current).and_then(|e| e.parent());
        }
        false
    }

    /// Snapshot every entry in wire shape, parents before children.
    pub fn to_records(&self) -> Vec<PersistedEntry> {
        let mut out = Vec::with_capacity(self.entries.len());
        let mut queue: VecDeque<Option<&EntryId>> = VecDeque::new();
        queue.push_back(None);
        while let Some(parent) = queue.pop_front() {
            for child in self.children_of(parent) {
                if let Some(entry) = self.entries.get(child) {
                    out.push(entry.to_record());
                }
                queue.push_back(Some(child));
            }
        }
        out
    }

    fn index_child(&mut self, parent: Option<EntryId>, id: EntryId) {
        let key = self
            .entries
            .get(&id)
            .map(|e| (e.created_at(), e.id().clone()));
        let list = self.children.entry(parent).or_default();
        let Some(key) = key else {
            list.push(id);
            return;
        };
        let entries = &self.entries;
        let pos = list.partition_point(|sibling| {
            entries
                .get(sibling)
                .map(|s| (s.created_at(), s.id().clone()) < key)
                .unwrap_or(true)
        });
        list.insert(pos, id);
    }

    fn unindex_child(&mut self, parent: &Option<EntryId>, id: &EntryId) {
        if let Some(list) = self.children.get_mut(parent) {
            list.retain(|c| c != id);
            if list.is_empty() {
                self.children.remove(parent);
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.children.clear();
        let mut ids: Vec<(chrono::DateTime<chrono::Utc>, EntryId, Option<EntryId>)> = self
            .entries
            .values()
            .map(|e| (e.created_at(), e.id().clone(), e.parent().cloned()))
            .collect();
        ids.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        for (_, id, parent) in ids {
            self.children.entry(parent).or_default().push(id);
        }
    }
}

/// Walk the parent chain from `start`; if it loops, return the entry whose
/// parent link closes the loop.
fn find_cycle_from(entries: &HashMap<EntryId, Entry>, start: &EntryId) -> Option<EntryId> {
    let mut seen: HashSet<&EntryId> = HashSet::new();
    let mut cursor = Some(start);
    let mut last: Option<&EntryId> = None;
    while let Some(current) = cursor {
        if !seen.insert(current) {
            return last.cloned();
        }
        last = Some(current);
        cursor = entries.get(current).and_then(|e| e.parent());
    }
    None
}
