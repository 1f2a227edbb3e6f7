//! Canvas session: the owned context for one canvas.
//!
//! A [`CanvasSession`] owns the entry store, camera, navigation state, undo
//! log and save queue, and wires user gestures through them in the order
//!
//! ```text
//! gesture -> navigation/camera -> store -> undo log -> save queue -> host
//! ```
//!
//! Nothing here performs I/O or reads a clock. Operations take the host's
//! `now`, and everything the host must do in response is queued as a
//! [`CanvasEffect`] and collected with [`CanvasSession::drain_effects`].
//! Several sessions can live side by side.

use crate::camera::{fit_target, Camera, CameraAnimation, FitSettings};
use crate::enrichment::{self, PreviewApplied, PreviewResult};
use crate::layout::{self, LayoutAnimation, LayoutPlan, LayoutSettings};
use crate::model::{
    CanvasError, Entry, EntryId, Millis, NavigationError, Payload, PersistError, PersistedEntry, Point, Rect,
    RequestId, StoreError, Viewport,
};
use crate::navigation::{NavigationSettings, NavigationState};
use crate::persistence::{QueueSettings, SaveQueue, SyncEvent, WriteOutcome, WriteRequest};
use crate::store::{EntryStore, LoadWarning};
use crate::undo::{UndoAction, UndoLog, UndoOutcome, DEFAULT_UNDO_CAPACITY};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "canvas_tests.rs"]
mod tests;

/// Everything a session can be tuned with.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Save queue timing.
    pub queue: QueueSettings,
    /// Navigation lock timing.
    pub navigation: NavigationSettings,
    /// Zoom-to-fit animation.
    pub fit: FitSettings,
    /// Hub alignment tunables.
    pub layout: LayoutSettings,
    /// Undo actions kept before the oldest is evicted.
    pub undo_capacity: usize,
    /// World position of the home anchor shown at the root level.
    pub home_anchor: Point,
    /// Owner of the page being viewed, prefixed to URL paths when set.
    pub page_owner: Option<String>,
    /// Seed for id generation and layout jitter; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            queue: QueueSettings::default(),
            navigation: NavigationSettings::default(),
            fit: FitSettings::default(),
            layout: LayoutSettings::default(),
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            home_anchor: Point::ORIGIN,
            page_owner: None,
            seed: None,
        }
    }
}

/// Side effect requested from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEffect {
    /// Execute this write and report back through [`CanvasSession::complete_write`].
    Persist(WriteRequest),
    /// Replace the browser URL.
    UrlChanged(String),
    /// Fetch a link preview and hand it back through [`CanvasSession::apply_preview`].
    FetchPreview {
        /// Entry the link was found in.
        id: EntryId,
        /// Link to fetch.
        url: String,
        /// Entry text at request time, used to reject stale results.
        source_text: String,
    },
    /// The identity expired; prompt for sign-in.
    AuthRequired,
    /// A write failed permanently.
    WriteFailed {
        /// Entries whose local state was not saved.
        ids: Vec<EntryId>,
        /// Why the write failed.
        error: PersistError,
    },
    /// A navigation request could not be honoured.
    NavigationFailed(NavigationError),
    /// Something visible changed.
    RenderNeeded,
}

/// A committed edit from the text editor.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// New entry at the current navigation level.
    Create {
        /// Plain text.
        text: String,
        /// Rich-text rendering, if any.
        html: Option<String>,
        /// World position.
        position: Point,
        /// Creation time reported by the host.
        created_at: DateTime<Utc>,
    },
    /// New content for an existing entry. Blank text deletes it.
    Update {
        /// Entry being edited.
        id: EntryId,
        /// New plain text.
        text: String,
        /// New rich-text rendering.
        html: Option<String>,
    },
}

/// Result of a mutating gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new entry was created with this id.
    Created(EntryId),
    /// The entry's content changed.
    Updated(EntryId),
    /// Entries removed, parent-before-child.
    Deleted(Vec<EntryId>),
    /// Number of entries moved.
    Moved(usize),
    /// Nothing to do (blank new entry, identical text, empty drag).
    Unchanged,
    /// Refused: a navigation is settling or the session is read-only.
    Blocked,
}

/// Answer to a delete gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteRequest {
    /// The entry has descendants; [`CanvasSession::confirm_delete`] removes all `count`.
    NeedsConfirmation {
        /// Entry the delete starts from.
        id: EntryId,
        /// Entries that would be removed, `id` included.
        count: usize,
    },
    /// A leaf was removed straight away.
    Deleted(Vec<EntryId>),
    /// Refused: a navigation is settling or the session is read-only.
    Blocked,
}

/// State for one canvas.
#[derive(Debug)]
pub struct CanvasSession {
    settings: SessionSettings,
    store: EntryStore,
    camera: Camera,
    viewport: Viewport,
    navigation: NavigationState,
    undo: UndoLog,
    queue: SaveQueue,
    rng: StdRng,
    fit_animation: Option<CameraAnimation>,
    layout_animation: Option<LayoutAnimation>,
    pending_delete: Option<EntryId>,
    authenticated: bool,
    effects: Vec<CanvasEffect>,
}

impl CanvasSession {
    /// Empty session showing the root level.
    pub fn new(settings: SessionSettings, viewport: Viewport) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store: EntryStore::new(),
            camera: Camera::default(),
            viewport,
            navigation: NavigationState::new(settings.navigation),
            undo: UndoLog::new(settings.undo_capacity),
            queue: SaveQueue::new(settings.queue),
            rng,
            fit_animation: None,
            layout_animation: None,
            pending_delete: None,
            authenticated: true,
            effects: Vec::new(),
            settings,
        }
    }

    // ===== accessors =====

    /// Entries in this canvas.
    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Current camera.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Screen size the camera maps onto.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Navigation stack and lock.
    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    /// Undo history.
    pub fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    /// Pending and in-flight writes.
    pub fn queue(&self) -> &SaveQueue {
        &self.queue
    }

    /// Settings the session was built with.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Entries shown at the current level.
    pub fn visible_entries(&self) -> &[EntryId] {
        self.navigation.visible_entries(&self.store)
    }

    /// Whether writes are currently refused.
    pub fn is_read_only(&self) -> bool {
        !self.authenticated || self.queue.is_read_only()
    }

    /// Whether a fit or layout animation is running.
    pub fn is_animating(&self) -> bool {
        self.fit_animation.is_some() || self.layout_animation.is_some()
    }

    /// URL for the current view, with the page-owner prefix when set.
    pub fn url_path(&self) -> String {
        let path = self.navigation.url_path(&self.store);
        match &self.settings.page_owner {
            Some(owner) if path == "/" => format!("/{owner}"),
            Some(owner) => format!("/{owner}{path}"),
            None => path,
        }
    }

    /// Take every effect queued since the last call.
    pub fn drain_effects(&mut self) -> Vec<CanvasEffect> {
        std::mem::take(&mut self.effects)
    }

    // ===== lifecycle =====

    /// Replace the whole canvas with `records` from the retrieval API.
    ///
    /// Navigation, undo history, pending writes and animations are discarded.
    pub fn load<I>(&mut self, records: I) -> Vec<LoadWarning>
    where
        I: IntoIterator<Item = PersistedEntry>,
    {
        let (store, warnings) = EntryStore::from_records(records);
        info!(entries = store.len(), warnings = warnings.len(), "Canvas loaded");
        self.store = store;
        self.navigation = NavigationState::new(self.settings.navigation);
        self.undo = UndoLog::new(self.settings.undo_capacity);
        self.queue = SaveQueue::new(self.settings.queue);
        self.fit_animation = None;
        self.layout_animation = None;
        self.pending_delete = None;
        let url = self.url_path();
        self.effects.push(CanvasEffect::UrlChanged(url));
        self.render();
        warnings
    }

    /// Resize the screen area.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.render();
    }

    /// Report the auth state. Signing back in resumes any held writes.
    pub fn set_authenticated(&mut self, authenticated: bool, now: Millis) {
        if authenticated == self.authenticated && !(authenticated && self.queue.is_read_only()) {
            return;
        }
        self.authenticated = authenticated;
        if authenticated {
            self.queue.resume(now);
            info!("Session authenticated, writes resumed");
        } else {
            warn!("Session signed out, canvas is read-only");
        }
        self.render();
    }

    // ===== camera =====

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.camera.pan(dx, dy);
        self.render();
    }

    /// Zoom by `factor` around a screen point.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> bool {
        let changed = self.camera.zoom_at(anchor, factor);
        if changed {
            self.render();
        }
        changed
    }

    /// Zoom for one mouse wheel step around a screen point.
    pub fn wheel_zoom(&mut self, anchor: Point, delta_y: f64) -> bool {
        let changed = self.camera.wheel_zoom(anchor, delta_y);
        if changed {
            self.render();
        }
        changed
    }

    /// Animate the camera to frame the current level.
    ///
    /// Completes immediately when there is nothing to frame or the camera
    /// already frames it.
    pub fn fit_to_content(&mut self, now: Millis) {
        let target = fit_target(
            &self.camera,
            self.content_bounds(),
            self.viewport,
            &self.settings.fit,
        );
        match target {
            Some(target) if !target.approx_eq(&self.camera) => {
                debug!(z = target.z, "Zoom-to-fit started");
                self.fit_animation = Some(CameraAnimation::new(
                    self.camera,
                    target,
                    now,
                    self.settings.fit.duration_ms,
                ));
                self.navigation.on_fit_started(now);
            }
            _ => {
                self.fit_animation = None;
                self.navigation.on_fit_complete();
            }
        }
        self.render();
    }

    /// World bounds of the visible entries' footprints, plus the home anchor at the root.
    fn content_bounds(&self) -> Option<Rect> {
        let mut bounds = self
            .visible_entries()
            .iter()
            .filter_map(|id| self.store.get(id))
            .filter(|e| e.position.is_finite())
            .map(|e| layout::estimate_footprint(e).rect_at(e.position))
            .reduce(|a, b| a.union(&b));
        if self.navigation.current_view().is_none() {
            let anchor = self.settings.home_anchor;
            bounds = Some(match bounds {
                Some(b) => b.union_point(anchor),
                None => Rect::from_corners(anchor, anchor),
            });
        }
        bounds
    }

    // ===== navigation =====

    /// Enter a child of the current view.
    pub fn navigate_to_entry(&mut self, id: &EntryId, now: Millis) -> Result<(), NavigationError> {
        match self.navigation.navigate_to_entry(&self.store, id, now) {
            Ok(_) => {
                self.after_navigation(now);
                Ok(())
            }
            Err(err) => {
                self.effects.push(CanvasEffect::NavigationFailed(err.clone()));
                Err(err)
            }
        }
    }

    /// Go up `levels` levels.
    pub fn navigate_back(&mut self, levels: usize, now: Millis) -> bool {
        let moved = self.navigation.navigate_back(&self.store, levels, now).is_some();
        if moved {
            self.after_navigation(now);
        }
        moved
    }

    /// Return to the top level.
    pub fn navigate_to_root(&mut self, now: Millis) -> bool {
        let moved = self.navigation.navigate_to_root(&self.store, now).is_some();
        if moved {
            self.after_navigation(now);
        }
        moved
    }

    /// Open the view named by a URL path. Unknown paths fall back to the root.
    ///
    /// A page-owner prefix, when configured, is stripped first.
    pub fn navigate_to_path(&mut self, path: &str, now: Millis) -> Result<(), NavigationError> {
        let path = match &self.settings.page_owner {
            Some(owner) => {
                let trimmed = path.trim_start_matches('/');
                match trimmed.strip_prefix(owner.as_str()) {
                    Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
                    _ => path,
                }
            }
            None => path,
        };
        match self.navigation.navigate_to_path(&self.store, path, now) {
            Ok(_) => {
                self.after_navigation(now);
                Ok(())
            }
            Err(err) => {
                warn!(path, error = %err, "Unknown path, falling back to root");
                self.effects.push(CanvasEffect::NavigationFailed(err.clone()));
                self.navigate_to_root(now);
                Err(err)
            }
        }
    }

    fn after_navigation(&mut self, now: Millis) {
        self.pending_delete = None;
        let url = self.url_path();
        self.effects.push(CanvasEffect::UrlChanged(url));
        self.fit_to_content(now);
    }

    // ===== mutation =====

    fn guard(&self, action: &str) -> bool {
        if self.navigation.is_locked() {
            debug!(action, "Refused while navigation settles");
            return false;
        }
        if self.is_read_only() {
            debug!(action, "Refused while read-only");
            return false;
        }
        true
    }

    /// Commit the editor's content.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when updating an entry that no longer exists.
    pub fn commit_edit(&mut self, edit: Edit, now: Millis) -> Result<CommitOutcome, CanvasError> {
        if !self.guard("commit") {
            return Ok(CommitOutcome::Blocked);
        }
        match edit {
            Edit::Create {
                text,
                html,
                position,
                created_at,
            } => Ok(self.create_entry(text, html, Payload::Text, position, created_at, now)?),
            Edit::Update { id, text, html } => self.update_entry(id, text, html, now),
        }
    }

    fn create_entry(
        &mut self,
        text: String,
        html: Option<String>,
        payload: Payload,
        position: Point,
        created_at: DateTime<Utc>,
        now: Millis,
    ) -> Result<CommitOutcome, StoreError> {
        if text.trim().is_empty() {
            return Ok(CommitOutcome::Unchanged);
        }
        let id = loop {
            let candidate = EntryId::generate(now.get(), &mut self.rng);
            if !self.store.contains(&candidate) {
                break candidate;
            }
        };
        let parent = self.navigation.current_view().cloned();
        let mut entry = Entry::new(id.clone(), text, position, parent, created_at);
        entry.set_text(entry.text().to_string(), html);
        entry.payload = payload;
        self.store.insert(entry)?;

        info!(entry = %id, "Entry created");
        self.undo.push(UndoAction::Create { id: id.clone() });
        self.queue.record_upsert(id.clone(), now);
        self.request_preview(&id);
        self.render();
        Ok(CommitOutcome::Created(id))
    }

    /// Paste clipboard text as a new entry at `position` in the current view.
    ///
    /// A clipboard holding nothing but a media link becomes a media entry
    /// without a preview fetch.
    pub fn paste(
        &mut self,
        text: &str,
        position: Point,
        created_at: DateTime<Utc>,
        now: Millis,
    ) -> Result<CommitOutcome, CanvasError> {
        if !self.guard("paste") {
            return Ok(CommitOutcome::Blocked);
        }
        let payload = enrichment::media_payload(text).unwrap_or_default();
        Ok(self.create_entry(text.trim().to_string(), None, payload, position, created_at, now)?)
    }

    fn update_entry(
        &mut self,
        id: EntryId,
        text: String,
        html: Option<String>,
        now: Millis,
    ) -> Result<CommitOutcome, CanvasError> {
        if text.trim().is_empty() {
            let removed = self.delete_subtree(&id, now)?;
            return Ok(CommitOutcome::Deleted(removed));
        }
        let entry = self
            .store
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let html = crate::model::entry::normalize_html(html);
        if entry.text() == text && entry.text_html() == html.as_deref() {
            return Ok(CommitOutcome::Unchanged);
        }

        let undo = UndoAction::edit_of(entry);
        entry.set_text(text, html);
        // A card whose URL left the text no longer describes the entry.
        if let Payload::LinkCards { cards } = &entry.payload {
            let still_linked = cards.iter().any(|c| entry.text().contains(c.url.as_str()));
            if !still_linked {
                entry.payload = Payload::Text;
            }
        }

        self.undo.push(undo);
        self.queue.record_upsert(id.clone(), now);
        self.request_preview(&id);
        self.render();
        Ok(CommitOutcome::Updated(id))
    }

    /// Finish a drag of one or more entries. Written through immediately.
    pub fn drag_end(&mut self, moves: &[(EntryId, Point)], now: Millis) -> CommitOutcome {
        if !self.guard("drag") {
            return CommitOutcome::Blocked;
        }
        let dragged: Vec<EntryId> = moves.iter().map(|(id, _)| id.clone()).collect();
        self.release_from_layout(&dragged);
        let mut prior = Vec::with_capacity(moves.len());
        for (id, to) in moves {
            if !to.is_finite() {
                continue;
            }
            match self.store.set_position(id, *to) {
                Ok(from) if from != *to => {
                    prior.push((id.clone(), from));
                    self.queue.record_upsert(id.clone(), now);
                }
                Ok(_) => {}
                Err(err) => debug!(error = %err, "Dropped entry vanished mid-drag"),
            }
        }
        if prior.is_empty() {
            return CommitOutcome::Unchanged;
        }
        let moved = prior.len();
        self.undo.push(UndoAction::Move { prior });
        self.flush();
        self.render();
        CommitOutcome::Moved(moved)
    }

    /// Start deleting `id`. Entries with descendants need confirmation.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if `id` is unknown.
    pub fn request_delete(&mut self, id: &EntryId, now: Millis) -> Result<DeleteRequest, CanvasError> {
        if !self.guard("delete") {
            return Ok(DeleteRequest::Blocked);
        }
        if !self.store.contains(id) {
            return Err(StoreError::NotFound(id.clone()).into());
        }
        let descendants = self.store.descendants(id).len();
        if descendants == 0 {
            return Ok(DeleteRequest::Deleted(self.delete_subtree(id, now)?));
        }
        self.pending_delete = Some(id.clone());
        Ok(DeleteRequest::NeedsConfirmation {
            id: id.clone(),
            count: descendants + 1,
        })
    }

    /// Carry out the delete awaiting confirmation.
    pub fn confirm_delete(&mut self, now: Millis) -> Result<CommitOutcome, CanvasError> {
        if !self.guard("delete") {
            return Ok(CommitOutcome::Blocked);
        }
        let Some(id) = self.pending_delete.take() else {
            return Ok(CommitOutcome::Unchanged);
        };
        if !self.store.contains(&id) {
            return Ok(CommitOutcome::Unchanged);
        }
        Ok(CommitOutcome::Deleted(self.delete_subtree(&id, now)?))
    }

    /// Drop the delete awaiting confirmation.
    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    fn delete_subtree(&mut self, id: &EntryId, now: Millis) -> Result<Vec<EntryId>, StoreError> {
        let snapshot = self.store.remove_subtree(id)?;
        let ids: Vec<EntryId> = snapshot.iter().map(|e| e.id().clone()).collect();
        info!(entry = %id, count = ids.len(), "Entries deleted");
        for removed in &ids {
            self.queue.record_delete(removed.clone(), now);
        }
        self.undo.push(UndoAction::Delete { snapshot });
        self.flush();
        self.revalidate_navigation();
        self.render();
        Ok(ids)
    }

    /// Revert the most recent action.
    ///
    /// Returns `None` when blocked or when there is nothing to undo.
    pub fn perform_undo(&mut self, now: Millis) -> Option<UndoOutcome> {
        if !self.guard("undo") {
            return None;
        }
        let outcome = self.undo.perform_undo(&mut self.store)?;
        let touched: Vec<EntryId> = outcome.restored.iter().chain(&outcome.removed).cloned().collect();
        self.release_from_layout(&touched);
        for id in &outcome.restored {
            self.queue.record_upsert(id.clone(), now);
        }
        for id in &outcome.removed {
            self.queue.record_delete(id.clone(), now);
        }
        for id in &outcome.restored {
            self.request_preview(id);
        }
        self.flush();
        self.revalidate_navigation();
        self.render();
        Some(outcome)
    }

    /// Run hub alignment over the entries on screen and start animating it.
    ///
    /// # Errors
    /// [`NavigationError::Locked`] while a navigation settles.
    pub fn auto_layout(&mut self, now: Millis) -> Result<LayoutPlan, CanvasError> {
        if self.navigation.is_locked() {
            return Err(NavigationError::Locked.into());
        }
        if self.is_read_only() || self.layout_animation.is_some() {
            return Ok(LayoutPlan::default());
        }
        let candidates = self.visible_entries().to_vec();
        let view = self.camera.visible_world_rect(self.viewport);
        let plan = layout::plan_hub_alignment(
            &self.store,
            &candidates,
            view,
            &self.settings.layout,
            &mut self.rng,
        );
        if plan.is_empty() {
            return Ok(plan);
        }
        let duration = self.settings.layout.pick_duration(&mut self.rng);
        info!(moves = plan.moves.len(), groups = plan.groups, duration, "Auto-layout started");
        self.layout_animation = Some(LayoutAnimation::new(plan.moves.clone(), now, duration));
        self.render();
        Ok(plan)
    }

    // ===== host callbacks =====

    /// Advance animations, timeouts and the save queue to `now`.
    pub fn tick(&mut self, now: Millis) {
        self.navigation.tick(now);

        if let Some(animation) = &self.fit_animation {
            let step = animation.sample(now);
            self.camera = step.camera;
            if step.finished {
                debug!("Zoom-to-fit finished");
                self.fit_animation = None;
                self.navigation.on_fit_complete();
            }
            self.render();
        }

        if let Some(animation) = &self.layout_animation {
            let frame = animation.sample(now);
            for (id, position) in &frame.positions {
                // Entries deleted mid-animation are skipped.
                let _ = self.store.set_position(id, *position);
            }
            if frame.finished {
                self.finish_layout(now);
            }
            self.render();
        }

        let requests = self.queue.poll(now, &self.store);
        self.push_requests(requests);
    }

    fn finish_layout(&mut self, now: Millis) {
        let Some(animation) = self.layout_animation.take() else {
            return;
        };
        let prior: Vec<(EntryId, Point)> = animation
            .moves()
            .iter()
            .filter(|m| self.store.contains(&m.id))
            .map(|m| (m.id.clone(), m.from))
            .collect();
        if prior.is_empty() {
            return;
        }
        for (id, _) in &prior {
            self.queue.record_upsert(id.clone(), now);
        }
        info!(moved = prior.len(), "Auto-layout committed");
        self.undo.push(UndoAction::Move { prior });
        self.flush();
    }

    /// Report the outcome of a [`CanvasEffect::Persist`] request.
    pub fn complete_write(&mut self, request_id: RequestId, outcome: WriteOutcome, now: Millis) -> Vec<SyncEvent> {
        let events = self.queue.complete(request_id, outcome, now);
        for event in &events {
            match event {
                SyncEvent::AuthRequired => {
                    self.authenticated = false;
                    self.effects.push(CanvasEffect::AuthRequired);
                }
                SyncEvent::Rejected { ids, error } | SyncEvent::GaveUp { ids, error } => {
                    self.effects.push(CanvasEffect::WriteFailed {
                        ids: ids.clone(),
                        error: error.clone(),
                    });
                }
                SyncEvent::Saved { .. } | SyncEvent::RetryScheduled { .. } | SyncEvent::Superseded { .. } => {}
            }
        }
        events
    }

    /// Hand back a link preview requested through [`CanvasEffect::FetchPreview`].
    pub fn apply_preview(&mut self, result: PreviewResult, now: Millis) -> PreviewApplied {
        let id = result.id.clone();
        let applied = enrichment::apply_preview(&mut self.store, result);
        if applied == PreviewApplied::Attached {
            self.queue.record_upsert(id, now);
            self.render();
        }
        applied
    }

    // ===== helpers =====

    fn request_preview(&mut self, id: &EntryId) {
        let Some(entry) = self.store.get(id) else {
            return;
        };
        if !matches!(entry.payload, Payload::Text) {
            return;
        }
        if let Some(url) = enrichment::extract_url(entry.text()) {
            self.effects.push(CanvasEffect::FetchPreview {
                id: id.clone(),
                url: url.to_string(),
                source_text: entry.text().to_string(),
            });
        }
    }

    /// Hand `ids` back from a running layout so its frames stop overwriting them.
    ///
    /// Released entries are left out of the layout's final write and undo step.
    fn release_from_layout(&mut self, ids: &[EntryId]) {
        let Some(animation) = &mut self.layout_animation else {
            return;
        };
        let released = animation.release(ids);
        if released > 0 {
            debug!(released, "Entries taken over from running layout");
        }
        if animation.is_empty() {
            debug!("Auto-layout abandoned, every entry was taken over");
            self.layout_animation = None;
        }
    }

    fn flush(&mut self) {
        let requests = self.queue.flush_now(&self.store);
        self.push_requests(requests);
    }

    fn push_requests(&mut self, requests: Vec<WriteRequest>) {
        self.effects.extend(requests.into_iter().map(CanvasEffect::Persist));
    }

    fn revalidate_navigation(&mut self) {
        if self.navigation.revalidate(&self.store) {
            let url = self.url_path();
            self.effects.push(CanvasEffect::UrlChanged(url));
        }
    }

    fn render(&mut self) {
        if !self.effects.contains(&CanvasEffect::RenderNeeded) {
            self.effects.push(CanvasEffect::RenderNeeded);
        }
    }
}
