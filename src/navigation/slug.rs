//! URL slugs for the navigation stack.
//!
//! Slugs are derived at traversal time from entry titles and are never
//! persisted. Disambiguation is computed from the live sibling set, so a
//! suffix can shift when siblings are added or removed.

use crate::model::{EntryId, NavigationError};
use crate::store::EntryStore;
use std::collections::HashSet;

/// Maximum length of a slug before any disambiguation suffix.
pub const MAX_SLUG_LEN: usize = 17;

/// Slug used when a title has no alphanumeric content.
pub const EMPTY_SLUG: &str = "untitled";

/// Turn a title into a URL segment.
///
/// Lowercases, drops anything that is not an ASCII letter, digit or
/// whitespace, joins words with single hyphens and truncates to
/// [`MAX_SLUG_LEN`] characters.
pub fn slugify(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    let truncated: String = joined.chars().take(MAX_SLUG_LEN).collect();
    let trimmed = truncated.trim_matches('-');
    if trimmed.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Slugs for every child of `parent`, in creation order, with `-2`, `-3`, ...
/// appended to later siblings whose slug is already taken.
pub fn sibling_slugs(store: &EntryStore, parent: Option<&EntryId>) -> Vec<(EntryId, String)> {
    let mut used: HashSet<String> = HashSet::new();
    store
        .children_of(parent)
        .iter()
        .filter_map(|id| {
            let entry = store.get(id)?;
            let base = slugify(entry.title());
            let mut candidate = base.clone();
            let mut n = 2;
            while used.contains(&candidate) {
                candidate = format!("{base}-{n}");
                n += 1;
            }
            used.insert(candidate.clone());
            Some((id.clone(), candidate))
        })
        .collect()
}

/// The disambiguated slug of one entry among its current siblings.
pub fn slug_for(store: &EntryStore, id: &EntryId) -> Option<String> {
    let parent = store.get(id)?.parent();
    sibling_slugs(store, parent)
        .into_iter()
        .find(|(sibling, _)| sibling == id)
        .map(|(_, slug)| slug)
}

/// URL path for a navigation stack: `/` at the root, `/a/b` below it.
pub fn url_path(store: &EntryStore, stack: &[EntryId]) -> String {
    let segments: Vec<String> = stack
        .iter()
        .map(|id| slug_for(store, id).unwrap_or_else(|| EMPTY_SLUG.to_string()))
        .collect();
    format!("/{}", segments.join("/"))
}

/// Resolve a slug path back to a navigation stack.
///
/// Empty segments are ignored, so `/`, `` and `//` all resolve to the root.
///
/// # Errors
/// [`NavigationError::NotFound`] naming the first segment with no matching sibling.
pub fn resolve_path(store: &EntryStore, path: &str) -> Result<Vec<EntryId>, NavigationError> {
    let mut stack: Vec<EntryId> = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let next = sibling_slugs(store, stack.last())
            .into_iter()
            .find(|(_, slug)| slug == segment)
            .map(|(id, _)| id)
            .ok_or_else(|| NavigationError::NotFound(segment.to_string()))?;
        stack.push(next);
    }
    Ok(stack)
}
