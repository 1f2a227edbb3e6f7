//! Link preview requests and their results.
//!
//! The core only decides *when* a preview is wanted and whether a returned
//! preview still applies. Fetching is the host's job.

use crate::model::{EntryId, LinkCard, MediaCard, MediaKind, Payload};
use crate::store::EntryStore;
use tracing::debug;

/// Characters that end a URL when they trail it in prose.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\''];

/// Preview fetched by the host for an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewResult {
    /// Entry the preview was requested for.
    pub id: EntryId,
    /// Entry text at the time the fetch was requested.
    pub source_text: String,
    /// `None` when the fetch failed.
    pub card: Option<LinkCard>,
}

/// What happened to a preview handed back to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewApplied {
    /// The entry's payload now shows the preview.
    Attached,
    /// The entry was deleted or edited since the request; nothing changed.
    Stale,
    /// The fetch failed or the entry shows other content; plain text kept.
    Skipped,
}

/// First `http://` or `https://` URL in `text`, with trailing punctuation removed.
pub fn extract_url(text: &str) -> Option<&str> {
    text.split_whitespace().find_map(|token| {
        let start = token.find("https://").or_else(|| token.find("http://"))?;
        let url = token[start..].trim_end_matches(TRAILING_PUNCTUATION);
        let rest = url.split_once("://").map_or("", |(_, rest)| rest);
        (!rest.is_empty()).then_some(url)
    })
}

/// Media kind implied by the URL's file extension, if any.
pub fn media_kind(url: &str) -> Option<MediaKind> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let (_, ext) = path.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" => Some(MediaKind::Image),
        "mp4" | "webm" | "mov" => Some(MediaKind::Video),
        "mp3" | "wav" | "ogg" | "m4a" => Some(MediaKind::Audio),
        "pdf" => Some(MediaKind::Document),
        _ => None,
    }
}

/// Media payload for text that is nothing but a link to a media file.
pub fn media_payload(text: &str) -> Option<Payload> {
    let text = text.trim();
    let url = extract_url(text).filter(|url| *url == text)?;
    Some(Payload::Media {
        card: MediaCard {
            kind: media_kind(url)?,
            url: url.to_string(),
            title: None,
        },
    })
}

/// Whether `result` still describes the entry as it is now.
pub fn is_relevant(store: &EntryStore, result: &PreviewResult) -> bool {
    store
        .get(&result.id)
        .is_some_and(|entry| entry.text() == result.source_text)
}

/// Attach a preview to its entry if it is still relevant.
///
/// Only plain-text and link-card entries are touched; media and LaTeX
/// payloads win over a late preview.
pub fn apply_preview(store: &mut EntryStore, result: PreviewResult) -> PreviewApplied {
    if !is_relevant(store, &result) {
        debug!(entry = %result.id, "Discarding stale preview");
        return PreviewApplied::Stale;
    }
    let Some(card) = result.card else {
        debug!(entry = %result.id, "Preview fetch failed, keeping plain text");
        return PreviewApplied::Skipped;
    };
    let Some(entry) = store.get_mut(&result.id) else {
        return PreviewApplied::Stale;
    };
    if !matches!(entry.payload, Payload::Text | Payload::LinkCards { .. }) {
        return PreviewApplied::Skipped;
    }
    entry.payload = match media_kind(&card.url) {
        Some(kind) => Payload::Media {
            card: MediaCard {
                kind,
                url: card.url,
                title: card.title,
            },
        },
        None => Payload::LinkCards { cards: vec![card] },
    };
    PreviewApplied::Attached
}
