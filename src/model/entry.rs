//! Canvas entry records.
//!
//! [`Entry`] is the in-memory node owned by the entry store. [`PersistedEntry`]
//! is its wire shape as exchanged with the persistence and retrieval APIs.

use super::geometry::Point;
use super::identifiers::EntryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;

/// Preview card produced by link enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCard {
    /// Link the card points at.
    pub url: String,
    /// Page title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Preview image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Page description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Kind of embedded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Video clip.
    Video,
    /// Audio clip.
    Audio,
    /// PDF or similar document.
    Document,
}

/// Media card (image, video, ...) attached to an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCard {
    /// Kind of media.
    pub kind: MediaKind,
    /// Where the media lives.
    pub url: String,
    /// Caption, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// LaTeX source rendered as a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatexBlock {
    /// LaTeX source.
    pub source: String,
}

/// What an entry displays besides its text. Mutually exclusive per entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Payload {
    /// Plain text only.
    #[default]
    Text,
    /// One or more link preview cards.
    LinkCards {
        /// Cards in the order their links appear.
        cards: Vec<LinkCard>,
    },
    /// A single media card.
    Media {
        /// The embedded media.
        card: MediaCard,
    },
    /// A LaTeX block.
    Latex {
        /// The rendered block.
        block: LatexBlock,
    },
}

impl Payload {
    /// True for plain text entries.
    pub fn is_text(&self) -> bool {
        matches!(self, Payload::Text)
    }
}

/// A single canvas node.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    id: EntryId,
    text: String,
    text_html: Option<String>,
    /// World position of the top-left corner.
    pub position: Point,
    parent: Option<EntryId>,
    /// Extra content shown with the text.
    pub payload: Payload,
    created_at: DateTime<Utc>,
}

impl Entry {
    /// New plain-text entry.
    pub fn new(
        id: EntryId,
        text: impl Into<String>,
        position: Point,
        parent: Option<EntryId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            text_html: None,
            position,
            parent,
            payload: Payload::Text,
            created_at,
        }
    }

    /// Stable id.
    pub fn id(&self) -> &EntryId {
        &self.id
    }

    /// Plain text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Rich-text rendering, if any.
    pub fn text_html(&self) -> Option<&str> {
        self.text_html.as_deref()
    }

    /// Containing entry; `None` at the root.
    pub fn parent(&self) -> Option<&EntryId> {
        self.parent.as_ref()
    }

    /// Creation time.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replace the content. `html` is kept only if it carries formatting markup.
    pub fn set_text(&mut self, text: impl Into<String>, html: Option<String>) {
        self.text = text.into();
        self.text_html = normalize_html(html);
    }

    /// Re-link to another parent. Only the store calls this, after cycle checks.
    pub(crate) fn set_parent(&mut self, parent: Option<EntryId>) {
        self.parent = parent;
    }

    /// Title used for slugs: the first non-blank line, trimmed.
    pub fn title(&self) -> &str {
        self.text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }

    /// Rebuild from the wire shape.
    pub fn from_record(record: PersistedEntry) -> Self {
        Self {
            id: record.id,
            text: record.text,
            text_html: normalize_html(record.text_html),
            position: record.position,
            parent: record.parent_entry_id,
            payload: record.payload.unwrap_or_default(),
            created_at: record.created_at,
        }
    }

    /// Snapshot in wire shape.
    pub fn to_record(&self) -> PersistedEntry {
        PersistedEntry {
            id: self.id.clone(),
            text: self.text.clone(),
            text_html: self.text_html.clone(),
            position: self.position,
            parent_entry_id: self.parent.clone(),
            payload: if self.payload.is_text() {
                None
            } else {
                Some(self.payload.clone())
            },
            created_at: self.created_at,
        }
    }
}

/// Persisted per-entry record, camelCase on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEntry {
    /// Stable id.
    pub id: EntryId,
    /// Plain text.
    pub text: String,
    /// Rich-text rendering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_html: Option<String>,
    /// World position.
    pub position: Point,
    /// Containing entry; `null` at the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_entry_id: Option<EntryId>,
    /// Extra content; absent for plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Keep `html` only when it contains at least one tag such as `<b>` or `</i>`.
pub fn normalize_html(html: Option<String>) -> Option<String> {
    html.filter(|h| has_markup(h))
}

fn has_markup(html: &str) -> bool {
    let bytes = html.as_bytes();
    bytes.windows(2).any(|w| {
        w[0] == b'<' && (w[1].is_ascii_alphabetic() || w[1] == b'/')
    })
}
