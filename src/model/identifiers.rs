//! Core identifier newtypes with smart constructors.
//!
//! Identifiers validate their raw string at construction time.
//! Raw constructors are never exported - use smart constructors only.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a canvas entry, scoped to one user.
///
/// Opaque to the core: the only guarantee is that it is non-blank.
/// Ordering is lexicographic and only used as a deterministic tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId(String);

impl EntryId {
    /// Smart constructor: rejects empty and whitespace-only ids.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidEntryId> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(InvalidEntryId::Empty);
        }
        Ok(Self(raw))
    }

    /// Mint a fresh id for a locally created entry.
    ///
    /// Format is `entry-<millis base36>-<6 alphanumerics>`; the random tail keeps
    /// two entries created in the same millisecond apart.
    pub fn generate<R: Rng + ?Sized>(now_millis: u64, rng: &mut R) -> Self {
        let tail: String = rng
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self(format!("entry-{}-{}", to_base36(now_millis), tail))
    }

    /// The id as sent on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntryId {
    type Error = InvalidEntryId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.0
    }
}

/// Identifier for an in-flight persistence request.
///
/// Allocated monotonically by the save queue; the host echoes it back when the
/// request completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw request number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw request number.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

// ===== Error Types =====

/// Reasons an entry id is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidEntryId {
    /// The id was empty or only whitespace.
    #[error("Entry ID cannot be empty")]
    Empty,
}

// ===== Tests =====
