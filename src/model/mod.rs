//! Domain model: identifiers, geometry, entries and errors.

pub mod clock;
pub mod entry;
pub mod error;
pub mod geometry;
pub mod identifiers;

pub use clock::Millis;
pub use entry::{
    Entry, LatexBlock, LinkCard, MediaCard, MediaKind, Payload, PersistedEntry,
};
pub use error::{CanvasError, NavigationError, PersistError, StoreError};
pub use geometry::{Point, Rect, Viewport};
pub use identifiers::{EntryId, InvalidEntryId, RequestId};
