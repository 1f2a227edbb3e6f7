//! nestcanvas
//!
//! Interaction engine for an infinite canvas of nested entries.
//!
//! The crate follows a Pure Core / Impure Shell architecture: every component
//! is an owned state object driven by explicit `now` timestamps, and side
//! effects (network writes, URL updates, preview fetches) are handed back to
//! the host as values. [`canvas::CanvasSession`] ties the components together.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod enrichment;
pub mod layout;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod persistence;
pub mod report;
pub mod store;
pub mod undo;
