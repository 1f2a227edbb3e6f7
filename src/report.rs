//! Plain-text renderings used by the command-line tool.

use crate::camera::Camera;
use crate::layout::LayoutPlan;
use crate::model::EntryId;
use crate::navigation::slug;
use crate::store::{EntryStore, LoadWarning};
use std::fmt::Write;

/// Indented tree of slugs and ids, children in creation order.
pub fn render_tree(store: &EntryStore) -> String {
    let mut out = String::new();
    write_level(store, None, 0, &mut out);
    if out.is_empty() {
        out.push_str("(empty canvas)\n");
    }
    out
}

fn write_level(store: &EntryStore, parent: Option<&EntryId>, depth: usize, out: &mut String) {
    for (id, slug) in slug::sibling_slugs(store, parent) {
        let _ = writeln!(out, "{:indent$}{slug}  [{id}]", "", indent = depth * 2);
        write_level(store, Some(&id), depth + 1, out);
    }
}

/// Camera as `x=.. y=.. z=..`.
pub fn render_camera(camera: &Camera) -> String {
    format!("x={:.2} y={:.2} z={:.4}", camera.x, camera.y, camera.z)
}

/// One line per move followed by a summary line.
pub fn render_plan(plan: &LayoutPlan) -> String {
    let mut out = String::new();
    for m in &plan.moves {
        let _ = writeln!(
            out,
            "{}: ({:.1}, {:.1}) -> ({:.1}, {:.1})  moved {:.1}",
            m.id,
            m.from.x,
            m.from.y,
            m.to.x,
            m.to.y,
            m.displacement()
        );
    }
    let _ = writeln!(out, "groups: {}, moves: {}", plan.groups, plan.moves.len());
    out
}

/// Navigation stack as `id (slug)` segments from the root down.
pub fn render_stack(store: &EntryStore, stack: &[EntryId]) -> String {
    if stack.is_empty() {
        return "(root)".to_string();
    }
    stack
        .iter()
        .map(|id| {
            let slug = slug::slug_for(store, id).unwrap_or_default();
            format!("{id} ({slug})")
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

/// One line describing a repair made on load.
pub fn render_warning(warning: &LoadWarning) -> String {
    match warning {
        LoadWarning::DuplicateRecord(id) => format!("duplicate record {id}, kept the last copy"),
        LoadWarning::OrphanRehomed { id, missing_parent } => {
            format!("{id} referenced missing parent {missing_parent}, moved to root")
        }
        LoadWarning::CycleBroken(id) => format!("{id} was part of a parent cycle, moved to root"),
    }
}
