//! Layer views: one `<g>` group per rendering layer.

mod approx;
mod exact;
mod grid;
mod plain;
pub mod sync;

pub use approx::ApproxLayer;
pub use exact::ExactLayer;
pub use grid::GridLayer;
pub use plain::PlainLayer;

use crate::dom::{Dom, NodeId};
use crate::options::Sorting;

/// Implicit layer ids, in document order.
pub mod names {
    pub const GRID: &str = "grid";
    pub const BACK: &str = "back";
    pub const CELLS: &str = "cells";
    pub const LABELS: &str = "labels";
    pub const FRONT: &str = "front";
    pub const TOOLS: &str = "tools";

    pub const IMPLICIT: [&str; 6] = [GRID, BACK, CELLS, LABELS, FRONT, TOOLS];
}

pub const MODEL_ID_ATTR: &str = "model-id";

pub trait Layer {
    fn id(&self) -> &str;

    fn group(&self) -> NodeId;

    /// Whether cell views may be placed in this layer.
    fn holds_cells(&self) -> bool {
        false
    }

    /// Places a cell view root node for a cell with the given `z`.
    fn insert_cell_view(&mut self, dom: &mut Dom, node: NodeId, z: i64) {
        let _ = z;
        dom.append_child(self.group(), node);
    }

    /// Reorders cell nodes by z; `z_of` resolves a `model-id`.
    fn sort(&mut self, dom: &mut Dom, z_of: &dyn Fn(&str) -> Option<i64>) {
        let _ = (dom, z_of);
    }

    /// Drops all content and bookkeeping.
    fn reset(&mut self, dom: &mut Dom) {
        dom.clear_children(self.group());
    }

    /// Removes cell nodes whose model is no longer a graph member.
    fn prepare_remove(&mut self, dom: &mut Dom, is_member: &dyn Fn(&str) -> bool) -> usize {
        let orphans: Vec<NodeId> = dom
            .children(self.group())
            .iter()
            .copied()
            .filter(|n| {
                dom.attr(*n, MODEL_ID_ATTR)
                    .is_some_and(|id| !is_member(id))
            })
            .collect();
        for node in &orphans {
            dom.remove(*node);
        }
        orphans.len()
    }
}

/// Creates the `<g>` element for a layer; the caller attaches it.
pub(crate) fn create_group(dom: &mut Dom, id: &str) -> NodeId {
    let group = dom.create_element("g");
    dom.set_attr(group, "class", &format!("joint-{id}-layer joint-layer"));
    dom.set_attr(group, "layer-id", id);
    group
}

/// A layer able to hold cells, ordered according to `sorting`.
pub fn cell_layer(dom: &mut Dom, id: &str, sorting: Sorting) -> Box<dyn Layer> {
    let group = create_group(dom, id);
    match sorting {
        Sorting::Exact => Box::new(ExactLayer::new(id, group)),
        Sorting::Approx => Box::new(ApproxLayer::new(id, group)),
        Sorting::None => Box::new(PlainLayer::new(id, group, true)),
    }
}
