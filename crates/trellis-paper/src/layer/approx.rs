use std::collections::BTreeMap;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::dom::{Dom, NodeId};

use super::Layer;

/// Layer that buckets cell nodes by z behind lazily created pivot comments.
///
/// The pivot for `z` marks the end of the `z` bucket. Nodes are inserted right before their
/// pivot, so a bucket keeps insertion order and buckets stay z-monotonic without ever
/// sorting. The bucket each node was last inserted into is remembered, so a reinsert into the
/// same bucket costs a lookup.
#[derive(Debug)]
pub struct ApproxLayer {
    id: String,
    group: NodeId,
    pivots: BTreeMap<i64, NodeId>,
    buckets: HashMap<NodeId, i64, FxBuildHasher>,
}

impl ApproxLayer {
    pub fn new(id: &str, group: NodeId) -> Self {
        Self {
            id: id.to_string(),
            group,
            pivots: BTreeMap::new(),
            buckets: HashMap::default(),
        }
    }

    /// Returns the pivot for `z`, creating it after the pivot of the closest smaller z (or as
    /// the first child).
    pub fn pivot(&mut self, dom: &mut Dom, z: i64) -> NodeId {
        if let Some(pivot) = self.pivots.get(&z) {
            return *pivot;
        }
        let pivot = dom.create_comment(&format!("z-index:{}", z.saturating_add(1)));
        let reference = match self.pivots.range(..z).next_back() {
            Some((_, neighbor)) => dom.next_sibling(*neighbor),
            None => dom.first_child(self.group),
        };
        dom.insert_before(self.group, pivot, reference);
        self.pivots.insert(z, pivot);
        pivot
    }

    pub fn pivot_count(&self) -> usize {
        self.pivots.len()
    }

    /// Drops bucket entries of nodes that left the group.
    fn prune(&mut self, dom: &Dom) {
        let group = self.group;
        if self.buckets.len() > 2 * dom.children(group).len() + 16 {
            self.buckets.retain(|node, _| dom.parent(*node) == Some(group));
        }
    }
}

impl Layer for ApproxLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn group(&self) -> NodeId {
        self.group
    }

    fn holds_cells(&self) -> bool {
        true
    }

    fn insert_cell_view(&mut self, dom: &mut Dom, node: NodeId, z: i64) {
        if dom.parent(node) == Some(self.group) && self.buckets.get(&node) == Some(&z) {
            return;
        }
        let pivot = self.pivot(dom, z);
        dom.insert_before(self.group, node, Some(pivot));
        self.buckets.insert(node, z);
        self.prune(dom);
    }

    fn reset(&mut self, dom: &mut Dom) {
        self.pivots.clear();
        self.buckets.clear();
        dom.clear_children(self.group);
    }
}
