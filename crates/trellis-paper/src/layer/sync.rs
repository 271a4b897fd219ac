//! When graph activity should resort the cell layers.
//!
//! Many z mutations inside one sort-delaying batch produce a single resort, run when the last
//! such batch closes.

use trellis_graph::BatchSnapshot;

use crate::flags::{UpdateFlag, UpdateFlags};
use crate::options::Sorting;

pub const SORT_DELAYING_BATCHES: [&str; 4] = ["add", "reset", "to-front", "to-back"];

/// Batches that hold back flushing of requested view updates until they close.
pub const UPDATE_DELAYING_BATCHES: [&str; 1] = ["translate"];

#[derive(Debug, Clone, Copy)]
pub struct GraphLayerSync {
    sorting: Sorting,
}

impl GraphLayerSync {
    pub fn new(sorting: Sorting) -> Self {
        Self { sorting }
    }

    /// The graph collection was re-sorted.
    pub fn resort_on_sort(&self, batches: &BatchSnapshot) -> bool {
        !batches.contains_any(&SORT_DELAYING_BATCHES)
    }

    /// A batch closed; `batches` is what remains open.
    pub fn resort_on_batch_stop(&self, name: &str, batches: &BatchSnapshot) -> bool {
        SORT_DELAYING_BATCHES.contains(&name) && !batches.contains_any(&SORT_DELAYING_BATCHES)
    }

    /// Extra work for a view whose cell changed `z`.
    pub fn flags_on_z_change(&self) -> UpdateFlags {
        match self.sorting {
            Sorting::Approx => UpdateFlag::Insert.into(),
            Sorting::Exact | Sorting::None => UpdateFlags::EMPTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(names: &[&str]) -> BatchSnapshot {
        BatchSnapshot::new(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn sort_is_delayed_inside_sort_delaying_batches() {
        let sync = GraphLayerSync::new(Sorting::Exact);
        assert!(sync.resort_on_sort(&open(&[])));
        assert!(sync.resort_on_sort(&open(&["translate"])));
        assert!(!sync.resort_on_sort(&open(&["to-front"])));
    }

    #[test]
    fn only_the_last_delaying_batch_triggers() {
        let sync = GraphLayerSync::new(Sorting::Exact);
        assert!(!sync.resort_on_batch_stop("add", &open(&["to-back"])));
        assert!(sync.resort_on_batch_stop("add", &open(&["move"])));
        assert!(!sync.resort_on_batch_stop("move", &open(&[])));
    }

    #[test]
    fn z_changes_reinsert_only_in_approx_mode() {
        assert!(GraphLayerSync::new(Sorting::Approx)
            .flags_on_z_change()
            .contains(UpdateFlag::Insert));
        assert!(GraphLayerSync::new(Sorting::Exact)
            .flags_on_z_change()
            .is_empty());
    }
}
