//! Typed graph notifications.

use crate::cell::CellId;

/// Where a cell sits inside a multi-cell `add` operation.
///
/// Positions count down: the first cell added carries `position == max_position`, the last
/// one carries `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddPosition {
    pub position: usize,
    pub max_position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphEventKind {
    Add {
        id: CellId,
        position: Option<AddPosition>,
    },
    Remove {
        id: CellId,
    },
    Reset,
    /// The cell collection was re-sorted by `z`.
    Sort,
    Change {
        id: CellId,
        key: String,
    },
    BatchStart {
        name: String,
    },
    BatchStop {
        name: String,
    },
}

/// Names of the batches that were open when an event fired.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSnapshot {
    open: Vec<String>,
}

impl BatchSnapshot {
    pub fn new(open: Vec<String>) -> Self {
        Self { open }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.open.iter().any(|n| n == name)
    }

    pub fn contains_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.contains(n))
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.open
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEvent {
    pub kind: GraphEventKind,
    pub batches: BatchSnapshot,
}
