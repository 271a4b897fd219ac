//! Pending view updates, bucketed by priority.

use std::fmt;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use trellis_graph::CellId;

use crate::flags::{UpdateFlag, UpdateFlags};
use crate::options::UpdateOptions;

/// Something the paper can update: a cell view or a layer view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateTarget {
    Cell(CellId),
    Layer(String),
}

impl fmt::Display for UpdateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateTarget::Cell(id) => write!(f, "cell:{id}"),
            UpdateTarget::Layer(id) => write!(f, "layer:{id}"),
        }
    }
}

impl From<CellId> for UpdateTarget {
    fn from(id: CellId) -> Self {
        Self::Cell(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingUpdate {
    pub flags: UpdateFlags,
    pub opts: UpdateOptions,
}

/// Outcome of [`UpdateQueue::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// Every requested flag was already pending.
    Unchanged,
    /// The target had no entry at this priority before.
    New,
    Merged,
}

/// One insertion-ordered map per priority; lower priorities flush first.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    buckets: Vec<IndexMap<UpdateTarget, PendingUpdate, FxBuildHasher>>,
}

impl UpdateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket_mut(&mut self, priority: u8) -> &mut IndexMap<UpdateTarget, PendingUpdate, FxBuildHasher> {
        let idx = priority as usize;
        if self.buckets.len() <= idx {
            self.buckets.resize_with(idx + 1, IndexMap::default);
        }
        &mut self.buckets[idx]
    }

    /// Merges `flags` into the target's entry at `priority`.
    ///
    /// When `priority` is above the target's own priority, entries of the same target waiting
    /// at the priorities in between are moved up into this one. A `Remove` cancels a pending
    /// `Insert` and the other way round.
    pub fn schedule(
        &mut self,
        target: &UpdateTarget,
        flags: UpdateFlags,
        priority: u8,
        own_priority: u8,
        opts: UpdateOptions,
    ) -> Scheduled {
        let mut absorbed = UpdateFlags::EMPTY;
        if priority > own_priority {
            for p in (own_priority..priority).rev() {
                if let Some(entry) = self
                    .buckets
                    .get_mut(p as usize)
                    .and_then(|b| b.shift_remove(target))
                {
                    absorbed |= entry.flags;
                }
            }
        }

        let bucket = self.bucket_mut(priority);
        let current = bucket.get(target).map_or(UpdateFlags::EMPTY, |e| e.flags) | absorbed;
        if !current.is_empty() && current.contains_all(flags) {
            if !absorbed.is_empty() {
                bucket.insert(target.clone(), PendingUpdate { flags: current, opts });
            }
            return Scheduled::Unchanged;
        }
        let outcome = if current.is_empty() {
            Scheduled::New
        } else {
            Scheduled::Merged
        };

        let mut merged = current;
        if flags.contains(UpdateFlag::Remove) && merged.contains(UpdateFlag::Insert) {
            merged.remove(UpdateFlag::Insert);
        } else if flags.contains(UpdateFlag::Insert) && merged.contains(UpdateFlag::Remove) {
            merged.remove(UpdateFlag::Remove);
        }
        merged |= flags;
        bucket.insert(target.clone(), PendingUpdate { flags: merged, opts });
        outcome
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(IndexMap::is_empty)
    }

    /// Number of priority levels seen so far.
    pub fn priorities(&self) -> usize {
        self.buckets.len()
    }

    /// Targets waiting at `priority`, in request order.
    pub fn targets_at(&self, priority: u8) -> Vec<UpdateTarget> {
        self.buckets
            .get(priority as usize)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, target: &UpdateTarget, priority: u8) -> Option<PendingUpdate> {
        self.buckets.get(priority as usize)?.get(target).copied()
    }

    /// Replaces the flags of an existing entry, keeping its position.
    pub fn set_flags(&mut self, target: &UpdateTarget, priority: u8, flags: UpdateFlags) {
        if let Some(entry) = self
            .buckets
            .get_mut(priority as usize)
            .and_then(|b| b.get_mut(target))
        {
            entry.flags = flags;
        }
    }

    pub fn remove(&mut self, target: &UpdateTarget, priority: u8) -> Option<PendingUpdate> {
        self.buckets.get_mut(priority as usize)?.shift_remove(target)
    }

    /// Drops every entry of `target`, at any priority.
    pub fn forget(&mut self, target: &UpdateTarget) {
        for bucket in &mut self.buckets {
            bucket.shift_remove(target);
        }
    }

    /// Pending flags of `target` across all priorities.
    pub fn flags_of(&self, target: &UpdateTarget) -> UpdateFlags {
        self.buckets
            .iter()
            .filter_map(|b| b.get(target))
            .fold(UpdateFlags::EMPTY, |acc, e| acc | e.flags)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
