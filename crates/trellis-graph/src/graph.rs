//! The z-sorted cell collection.

use std::sync::mpsc::{self, Receiver, Sender};

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde_json::{Value, json};
use trellis_geom::point;

use crate::cell::{Cell, CellId, ConnectorRef, point_to_value};
use crate::error::{Error, Result};
use crate::event::{AddPosition, BatchSnapshot, GraphEvent, GraphEventKind};

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;
type HashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;

/// Batch names the graph opens itself.
pub mod batch {
    pub const ADD: &str = "add";
    pub const REMOVE: &str = "remove";
    pub const CLEAR: &str = "clear";
    pub const TO_FRONT: &str = "to-front";
    pub const TO_BACK: &str = "to-back";
    pub const TRANSLATE: &str = "translate";
}

/// An ordered collection of cells.
///
/// Cells are kept sorted by `z` ascending; cells with equal `z` keep their collection order
/// (insertion order, or the order they had before the last resort). Every mutation is
/// published as a [`GraphEvent`] to all live subscribers.
#[derive(Debug, Default)]
pub struct Graph {
    cells: Vec<Cell>,
    index: HashMap<CellId, usize>,
    batches: IndexMap<String, usize>,
    subscribers: Vec<Sender<GraphEvent>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `{"cells": [...]}`.
    pub fn from_json(value: Value) -> Result<Self> {
        let mut graph = Self::new();
        let cells = match value {
            Value::Object(mut obj) => match obj.shift_remove("cells") {
                Some(Value::Array(items)) => items,
                None => Vec::new(),
                Some(_) => {
                    return Err(Error::InvalidCell {
                        reason: "`cells` must be an array".to_string(),
                    });
                }
            },
            _ => {
                return Err(Error::InvalidCell {
                    reason: "graph JSON must be an object".to_string(),
                });
            }
        };
        let cells = cells
            .into_iter()
            .map(Cell::from_json)
            .collect::<Result<Vec<_>>>()?;
        graph.reset_cells(cells)?;
        Ok(graph)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Value {
        json!({ "cells": self.cells.iter().map(Cell::to_json).collect::<Vec<_>>() })
    }

    /// Registers a new event channel. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<GraphEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, kind: GraphEventKind) {
        tracing::trace!(?kind, "graph event");
        let event = GraphEvent {
            kind,
            batches: self.batch_snapshot(),
        };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Names of the currently open batches.
    pub fn batch_snapshot(&self) -> BatchSnapshot {
        BatchSnapshot::new(
            self.batches
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(name, _)| name.clone())
                .collect(),
        )
    }

    pub fn start_batch(&mut self, name: &str) {
        *self.batches.entry(name.to_string()).or_insert(0) += 1;
        self.emit(GraphEventKind::BatchStart {
            name: name.to_string(),
        });
    }

    pub fn stop_batch(&mut self, name: &str) {
        match self.batches.get_mut(name) {
            Some(count) if *count > 0 => *count -= 1,
            _ => {
                tracing::warn!(batch = name, "stop_batch without a matching start_batch");
                return;
            }
        }
        self.emit(GraphEventKind::BatchStop {
            name: name.to_string(),
        });
    }

    /// Runs `f` inside the named batch.
    pub fn batch<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.start_batch(name);
        let out = f(self);
        self.stop_batch(name);
        out
    }

    pub fn has_active_batch(&self, names: &[&str]) -> bool {
        names
            .iter()
            .any(|name| self.batches.get(*name).is_some_and(|c| *c > 0))
    }

    pub fn has_any_active_batch(&self) -> bool {
        self.batches.values().any(|c| *c > 0)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Cell> {
        self.index.get(id).map(|&idx| &self.cells[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Position of the cell in z order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_element())
    }

    pub fn links(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_link())
    }

    /// Links whose source or target references `id`, in z order.
    pub fn connected_links(&self, id: &CellId) -> Vec<&Cell> {
        self.links().filter(|l| l.is_connected_to(id)).collect()
    }

    pub fn max_z(&self) -> i64 {
        self.cells.last().map(Cell::z).unwrap_or(0)
    }

    pub fn min_z(&self) -> i64 {
        self.cells.first().map(Cell::z).unwrap_or(0)
    }

    fn resort(&mut self) {
        self.cells.sort_by_key(Cell::z);
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (idx, cell) in self.cells.iter().enumerate() {
            self.index.insert(cell.id().clone(), idx);
        }
    }

    pub fn add_cell(&mut self, cell: Cell) -> Result<()> {
        self.insert_cell(cell, None)
    }

    fn insert_cell(&mut self, mut cell: Cell, position: Option<AddPosition>) -> Result<()> {
        if self.contains(cell.id().as_str()) {
            return Err(Error::DuplicateCell {
                id: cell.id().to_string(),
            });
        }
        if !cell.has_z() {
            cell.set("z", Value::from(self.max_z() + 1));
        }
        let id = cell.id().clone();
        self.cells.push(cell);
        self.resort();
        self.emit(GraphEventKind::Add { id, position });
        self.emit(GraphEventKind::Sort);
        Ok(())
    }

    /// Adds all cells inside one `add` batch.
    pub fn add_cells(&mut self, cells: impl IntoIterator<Item = Cell>) -> Result<()> {
        let cells: Vec<Cell> = cells.into_iter().collect();
        if cells.is_empty() {
            return Ok(());
        }
        let mut seen = HashSet::default();
        for cell in &cells {
            if self.contains(cell.id().as_str()) || !seen.insert(cell.id().clone()) {
                return Err(Error::DuplicateCell {
                    id: cell.id().to_string(),
                });
            }
        }

        let max_position = cells.len() - 1;
        self.batch(batch::ADD, |graph| {
            for (i, cell) in cells.into_iter().enumerate() {
                let position = AddPosition {
                    position: max_position - i,
                    max_position,
                };
                graph.insert_cell(cell, Some(position))?;
            }
            Ok(())
        })
    }

    fn detach(&mut self, id: &str) -> Option<Cell> {
        let idx = self.index.get(id).copied()?;
        let cell = self.cells.remove(idx);
        self.reindex();
        self.emit(GraphEventKind::Remove {
            id: cell.id().clone(),
        });
        Some(cell)
    }

    /// Removes a cell. Removing an element also removes the links connected to it.
    pub fn remove_cell(&mut self, id: &str) -> Result<Cell> {
        let cell = self.get(id).ok_or_else(|| Error::MissingCell { id: id.to_string() })?;
        let links: Vec<CellId> = if cell.is_element() {
            self.connected_links(cell.id())
                .into_iter()
                .map(|l| l.id().clone())
                .collect()
        } else {
            Vec::new()
        };

        self.batch(batch::REMOVE, |graph| {
            for link in &links {
                graph.detach(link.as_str());
            }
            graph
                .detach(id)
                .ok_or_else(|| Error::MissingCell { id: id.to_string() })
        })
    }

    pub fn remove_cells(&mut self, ids: &[&str]) -> Result<()> {
        if let Some(missing) = ids.iter().find(|id| !self.contains(id)) {
            return Err(Error::MissingCell {
                id: missing.to_string(),
            });
        }
        self.batch(batch::REMOVE, |graph| {
            for id in ids {
                // Links of an earlier removed element may already be gone.
                if graph.contains(id) {
                    graph.remove_cell(id)?;
                }
            }
            Ok(())
        })
    }

    /// Replaces every cell at once and fires a single `Reset`.
    pub fn reset_cells(&mut self, cells: impl IntoIterator<Item = Cell>) -> Result<()> {
        let mut cells: Vec<Cell> = cells.into_iter().collect();
        let mut seen = HashSet::default();
        for cell in &cells {
            if !seen.insert(cell.id().clone()) {
                return Err(Error::DuplicateCell {
                    id: cell.id().to_string(),
                });
            }
        }

        let mut max_z = cells.iter().filter(|c| c.has_z()).map(Cell::z).max().unwrap_or(0);
        for cell in cells.iter_mut().filter(|c| !c.has_z()) {
            max_z += 1;
            cell.set("z", Value::from(max_z));
        }

        self.cells = cells;
        self.resort();
        self.emit(GraphEventKind::Reset);
        Ok(())
    }

    /// Removes every cell inside a `clear` batch, links first.
    pub fn clear(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        let mut ids: Vec<CellId> = self.links().map(|c| c.id().clone()).collect();
        ids.extend(self.elements().map(|c| c.id().clone()));
        self.batch(batch::CLEAR, |graph| {
            for id in &ids {
                graph.detach(id.as_str());
            }
        });
    }

    /// Sets one attribute. Returns whether the value changed; unchanged writes fire nothing.
    pub fn set(&mut self, id: &str, key: &str, value: Value) -> Result<bool> {
        let idx = self
            .index
            .get(id)
            .copied()
            .ok_or_else(|| Error::MissingCell { id: id.to_string() })?;
        if key == "id" {
            return Err(Error::InvalidCell {
                reason: "the id of a cell member cannot change".to_string(),
            });
        }
        if key == "z" && !value.is_number() {
            return Err(Error::InvalidCell {
                reason: format!("cell {id}: z must be a number"),
            });
        }
        if !self.cells[idx].set(key, value) {
            return Ok(false);
        }
        self.after_change(idx, key);
        Ok(true)
    }

    pub fn unset(&mut self, id: &str, key: &str) -> Result<bool> {
        let idx = self
            .index
            .get(id)
            .copied()
            .ok_or_else(|| Error::MissingCell { id: id.to_string() })?;
        if !self.cells[idx].unset(key) {
            return Ok(false);
        }
        self.after_change(idx, key);
        Ok(true)
    }

    fn after_change(&mut self, idx: usize, key: &str) {
        let id = self.cells[idx].id().clone();
        self.emit(GraphEventKind::Change {
            id,
            key: key.to_string(),
        });
        if key == "z" {
            self.resort();
            self.emit(GraphEventKind::Sort);
        }
    }

    pub fn set_z(&mut self, id: &str, z: i64) -> Result<bool> {
        self.set(id, "z", Value::from(z))
    }

    pub fn set_position(&mut self, id: &str, x: f64, y: f64) -> Result<bool> {
        self.set(id, "position", point_to_value(point(x, y)))
    }

    pub fn set_size(&mut self, id: &str, width: f64, height: f64) -> Result<bool> {
        self.set(id, "size", json!({ "width": width, "height": height }))
    }

    /// Moves an element by `(dx, dy)` inside a `translate` batch.
    pub fn translate(&mut self, id: &str, dx: f64, dy: f64) -> Result<bool> {
        let p = self
            .get(id)
            .ok_or_else(|| Error::MissingCell { id: id.to_string() })?
            .position();
        self.batch(batch::TRANSLATE, |graph| {
            graph.set_position(id, p.x + dx, p.y + dy)
        })
    }

    pub fn set_connector(&mut self, id: &str, connector: Option<ConnectorRef>) -> Result<bool> {
        match connector {
            Some(c) => self.set(id, "connector", c.to_value()),
            None => self.unset(id, "connector"),
        }
    }

    /// Gives the cell the greatest z in the graph.
    pub fn to_front(&mut self, id: &str) -> Result<bool> {
        if !self.contains(id) {
            return Err(Error::MissingCell { id: id.to_string() });
        }
        let z = self.max_z() + 1;
        self.batch(batch::TO_FRONT, |graph| graph.set_z(id, z))
    }

    /// Gives the cell the smallest z in the graph.
    pub fn to_back(&mut self, id: &str) -> Result<bool> {
        if !self.contains(id) {
            return Err(Error::MissingCell { id: id.to_string() });
        }
        let z = self.min_z() - 1;
        self.batch(batch::TO_BACK, |graph| graph.set_z(id, z))
    }
}
