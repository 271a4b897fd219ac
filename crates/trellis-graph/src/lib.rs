#![forbid(unsafe_code)]

//! Observable diagram model.
//!
//! `Graph` is the single mutable resource of a diagram: papers subscribe to its event channel
//! and never write back. Events carry a snapshot of the batches that were open when they
//! fired, so a subscriber that drains its channel later still sees the batch context each
//! event was emitted under.

pub mod cell;
pub mod error;
pub mod event;
pub mod graph;

pub use cell::{Cell, CellId, CellKind, ConnectorRef, EndRef, Size};
pub use error::{Error, Result};
pub use event::{AddPosition, BatchSnapshot, GraphEvent, GraphEventKind};
pub use graph::{Graph, batch};
