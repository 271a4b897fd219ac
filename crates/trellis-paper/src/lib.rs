#![forbid(unsafe_code)]

//! Headless diagram paper.
//!
//! A [`Paper`] keeps one view per cell of a [`trellis_graph::Graph`] and renders it into an
//! in-memory SVG tree ([`Dom`]). Model changes are turned into prioritized, coalesced view
//! updates which are flushed synchronously, held back while the paper is frozen, or flushed
//! in chunks driven by the host through [`Paper::tick`].

pub mod connector;
pub mod dom;
pub mod error;
pub mod flags;
pub mod layer;
pub mod options;
mod paper;
pub mod scheduler;
pub mod view;

pub use connector::{
    Connector, ConnectorContext, ConnectorRegistry, JumpOverConnector, JumpOverOptions,
    JumpOverRegistry, JumpType, LinkGeometry, LinkGeometrySource,
};
pub use dom::{Dom, NodeId};
pub use error::{Error, Result};
pub use flags::{UpdateFlag, UpdateFlags};
pub use layer::names as layer_names;
pub use options::{
    DefaultConnector, PaperHooks, PaperOptions, Sorting, UnfreezeOptions, UpdateOptions,
};
pub use paper::{Paper, RenderStats};
pub use scheduler::UpdateTarget;
pub use view::{CellView, ElementView, LinkView};
