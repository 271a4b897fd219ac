//! Cell views: the projection of one cell onto a subtree of the paper's node tree.

mod element;
mod link;

pub use element::ElementView;
pub use link::LinkView;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use trellis_graph::{Cell, CellId, CellKind, Graph};

use crate::connector::{ConnectorRegistry, JumpOverRegistry, LinkGeometry, LinkGeometrySource};
use crate::dom::{Dom, NodeId};
use crate::error::Result;
use crate::flags::UpdateFlags;
use crate::options::{DefaultConnector, UpdateOptions};

/// Layer views flush first.
pub const LAYER_PRIORITY: u8 = 0;
pub const ELEMENT_PRIORITY: u8 = 1;
/// Links flush after the elements they connect.
pub const LINK_PRIORITY: u8 = 2;

/// Everything a view may touch while it confirms an update.
pub struct ViewContext<'a> {
    pub graph: &'a Graph,
    pub dom: &'a mut Dom,
    /// The other views of the paper; the view being updated is not in here.
    pub views: &'a ViewRegistry,
    pub connectors: &'a ConnectorRegistry,
    pub jumpover: &'a mut JumpOverRegistry,
    pub default_connector: &'a DefaultConnector,
}

pub trait CellView {
    fn id(&self) -> &CellId;

    fn kind(&self) -> CellKind;

    /// The view's root node. It exists from construction on; it is mounted once inserted.
    fn root(&self) -> NodeId;

    fn update_priority(&self) -> u8;

    /// Flags scheduled together with `Insert` when the view is created.
    fn init_flags(&self) -> UpdateFlags;

    /// Flags a change of the model attribute `key` calls for.
    fn presentation_flags(&self, key: &str) -> UpdateFlags;

    /// Applies `flags` and returns the ones it could not handle yet.
    ///
    /// Leftover flags stay queued and are retried by a later pass.
    fn confirm_update(
        &mut self,
        flags: UpdateFlags,
        opts: UpdateOptions,
        ctx: &mut ViewContext<'_>,
    ) -> Result<UpdateFlags>;

    /// Tears the view's subtree down.
    fn remove(&mut self, dom: &mut Dom) {
        dom.remove(self.root());
    }

    fn link_geometry(&self) -> Option<&LinkGeometry> {
        None
    }
}

/// Creates the view matching the kind of `cell`.
pub fn create_view(cell: &Cell, dom: &mut Dom) -> Box<dyn CellView> {
    match cell.kind() {
        CellKind::Element => Box::new(ElementView::new(cell.id().clone(), dom)),
        CellKind::Link => Box::new(LinkView::new(cell.id().clone(), dom)),
    }
}

/// Live views by cell id, in creation order.
///
/// A view is checked out (`take`) while its own update runs, so that the rest of the registry
/// stays readable through [`ViewContext::views`].
#[derive(Default)]
pub struct ViewRegistry {
    views: IndexMap<CellId, Option<Box<dyn CellView>>, FxBuildHasher>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, view: Box<dyn CellView>) -> Option<Box<dyn CellView>> {
        self.views.insert(view.id().clone(), Some(view)).flatten()
    }

    pub fn get(&self, id: &CellId) -> Option<&dyn CellView> {
        self.views.get(id)?.as_deref()
    }

    pub fn contains(&self, id: &CellId) -> bool {
        self.views.contains_key(id)
    }

    /// Checks a view out; the slot stays reserved until [`ViewRegistry::restore`].
    pub fn take(&mut self, id: &CellId) -> Option<Box<dyn CellView>> {
        self.views.get_mut(id)?.take()
    }

    pub fn restore(&mut self, view: Box<dyn CellView>) {
        if let Some(slot) = self.views.get_mut(view.id()) {
            *slot = Some(view);
        }
    }

    pub fn remove(&mut self, id: &CellId) -> Option<Box<dyn CellView>> {
        self.views.shift_remove(id).flatten()
    }

    /// Whether the view's root is attached to the node tree.
    pub fn is_mounted(&self, dom: &Dom, id: &CellId) -> bool {
        self.get(id)
            .is_some_and(|v| dom.is_alive(v.root()) && dom.parent(v.root()).is_some())
    }

    pub fn ids(&self) -> impl Iterator<Item = &CellId> {
        self.views.keys()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Removes and returns every view.
    pub fn drain(&mut self) -> Vec<Box<dyn CellView>> {
        self.views.drain(..).filter_map(|(_, v)| v).collect()
    }
}

impl LinkGeometrySource for ViewRegistry {
    fn link_geometry(&self, id: &CellId) -> Option<&LinkGeometry> {
        self.get(id)?.link_geometry()
    }
}

impl std::fmt::Debug for ViewRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.views.keys()).finish()
    }
}

/// `joint-type-standard-rectangle` style class for a cell type.
pub(crate) fn type_class(cell_type: &str) -> String {
    let mut class = String::from("joint-type");
    for part in cell_type.split('.').filter(|p| !p.is_empty()) {
        class.push('-');
        class.push_str(&part.to_ascii_lowercase());
    }
    class
}
