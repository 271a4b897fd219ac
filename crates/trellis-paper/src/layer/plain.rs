use crate::dom::NodeId;

use super::Layer;

/// Append-only layer.
#[derive(Debug)]
pub struct PlainLayer {
    id: String,
    group: NodeId,
    holds_cells: bool,
}

impl PlainLayer {
    pub fn new(id: &str, group: NodeId, holds_cells: bool) -> Self {
        Self {
            id: id.to_string(),
            group,
            holds_cells,
        }
    }
}

impl Layer for PlainLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn group(&self) -> NodeId {
        self.group
    }

    fn holds_cells(&self) -> bool {
        self.holds_cells
    }
}
