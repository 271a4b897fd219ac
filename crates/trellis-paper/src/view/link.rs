use serde_json::Value;
use trellis_geom::fmt::fmt_num;
use trellis_geom::{Line, Point};
use trellis_graph::{Cell, CellId, CellKind, EndRef};

use super::{CellView, LINK_PRIORITY, ViewContext, type_class};
use crate::connector::{ConnectorContext, LinkGeometry};
use crate::dom::{Dom, NodeId};
use crate::error::{Error, Result};
use crate::flags::{UpdateFlag, UpdateFlags};
use crate::layer::MODEL_ID_ATTR;
use crate::options::UpdateOptions;

/// A `<g>` root holding the `<path>` the link's connector draws.
///
/// Links attached to cells connect the centers of those cells. The update is postponed while
/// an attached cell's view is not mounted yet.
#[derive(Debug)]
pub struct LinkView {
    id: CellId,
    root: NodeId,
    connection: Option<NodeId>,
    source: Option<EndRef>,
    target: Option<EndRef>,
    geometry: Option<LinkGeometry>,
}

impl LinkView {
    pub fn new(id: CellId, dom: &mut Dom) -> Self {
        let root = dom.create_element("g");
        Self {
            id,
            root,
            connection: None,
            source: None,
            target: None,
            geometry: None,
        }
    }

    pub fn connection(&self) -> Option<NodeId> {
        self.connection
    }

    fn render(&mut self, cell: &Cell, dom: &mut Dom) -> NodeId {
        dom.set_attr(self.root, MODEL_ID_ATTR, cell.id().as_str());
        dom.set_attr(self.root, "data-type", cell.cell_type());
        dom.set_attr(
            self.root,
            "class",
            &format!("joint-cell {} joint-link", type_class(cell.cell_type())),
        );
        match self.connection {
            Some(node) => node,
            None => {
                let node = dom.create_element("path");
                dom.set_attr(node, "class", "connection");
                dom.set_attr(node, "fill", "none");
                dom.append_child(self.root, node);
                self.connection = Some(node);
                node
            }
        }
    }

    fn update_attributes(&self, cell: &Cell, dom: &mut Dom, node: NodeId) {
        let Some(attrs) = cell
            .get("attrs")
            .and_then(|a| a.get("line"))
            .and_then(Value::as_object)
        else {
            return;
        };
        for (name, value) in attrs {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.as_f64().map(fmt_num).unwrap_or_default(),
                _ => continue,
            };
            dom.set_attr(node, name, &text);
        }
    }

    /// Re-reads both ends from the model.
    fn update_ends(&mut self, cell: &Cell, ctx: &ViewContext<'_>) -> Result<()> {
        let source = cell.source();
        let target = cell.target();
        for (end, slot) in [("source", &source), ("target", &target)] {
            let Some(id) = slot.as_ref().and_then(EndRef::cell_id) else {
                continue;
            };
            if !ctx.graph.contains(id.as_str()) {
                return Err(Error::MissingEndpoint {
                    link: self.id.clone(),
                    end,
                    id: id.clone(),
                });
            }
        }
        self.source = source;
        self.target = target;
        Ok(())
    }

    fn ends_mounted(&self, ctx: &ViewContext<'_>) -> bool {
        [&self.source, &self.target]
            .into_iter()
            .filter_map(|end| end.as_ref().and_then(EndRef::cell_id))
            .all(|id| ctx.views.is_mounted(ctx.dom, id))
    }

    fn end_point(&self, end: Option<&EndRef>, ctx: &ViewContext<'_>) -> Option<Point> {
        match end {
            None => Some(Point::origin()),
            Some(EndRef::Point(p)) => Some(*p),
            Some(EndRef::Cell(id)) => {
                let cell = ctx.graph.get(id.as_str())?;
                match cell.kind() {
                    CellKind::Element => Some(cell.center()),
                    CellKind::Link => {
                        let g = ctx.views.get(id)?.link_geometry()?;
                        Some(Line::new(g.source, g.target).midpoint())
                    }
                }
            }
        }
    }

    fn compute_geometry(&self, cell: &Cell, ctx: &ViewContext<'_>) -> Option<LinkGeometry> {
        let source = self.end_point(self.source.as_ref(), ctx)?;
        let target = self.end_point(self.target.as_ref(), ctx)?;
        Some(LinkGeometry::new(source, target, cell.vertices()))
    }

    fn run_connector(&self, cell: &Cell, ctx: &mut ViewContext<'_>, node: NodeId) -> Result<()> {
        let Some(geometry) = self.geometry.as_ref() else {
            return Ok(());
        };
        let (name, args) = match cell.connector() {
            Some(c) => (c.name, c.args),
            None => (
                ctx.default_connector.name.clone(),
                ctx.default_connector.args.clone(),
            ),
        };
        let mut cctx = ConnectorContext {
            link: &self.id,
            graph: ctx.graph,
            default_connector: &ctx.default_connector.name,
            geometry: ctx.views,
            jumpover: &mut *ctx.jumpover,
        };
        let path = ctx.connectors.connect(&name, geometry, &args, &mut cctx)?;
        ctx.dom.set_attr(node, "d", &path.to_string());
        Ok(())
    }
}

impl CellView for LinkView {
    fn id(&self) -> &CellId {
        &self.id
    }

    fn kind(&self) -> CellKind {
        CellKind::Link
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn update_priority(&self) -> u8 {
        LINK_PRIORITY
    }

    fn init_flags(&self) -> UpdateFlags {
        UpdateFlag::Render | UpdateFlag::Source | UpdateFlag::Target
    }

    fn presentation_flags(&self, key: &str) -> UpdateFlags {
        match key {
            "connector" => UpdateFlag::Connector.into(),
            "source" => UpdateFlag::Source | UpdateFlag::Update,
            "target" => UpdateFlag::Target | UpdateFlag::Update,
            "vertices" | "attrs" | "router" => UpdateFlag::Update.into(),
            "markup" | "type" => UpdateFlag::Render.into(),
            _ => UpdateFlags::EMPTY,
        }
    }

    fn confirm_update(
        &mut self,
        flags: UpdateFlags,
        _opts: UpdateOptions,
        ctx: &mut ViewContext<'_>,
    ) -> Result<UpdateFlags> {
        let graph = ctx.graph;
        let Some(cell) = graph.get(self.id.as_str()) else {
            return Ok(UpdateFlags::EMPTY);
        };

        let ends = UpdateFlag::Source | UpdateFlag::Target;
        if flags.intersects(ends) {
            self.update_ends(cell, ctx)?;
        }
        if !self.ends_mounted(ctx) {
            return Ok(flags);
        }
        let mut flags = flags.without(ends);

        let render = flags.contains(UpdateFlag::Render) || self.connection.is_none();
        let node = if render {
            self.render(cell, ctx.dom)
        } else {
            self.connection.unwrap_or(self.root)
        };

        if render || flags.contains(UpdateFlag::Update) || self.geometry.is_none() {
            let Some(geometry) = self.compute_geometry(cell, ctx) else {
                return Ok(flags | UpdateFlag::Update);
            };
            self.geometry = Some(geometry);
            self.update_attributes(cell, ctx.dom, node);
            self.run_connector(cell, ctx, node)?;
            flags = flags.without(UpdateFlag::Render | UpdateFlag::Update) - UpdateFlag::Connector;
        } else if flags.contains(UpdateFlag::Connector) {
            self.run_connector(cell, ctx, node)?;
            flags = flags - UpdateFlag::Connector;
        }
        Ok(flags)
    }

    fn link_geometry(&self) -> Option<&LinkGeometry> {
        self.geometry.as_ref()
    }
}
