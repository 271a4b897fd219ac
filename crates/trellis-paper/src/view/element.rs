use serde_json::Value;
use trellis_geom::fmt::fmt_num;
use trellis_graph::{Cell, CellId, CellKind};

use super::{CellView, ELEMENT_PRIORITY, ViewContext, type_class};
use crate::dom::{Dom, NodeId};
use crate::error::Result;
use crate::flags::{UpdateFlag, UpdateFlags};
use crate::layer::MODEL_ID_ATTR;
use crate::options::UpdateOptions;

/// A `<g>` root translated to the element position, holding a `<rect>` body.
#[derive(Debug)]
pub struct ElementView {
    id: CellId,
    root: NodeId,
    body: Option<NodeId>,
}

impl ElementView {
    pub fn new(id: CellId, dom: &mut Dom) -> Self {
        let root = dom.create_element("g");
        Self {
            id,
            root,
            body: None,
        }
    }

    pub fn body(&self) -> Option<NodeId> {
        self.body
    }

    fn render(&mut self, cell: &Cell, dom: &mut Dom) -> NodeId {
        dom.set_attr(self.root, MODEL_ID_ATTR, cell.id().as_str());
        dom.set_attr(self.root, "data-type", cell.cell_type());
        dom.set_attr(
            self.root,
            "class",
            &format!("joint-cell {} joint-element", type_class(cell.cell_type())),
        );
        match self.body {
            Some(body) => body,
            None => {
                let body = dom.create_element("rect");
                dom.set_attr(body, "class", "body");
                dom.append_child(self.root, body);
                self.body = Some(body);
                body
            }
        }
    }

    /// Copies the scalar values of `attrs.body` onto the body node.
    fn update_attributes(&self, cell: &Cell, dom: &mut Dom, body: NodeId) {
        let Some(attrs) = cell
            .get("attrs")
            .and_then(|a| a.get("body"))
            .and_then(Value::as_object)
        else {
            return;
        };
        for (name, value) in attrs {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.as_f64().map(fmt_num).unwrap_or_default(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            dom.set_attr(body, name, &text);
        }
    }

    fn resize(&self, cell: &Cell, dom: &mut Dom, body: NodeId) {
        let size = cell.size();
        dom.set_attr(body, "width", &fmt_num(size.width));
        dom.set_attr(body, "height", &fmt_num(size.height));
    }

    fn transform(&self, cell: &Cell, dom: &mut Dom) {
        let p = cell.position();
        let mut transform = format!("translate({},{})", fmt_num(p.x), fmt_num(p.y));
        let angle = cell.angle();
        if angle != 0.0 {
            let size = cell.size();
            transform.push_str(&format!(
                " rotate({},{},{})",
                fmt_num(angle),
                fmt_num(size.width / 2.0),
                fmt_num(size.height / 2.0)
            ));
        }
        dom.set_attr(self.root, "transform", &transform);
    }
}

impl CellView for ElementView {
    fn id(&self) -> &CellId {
        &self.id
    }

    fn kind(&self) -> CellKind {
        CellKind::Element
    }

    fn root(&self) -> NodeId {
        self.root
    }

    fn update_priority(&self) -> u8 {
        ELEMENT_PRIORITY
    }

    fn init_flags(&self) -> UpdateFlags {
        UpdateFlag::Render.into()
    }

    fn presentation_flags(&self, key: &str) -> UpdateFlags {
        match key {
            "attrs" => UpdateFlag::Update.into(),
            "position" => UpdateFlag::Translate.into(),
            "size" => UpdateFlag::Resize.into(),
            "angle" => UpdateFlag::Rotate.into(),
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

        let Some(body) = self.body.filter(|_| !flags.contains(UpdateFlag::Render)) else {
            let body = self.render(cell, ctx.dom);
            self.resize(cell, ctx.dom, body);
            self.transform(cell, ctx.dom);
            self.update_attributes(cell, ctx.dom, body);
            return Ok(UpdateFlags::EMPTY);
        };

        if flags.contains(UpdateFlag::Update) {
            self.update_attributes(cell, ctx.dom, body);
        }
        if flags.contains(UpdateFlag::Resize) {
            self.resize(cell, ctx.dom, body);
        }
        // The rotation center depends on the size.
        if flags.intersects(UpdateFlag::Translate | UpdateFlag::Rotate | UpdateFlag::Resize) {
            self.transform(cell, ctx.dom);
        }
        Ok(UpdateFlags::EMPTY)
    }
}
