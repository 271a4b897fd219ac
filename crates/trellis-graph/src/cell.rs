//! Cells: attribute bags with a stable identity.
//!
//! A cell stores every attribute (including `type` and `z`) in one insertion-ordered JSON map.
//! Typed accessors read the well-known keys (`position`, `size`, `source`, `target`,
//! `vertices`, `connector`, `layer`) and tolerate missing or malformed values by falling back
//! to defaults, so a partially specified cell still renders.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use trellis_geom::{Point, point};

use crate::error::{Error, Result};

pub const DEFAULT_ELEMENT_TYPE: &str = "standard.Rectangle";
pub const DEFAULT_LINK_TYPE: &str = "standard.Link";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random (UUID v4) id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CellId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CellId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CellId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Element,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// One end of a link: another cell or a free point.
#[derive(Debug, Clone, PartialEq)]
pub enum EndRef {
    Cell(CellId),
    Point(Point),
}

impl EndRef {
    pub fn cell(id: impl Into<CellId>) -> Self {
        Self::Cell(id.into())
    }

    pub fn point(x: f64, y: f64) -> Self {
        Self::Point(point(x, y))
    }

    pub fn cell_id(&self) -> Option<&CellId> {
        match self {
            EndRef::Cell(id) => Some(id),
            EndRef::Point(_) => None,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if let Some(id) = obj.get("id").and_then(Value::as_str) {
            return Some(Self::Cell(CellId::new(id)));
        }
        Some(Self::Point(point_from_value(value)?))
    }

    fn to_value(&self) -> Value {
        match self {
            EndRef::Cell(id) => json!({ "id": id.as_str() }),
            EndRef::Point(p) => point_to_value(*p),
        }
    }
}

/// The `connector` attribute of a link.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorRef {
    pub name: String,
    pub args: Value,
}

impl ConnectorRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Value::Object(Map::new()),
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    /// Accepts both the object form `{name, args}` and a bare connector name.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self::new(name.as_str())),
            Value::Object(obj) => {
                let name = obj.get("name").and_then(Value::as_str)?;
                let args = obj
                    .get("args")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                Some(Self::new(name).with_args(args))
            }
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({ "name": self.name, "args": self.args })
    }
}

pub(crate) fn point_from_value(value: &Value) -> Option<Point> {
    let obj = value.as_object()?;
    let x = obj.get("x").and_then(Value::as_f64)?;
    let y = obj.get("y").and_then(Value::as_f64)?;
    Some(point(x, y))
}

pub(crate) fn point_to_value(p: Point) -> Value {
    json!({ "x": p.x, "y": p.y })
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    id: CellId,
    kind: CellKind,
    attrs: Map<String, Value>,
}

impl Cell {
    pub fn new(id: impl Into<CellId>, kind: CellKind) -> Self {
        let mut attrs = Map::new();
        let ty = match kind {
            CellKind::Element => DEFAULT_ELEMENT_TYPE,
            CellKind::Link => DEFAULT_LINK_TYPE,
        };
        attrs.insert("type".to_string(), Value::String(ty.to_string()));
        Self {
            id: id.into(),
            kind,
            attrs,
        }
    }

    pub fn element(id: impl Into<CellId>) -> Self {
        Self::new(id, CellKind::Element)
    }

    pub fn link(id: impl Into<CellId>) -> Self {
        Self::new(id, CellKind::Link)
    }

    /// Builds a cell from its JSON form.
    ///
    /// A missing `id` is generated. The cell is a link when its `type` ends with `Link` or
    /// when it carries a `source` or `target`.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut attrs) = value else {
            return Err(Error::InvalidCell {
                reason: "cell must be a JSON object".to_string(),
            });
        };

        let id = match attrs.shift_remove("id") {
            None | Some(Value::Null) => CellId::generate(),
            Some(Value::String(s)) => CellId::new(s),
            Some(Value::Number(n)) => CellId::new(n.to_string()),
            Some(other) => {
                return Err(Error::InvalidCell {
                    reason: format!("unsupported id value {other}"),
                });
            }
        };

        let ty = attrs.get("type").and_then(Value::as_str);
        let is_link = ty.is_some_and(|t| t.ends_with("Link"))
            || attrs.contains_key("source")
            || attrs.contains_key("target");
        let kind = if is_link {
            CellKind::Link
        } else {
            CellKind::Element
        };
        if ty.is_none() {
            let default = match kind {
                CellKind::Element => DEFAULT_ELEMENT_TYPE,
                CellKind::Link => DEFAULT_LINK_TYPE,
            };
            attrs.insert("type".to_string(), Value::String(default.to_string()));
        }

        if attrs
            .get("z")
            .is_some_and(|z| !z.is_null() && !z.is_number())
        {
            return Err(Error::InvalidCell {
                reason: format!("cell {id}: z must be a number"),
            });
        }

        Ok(Self { id, kind, attrs })
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::with_capacity(self.attrs.len() + 1);
        out.insert("id".to_string(), Value::String(self.id.to_string()));
        for (k, v) in &self.attrs {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }

    pub fn id(&self) -> &CellId {
        &self.id
    }

    pub fn kind(&self) -> CellKind {
        self.kind
    }

    pub fn is_link(&self) -> bool {
        self.kind == CellKind::Link
    }

    pub fn is_element(&self) -> bool {
        self.kind == CellKind::Element
    }

    pub fn cell_type(&self) -> &str {
        self.attrs
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Stores `value` under `key`; returns whether the stored value changed.
    pub(crate) fn set(&mut self, key: &str, value: Value) -> bool {
        if self.attrs.get(key) == Some(&value) {
            return false;
        }
        self.attrs.insert(key.to_string(), value);
        true
    }

    pub(crate) fn unset(&mut self, key: &str) -> bool {
        self.attrs.shift_remove(key).is_some()
    }

    pub fn has_z(&self) -> bool {
        self.attrs.get("z").is_some_and(Value::is_number)
    }

    pub fn z(&self) -> i64 {
        match self.attrs.get("z") {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.floor() as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Name of the cell layer this cell asks to be rendered into.
    pub fn layer(&self) -> Option<&str> {
        self.attrs.get("layer").and_then(Value::as_str)
    }

    pub fn position(&self) -> Point {
        self.attrs
            .get("position")
            .and_then(point_from_value)
            .unwrap_or_else(|| point(0.0, 0.0))
    }

    pub fn size(&self) -> Size {
        let obj = self.attrs.get("size").and_then(Value::as_object);
        let dim = |key: &str| {
            obj.and_then(|o| o.get(key))
                .and_then(Value::as_f64)
                .unwrap_or(1.0)
        };
        Size {
            width: dim("width"),
            height: dim("height"),
        }
    }

    pub fn angle(&self) -> f64 {
        self.attrs
            .get("angle")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    /// Center of the element's bounding box.
    pub fn center(&self) -> Point {
        let p = self.position();
        let s = self.size();
        point(p.x + s.width / 2.0, p.y + s.height / 2.0)
    }

    pub fn source(&self) -> Option<EndRef> {
        self.attrs.get("source").and_then(EndRef::from_value)
    }

    pub fn target(&self) -> Option<EndRef> {
        self.attrs.get("target").and_then(EndRef::from_value)
    }

    pub fn vertices(&self) -> Vec<Point> {
        self.attrs
            .get("vertices")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(point_from_value).collect())
            .unwrap_or_default()
    }

    pub fn connector(&self) -> Option<ConnectorRef> {
        self.attrs.get("connector").and_then(ConnectorRef::from_value)
    }

    /// Whether either end of this link references `id`.
    pub fn is_connected_to(&self, id: &CellId) -> bool {
        let hits = |end: Option<EndRef>| end.as_ref().and_then(EndRef::cell_id) == Some(id);
        hits(self.source()) || hits(self.target())
    }

    pub fn with_attr(mut self, key: &str, value: Value) -> Self {
        self.attrs.insert(key.to_string(), value);
        self
    }

    pub fn with_type(self, ty: &str) -> Self {
        self.with_attr("type", Value::String(ty.to_string()))
    }

    pub fn with_z(self, z: i64) -> Self {
        self.with_attr("z", Value::from(z))
    }

    pub fn with_layer(self, layer: &str) -> Self {
        self.with_attr("layer", Value::String(layer.to_string()))
    }

    pub fn with_position(self, x: f64, y: f64) -> Self {
        self.with_attr("position", point_to_value(point(x, y)))
    }

    pub fn with_size(self, width: f64, height: f64) -> Self {
        self.with_attr("size", json!({ "width": width, "height": height }))
    }

    pub fn with_source(self, end: EndRef) -> Self {
        let v = end.to_value();
        self.with_attr("source", v)
    }

    pub fn with_target(self, end: EndRef) -> Self {
        let v = end.to_value();
        self.with_attr("target", v)
    }

    pub fn with_vertices(self, vertices: &[Point]) -> Self {
        let v = Value::Array(vertices.iter().copied().map(point_to_value).collect());
        self.with_attr("vertices", v)
    }

    pub fn with_connector(self, connector: ConnectorRef) -> Self {
        let v = connector.to_value();
        self.with_attr("connector", v)
    }
}
