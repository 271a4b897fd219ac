//! Connectors turn a link's end points and route into path data.

pub mod jumpover;

use std::hash::BuildHasher;

use hashbrown::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use trellis_geom::{Line, PathData, Point, PointExt, point};
use trellis_graph::{CellId, Graph};

use crate::error::{Error, Result};

pub use jumpover::{JumpOverConnector, JumpOverOptions, JumpOverRegistry, JumpType};

/// Geometry of a rendered link: connection points plus the route in between.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkGeometry {
    pub source: Point,
    pub target: Point,
    pub route: Vec<Point>,
}

impl LinkGeometry {
    pub fn new(source: Point, target: Point, route: Vec<Point>) -> Self {
        Self {
            source,
            target,
            route,
        }
    }

    /// `[source, ...route, target]`.
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.route.len() + 2);
        points.push(self.source);
        points.extend_from_slice(&self.route);
        points.push(self.target);
        points
    }

    pub fn lines(&self) -> Vec<Line> {
        trellis_geom::Polyline::new(self.points()).lines()
    }
}

/// Read access to the geometry of other rendered links.
pub trait LinkGeometrySource {
    fn link_geometry(&self, id: &CellId) -> Option<&LinkGeometry>;
}

impl<S: BuildHasher> LinkGeometrySource for HashMap<CellId, LinkGeometry, S> {
    fn link_geometry(&self, id: &CellId) -> Option<&LinkGeometry> {
        self.get(id)
    }
}

pub struct ConnectorContext<'a> {
    pub link: &'a CellId,
    pub graph: &'a Graph,
    /// Name of the paper's default connector.
    pub default_connector: &'a str,
    pub geometry: &'a dyn LinkGeometrySource,
    pub jumpover: &'a mut JumpOverRegistry,
}

pub trait Connector {
    fn name(&self) -> &str;

    fn connect(
        &self,
        geometry: &LinkGeometry,
        args: &Value,
        ctx: &mut ConnectorContext<'_>,
    ) -> Result<PathData>;
}

/// Straight segments through every route point.
#[derive(Debug, Default)]
pub struct NormalConnector;

impl Connector for NormalConnector {
    fn name(&self) -> &str {
        "normal"
    }

    fn connect(
        &self,
        geometry: &LinkGeometry,
        _args: &Value,
        _ctx: &mut ConnectorContext<'_>,
    ) -> Result<PathData> {
        let mut path = PathData::new();
        path.move_to(geometry.source);
        for p in &geometry.route {
            path.line_to(*p);
        }
        path.line_to(geometry.target);
        Ok(path)
    }
}

pub const DEFAULT_ROUNDED_RADIUS: f64 = 10.0;

/// Polyline with every inner corner replaced by a cubic joint.
#[derive(Debug, Default)]
pub struct RoundedConnector;

impl Connector for RoundedConnector {
    fn name(&self) -> &str {
        "rounded"
    }

    fn connect(
        &self,
        geometry: &LinkGeometry,
        args: &Value,
        _ctx: &mut ConnectorContext<'_>,
    ) -> Result<PathData> {
        let radius = args
            .get("radius")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_ROUNDED_RADIUS);
        let points = geometry.points();
        let mut path = PathData::new();
        path.move_to(geometry.source);
        for w in points.windows(3) {
            rounded_corner(&mut path, radius, w[1], w[0], w[2]);
        }
        path.line_to(geometry.target);
        Ok(path)
    }
}

/// Emits `L` to the corner start and a `C` joint around `curr`.
///
/// The joint consumes at most half of each adjacent segment.
pub(crate) fn rounded_corner(path: &mut PathData, radius: f64, curr: Point, prev: Point, next: Point) {
    const THIRD: f64 = 1.0 / 3.0;
    const TWO_THIRDS: f64 = 2.0 / 3.0;

    let prev_distance = curr.distance(prev) / 2.0;
    let next_distance = curr.distance(next) / 2.0;

    let rounded_start = curr.move_from(prev, -radius.min(prev_distance)).round_to(0);
    let rounded_end = curr.move_from(next, -radius.min(next_distance)).round_to(0);

    let control1 = point(
        THIRD * rounded_start.x + TWO_THIRDS * curr.x,
        TWO_THIRDS * curr.y + THIRD * rounded_start.y,
    );
    let control2 = point(
        THIRD * rounded_end.x + TWO_THIRDS * curr.x,
        TWO_THIRDS * curr.y + THIRD * rounded_end.y,
    );

    path.line_to(rounded_start);
    path.curve_to(control1, control2, rounded_end);
}

/// Cubic Bézier curves.
///
/// Without a route the curve leaves and enters horizontally (or vertically when the link is
/// taller than wide). With a route it is a Catmull-Rom spline through every point.
#[derive(Debug, Default)]
pub struct SmoothConnector;

impl Connector for SmoothConnector {
    fn name(&self) -> &str {
        "smooth"
    }

    fn connect(
        &self,
        geometry: &LinkGeometry,
        _args: &Value,
        _ctx: &mut ConnectorContext<'_>,
    ) -> Result<PathData> {
        let (s, t) = (geometry.source, geometry.target);
        let mut path = PathData::new();
        path.move_to(s);

        if geometry.route.is_empty() {
            if (s.x - t.x).abs() >= (s.y - t.y).abs() {
                let cx = (s.x + t.x) / 2.0;
                path.curve_to(point(cx, s.y), point(cx, t.y), t);
            } else {
                let cy = (s.y + t.y) / 2.0;
                path.curve_to(point(s.x, cy), point(t.x, cy), t);
            }
            return Ok(path);
        }

        let points = geometry.points();
        let n = points.len();
        for i in 0..n - 1 {
            let p0 = points[i.saturating_sub(1)];
            let p1 = points[i];
            let p2 = points[i + 1];
            let p3 = points[(i + 2).min(n - 1)];
            let c1 = point(p1.x + (p2.x - p0.x) / 6.0, p1.y + (p2.y - p0.y) / 6.0);
            let c2 = point(p2.x - (p3.x - p1.x) / 6.0, p2.y - (p3.y - p1.y) / 6.0);
            path.curve_to(c1, c2, p2);
        }
        Ok(path)
    }
}

/// Connectors available to a paper, by name.
pub struct ConnectorRegistry {
    connectors: IndexMap<String, Box<dyn Connector>>,
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        let mut registry = Self {
            connectors: IndexMap::new(),
        };
        registry.register(Box::new(NormalConnector));
        registry.register(Box::new(RoundedConnector));
        registry.register(Box::new(SmoothConnector));
        registry.register(Box::new(JumpOverConnector));
        registry
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.connectors.keys()).finish()
    }
}

impl ConnectorRegistry {
    /// Adds or replaces a connector under its own name.
    pub fn register(&mut self, connector: Box<dyn Connector>) {
        self.connectors
            .insert(connector.name().to_string(), connector);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Connector> {
        self.connectors.get(name).map(|c| c.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connectors.keys().map(String::as_str)
    }

    pub fn connect(
        &self,
        name: &str,
        geometry: &LinkGeometry,
        args: &Value,
        ctx: &mut ConnectorContext<'_>,
    ) -> Result<PathData> {
        let connector = self.get(name).ok_or_else(|| Error::UnknownConnector {
            name: name.to_string(),
        })?;
        connector.connect(geometry, args, ctx)
    }
}
