//! Jump-over connector.
//!
//! A link drawn with this connector carves a small jump (arc, gap or cubic hump) wherever it
//! crosses another link that is drawn below it. When two jump-over links cross, only the one
//! later in graph order jumps, so a crossing never shows two jumps.

use indexmap::IndexSet;
use serde_json::Value;
use trellis_geom::{Line, PathData, Point, PointExt, point};
use trellis_graph::{CellId, Graph};

use super::{Connector, ConnectorContext, LinkGeometry, LinkGeometrySource, rounded_corner};
use crate::error::Result;

pub const NAME: &str = "jumpover";

pub const DEFAULT_JUMP_SIZE: f64 = 5.0;

pub const DEFAULT_RADIUS: f64 = 0.0;

/// Extra room needed between a jump and a segment end before the jump is carved.
pub const CLOSE_PROXIMITY_PADDING: f64 = 1.0;

pub const DEFAULT_IGNORED_CONNECTORS: [&str; 1] = ["smooth"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JumpType {
    /// Half circle approximated by two cubic curves.
    #[default]
    Arc,
    /// The stroke is interrupted.
    Gap,
    /// One cubic hump.
    Cubic,
}

impl JumpType {
    /// Case-insensitive; anything unknown is [`JumpType::Arc`].
    pub fn parse_lenient(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "gap" => Self::Gap,
            "cubic" => Self::Cubic,
            _ => Self::Arc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JumpOverOptions {
    /// Half length of a jump.
    pub size: f64,
    pub jump: JumpType,
    /// Corner rounding between consecutive straight segments; `0` keeps sharp corners.
    pub radius: f64,
    /// Links drawn with these connectors are never jumped over.
    pub ignore_connectors: Vec<String>,
}

impl Default for JumpOverOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_JUMP_SIZE,
            jump: JumpType::Arc,
            radius: DEFAULT_RADIUS,
            ignore_connectors: DEFAULT_IGNORED_CONNECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl JumpOverOptions {
    /// Reads connector `args`; missing, zero or malformed values fall back to defaults.
    pub fn from_args(args: &Value) -> Self {
        let mut opts = Self::default();
        let positive = |key: &str| {
            args.get(key)
                .and_then(Value::as_f64)
                .filter(|v| *v != 0.0 && v.is_finite())
        };
        if let Some(size) = positive("size") {
            opts.size = size;
        }
        if let Some(radius) = positive("radius") {
            opts.radius = radius;
        }
        if let Some(jump) = args.get("jump") {
            opts.jump = match jump {
                Value::String(s) => JumpType::parse_lenient(s),
                _ => JumpType::Arc,
            };
        }
        if let Some(list) = args.get("ignoreConnectors").and_then(Value::as_array) {
            opts.ignore_connectors = list
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
        }
        opts
    }

    fn ignores(&self, connector: &str) -> bool {
        self.ignore_connectors.iter().any(|c| c == connector)
    }
}

/// Links currently drawn with the jump-over connector on one paper.
///
/// Every registered link is re-routed once no graph batch remains open, so that jumps follow
/// the final geometry of a multi-step change.
#[derive(Debug, Clone, Default)]
pub struct JumpOverRegistry {
    links: IndexSet<CellId>,
}

impl JumpOverRegistry {
    /// Returns whether the link was newly registered.
    pub fn register(&mut self, id: &CellId) -> bool {
        if self.links.contains(id) {
            return false;
        }
        self.links.insert(id.clone())
    }

    pub fn deregister(&mut self, id: &CellId) -> bool {
        self.links.shift_remove(id)
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }

    pub fn contains(&self, id: &CellId) -> bool {
        self.links.contains(id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &CellId> {
        self.links.iter()
    }
}

/// What the algorithm may read besides the link's own geometry.
pub struct JumpOverContext<'a> {
    pub link: &'a CellId,
    pub graph: &'a Graph,
    pub default_connector: &'a str,
    pub geometry: &'a dyn LinkGeometrySource,
}

#[derive(Debug, Default)]
pub struct JumpOverConnector;

impl Connector for JumpOverConnector {
    fn name(&self) -> &str {
        NAME
    }

    fn connect(
        &self,
        geometry: &LinkGeometry,
        args: &Value,
        ctx: &mut ConnectorContext<'_>,
    ) -> Result<PathData> {
        ctx.jumpover.register(ctx.link);
        let opts = JumpOverOptions::from_args(args);
        let jctx = JumpOverContext {
            link: ctx.link,
            graph: ctx.graph,
            default_connector: ctx.default_connector,
            geometry: ctx.geometry,
        };
        Ok(compute(
            geometry.source,
            geometry.target,
            &geometry.route,
            &opts,
            &jctx,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Piece {
    line: Line,
    jump: bool,
}

impl Piece {
    fn plain(line: Line) -> Self {
        Self { line, jump: false }
    }
}

fn create_lines(source: Point, target: Point, route: &[Point]) -> Vec<Line> {
    LinkGeometry::new(source, target, route.to_vec()).lines()
}

/// Computes the path of one link, jumping over the links below it.
pub fn compute(
    source: Point,
    target: Point,
    route: &[Point],
    opts: &JumpOverOptions,
    ctx: &JumpOverContext<'_>,
) -> PathData {
    let this_lines = create_lines(source, target, route);
    let all_links: Vec<_> = ctx.graph.links().collect();

    if all_links.len() == 1 {
        let pieces: Vec<Piece> = this_lines.into_iter().map(Piece::plain).collect();
        return build_path(&pieces, opts.size, opts.jump, opts.radius);
    }

    let this_index = all_links.iter().position(|l| l.id() == ctx.link);

    // Lines of every link this one may jump over, in graph order.
    let mut others: Vec<Vec<Line>> = Vec::new();
    for (idx, link) in all_links.iter().enumerate() {
        let connector = link
            .connector()
            .map(|c| c.name)
            .unwrap_or_else(|| ctx.default_connector.to_string());
        if opts.ignores(&connector) {
            continue;
        }
        let above = this_index.is_none_or(|this| idx > this);
        if above && connector == NAME {
            continue;
        }
        if link.id() == ctx.link {
            continue;
        }
        let lines = ctx
            .geometry
            .link_geometry(link.id())
            .map(LinkGeometry::lines)
            .unwrap_or_default();
        others.push(lines);
    }

    let mut pieces = Vec::new();
    for this_line in &this_lines {
        let mut intersections: Vec<Point> = Vec::new();
        for lines in &others {
            let mut candidates = lines.clone();
            let overlap = candidates.iter().position(|l| this_line.overlaps(l));
            if let Some(i) = overlap {
                // A chain that touches this line at a shared vertex continues from that
                // vertex; its next segment cannot cross in a way worth a jump.
                if this_line.contains_point(candidates[i].end) && i + 1 < candidates.len() {
                    candidates.remove(i + 1);
                }
            }
            intersections.extend(candidates.iter().filter_map(|l| this_line.intersection(l)));
        }
        intersections.sort_by(|a, b| {
            this_line
                .start
                .squared_distance(*a)
                .total_cmp(&this_line.start.squared_distance(*b))
        });

        if intersections.is_empty() {
            pieces.push(Piece::plain(*this_line));
        } else {
            pieces.extend(create_jumps(*this_line, &intersections, opts.size));
        }
    }

    build_path(&pieces, opts.size, opts.jump, opts.radius)
}

/// Splits `line` into straight pieces and jump pieces around the intersections.
fn create_jumps(line: Line, intersections: &[Point], size: f64) -> Vec<Piece> {
    let min_room = size * 2.0 + CLOSE_PROXIMITY_PADDING;
    let mut skip = vec![false; intersections.len()];
    let mut out: Vec<Piece> = Vec::new();

    for (idx, p) in intersections.iter().enumerate() {
        if skip[idx] {
            continue;
        }
        let last = out.pop().map(|piece| piece.line).unwrap_or(line);

        let jump_start = p.move_from(last.start, -size);
        let mut jump_end = p.move_from(last.start, size);

        match intersections.get(idx + 1) {
            Some(next) => {
                let distance = jump_end.distance(*next);
                if distance <= size {
                    // Swallow the next crossing into this jump.
                    jump_end = next.move_from(last.start, distance);
                    skip[idx + 1] = true;
                }
            }
            None => {
                if jump_start.distance(last.end) < min_room {
                    out.push(Piece::plain(last));
                    continue;
                }
            }
        }

        if jump_end.distance(last.start) < min_room {
            out.push(Piece::plain(last));
            continue;
        }

        out.push(Piece::plain(Line::new(last.start, jump_start)));
        out.push(Piece {
            line: Line::new(jump_start, jump_end),
            jump: true,
        });
        out.push(Piece::plain(Line::new(jump_end, last.end)));
    }
    out
}

/// Whether a jump over `line` must be mirrored to keep bowing up (or right).
fn flips(line: &Line) -> bool {
    let diff = line.start.difference(line.end);
    diff.x < 0.0 || (diff.x == 0.0 && diff.y < 0.0)
}

fn build_path(pieces: &[Piece], size: f64, jump: JumpType, radius: f64) -> PathData {
    let mut path = PathData::new();
    let Some(first) = pieces.first() else {
        return path;
    };
    path.move_to(first.line.start);

    for (index, piece) in pieces.iter().enumerate() {
        let line = piece.line;
        if piece.jump {
            match jump {
                JumpType::Arc => {
                    let mut angle = -90.0;
                    if flips(&line) {
                        angle += 180.0;
                    }
                    let midpoint = line.midpoint();
                    let center = Line::new(midpoint, line.end).rotate(midpoint, angle);

                    let half = Line::new(line.start, midpoint);
                    let control1 = half.point_at(2.0 / 3.0).rotate_around(line.start, angle);
                    let control2 = center.point_at(1.0 / 3.0).rotate_around(center.end, -angle);
                    path.curve_to(control1, control2, center.end);

                    let half = Line::new(midpoint, line.end);
                    let control1 = center.point_at(1.0 / 3.0).rotate_around(center.end, angle);
                    let control2 = half.point_at(1.0 / 3.0).rotate_around(line.end, -angle);
                    path.curve_to(control1, control2, line.end);
                }
                JumpType::Gap => {
                    path.move_to(line.end);
                }
                JumpType::Cubic => {
                    let angle = line.start.theta(line.end);
                    let x_offset = size * 0.6;
                    let mut y_offset = size * 1.35;
                    if flips(&line) {
                        y_offset = -y_offset;
                    }
                    let control1 = point(line.start.x + x_offset, line.start.y + y_offset)
                        .rotate_around(line.start, angle);
                    let control2 = point(line.end.x - x_offset, line.end.y + y_offset)
                        .rotate_around(line.end, angle);
                    path.curve_to(control1, control2, line.end);
                }
            }
            continue;
        }

        match pieces.get(index + 1) {
            Some(next) if radius != 0.0 && !next.jump => {
                rounded_corner(&mut path, radius, line.end, line.start, next.line.end);
            }
            _ => {
                path.line_to(line.end);
            }
        }
    }
    path
}
