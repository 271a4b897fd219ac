//! SVG path data.

use std::fmt;

use crate::fmt::fmt_num_into;
use crate::point::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    MoveTo(Point),
    LineTo(Point),
    CurveTo {
        control1: Point,
        control2: Point,
        end: Point,
    },
}

impl Segment {
    pub fn end(&self) -> Point {
        match *self {
            Segment::MoveTo(p) | Segment::LineTo(p) => p,
            Segment::CurveTo { end, .. } => end,
        }
    }

    fn write_into(&self, out: &mut String) {
        let push_point = |out: &mut String, p: Point| {
            out.push(' ');
            fmt_num_into(out, p.x);
            out.push(' ');
            fmt_num_into(out, p.y);
        };
        match *self {
            Segment::MoveTo(p) => {
                out.push('M');
                push_point(out, p);
            }
            Segment::LineTo(p) => {
                out.push('L');
                push_point(out, p);
            }
            Segment::CurveTo {
                control1,
                control2,
                end,
            } => {
                out.push('C');
                push_point(out, control1);
                push_point(out, control2);
                push_point(out, end);
            }
        }
    }
}

/// An ordered list of path segments that serializes to the `d` attribute syntax
/// (`M x y L x y C x1 y1 x2 y2 x y`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathData {
    segments: Vec<Segment>,
}

impl PathData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, p: Point) -> &mut Self {
        self.segments.push(Segment::MoveTo(p));
        self
    }

    pub fn line_to(&mut self, p: Point) -> &mut Self {
        self.segments.push(Segment::LineTo(p));
        self
    }

    pub fn curve_to(&mut self, control1: Point, control2: Point, end: Point) -> &mut Self {
        self.segments.push(Segment::CurveTo {
            control1,
            control2,
            end,
        });
        self
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn extend(&mut self, other: PathData) {
        self.segments.extend(other.segments);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last point the pen reached, if any.
    pub fn current_point(&self) -> Option<Point> {
        self.segments.last().map(Segment::end)
    }

    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for (idx, seg) in self.segments.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            seg.write_into(&mut out);
        }
        out
    }
}

impl fmt::Display for PathData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromIterator<Segment> for PathData {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}
