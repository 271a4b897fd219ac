//! Straight line segments.

use crate::point::{Point, PointExt, point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    pub fn squared_length(&self) -> f64 {
        self.start.squared_distance(self.end)
    }

    pub fn midpoint(&self) -> Point {
        point(
            (self.start.x + self.end.x) / 2.0,
            (self.start.y + self.end.y) / 2.0,
        )
    }

    /// Point at ratio `t` of the segment, clamped to the endpoints.
    pub fn point_at(&self, t: f64) -> Point {
        if t <= 0.0 {
            return self.start;
        }
        if t >= 1.0 {
            return self.end;
        }
        self.start.lerp(self.end, t)
    }

    pub fn rotate(&self, origin: Point, angle: f64) -> Line {
        Line::new(
            self.start.rotate_around(origin, angle),
            self.end.rotate_around(origin, angle),
        )
    }

    /// Intersection point of two segments, endpoints included.
    ///
    /// Parallel and collinear segments never intersect.
    pub fn intersection(&self, other: &Line) -> Option<Point> {
        let d1x = self.end.x - self.start.x;
        let d1y = self.end.y - self.start.y;
        let d2x = other.end.x - other.start.x;
        let d2y = other.end.y - other.start.y;
        let det = d1x * d2y - d1y * d2x;
        let dx = other.start.x - self.start.x;
        let dy = other.start.y - self.start.y;
        let alpha = dx * d2y - dy * d2x;
        let beta = dx * d1y - dy * d1x;

        if det == 0.0 || alpha * det < 0.0 || beta * det < 0.0 {
            return None;
        }
        if det > 0.0 {
            if alpha > det || beta > det {
                return None;
            }
        } else if alpha < det || beta < det {
            return None;
        }

        Some(point(
            self.start.x + alpha * d1x / det,
            self.start.y + alpha * d1y / det,
        ))
    }

    /// Whether `p` lies exactly on the segment.
    pub fn contains_point(&self, p: Point) -> bool {
        if self.start.cross(p, self.end) != 0.0 {
            return false;
        }
        let length = self.length();
        if self.start.distance(p) > length {
            return false;
        }
        if p.distance(self.end) > length {
            return false;
        }
        true
    }

    /// Endpoints ordered so that the first one is the lower-left corner of the bounding box
    /// whenever the segment is monotone, which is what the overlap test expects.
    pub fn sorted_endpoints(&self) -> (Point, Point) {
        let (mut x1, mut y1) = (self.start.x, self.start.y);
        let (mut x2, mut y2) = (self.end.x, self.end.y);
        if x1 > x2 {
            std::mem::swap(&mut x1, &mut x2);
            std::mem::swap(&mut y1, &mut y2);
        }
        if y1 > y2 {
            std::mem::swap(&mut x1, &mut x2);
            std::mem::swap(&mut y1, &mut y2);
        }
        (point(x1, y1), point(x2, y2))
    }

    /// Cheap bounding-range test used before computing exact intersections.
    pub fn overlaps(&self, other: &Line) -> bool {
        let (a1, a2) = self.sorted_endpoints();
        let (b1, b2) = other.sorted_endpoints();
        let x_match = a1.x <= b2.x && b1.x <= a2.x;
        let y_match = a1.y <= b2.y && b1.y <= a2.y;
        x_match && y_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_segments_intersect_at_the_crossing() {
        let a = Line::new(point(0.0, 0.0), point(100.0, 0.0));
        let b = Line::new(point(50.0, -50.0), point(50.0, 50.0));
        assert_eq!(a.intersection(&b), Some(point(50.0, 0.0)));
        assert_eq!(b.intersection(&a), Some(point(50.0, 0.0)));
    }

    #[test]
    fn disjoint_and_parallel_segments_do_not_intersect() {
        let a = Line::new(point(0.0, 0.0), point(10.0, 0.0));
        let b = Line::new(point(20.0, -5.0), point(20.0, 5.0));
        let c = Line::new(point(0.0, 5.0), point(10.0, 5.0));
        assert_eq!(a.intersection(&b), None);
        assert_eq!(a.intersection(&c), None);
        assert_eq!(a.intersection(&a), None);
    }

    #[test]
    fn touching_endpoints_count_as_intersections() {
        let a = Line::new(point(0.0, 0.0), point(10.0, 0.0));
        let b = Line::new(point(10.0, 0.0), point(10.0, 10.0));
        assert_eq!(a.intersection(&b), Some(point(10.0, 0.0)));
    }

    #[test]
    fn contains_point_requires_collinearity_and_bounds() {
        let a = Line::new(point(0.0, 0.0), point(10.0, 0.0));
        assert!(a.contains_point(point(5.0, 0.0)));
        assert!(a.contains_point(point(10.0, 0.0)));
        assert!(!a.contains_point(point(11.0, 0.0)));
        assert!(!a.contains_point(point(5.0, 1.0)));
    }

    #[test]
    fn overlap_uses_normalized_bounding_ranges() {
        let a = Line::new(point(100.0, 0.0), point(0.0, 0.0));
        let b = Line::new(point(50.0, 50.0), point(50.0, -50.0));
        let c = Line::new(point(200.0, 50.0), point(200.0, -50.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn point_at_is_clamped() {
        let a = Line::new(point(0.0, 0.0), point(10.0, 0.0));
        assert_eq!(a.point_at(-1.0), point(0.0, 0.0));
        assert_eq!(a.point_at(2.0), point(10.0, 0.0));
        assert_eq!(a.point_at(0.5), point(5.0, 0.0));
        assert_eq!(a.midpoint(), point(5.0, 0.0));
    }
}
