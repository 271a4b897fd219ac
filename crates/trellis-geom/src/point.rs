//! Point helpers.
//!
//! Angles are expressed in degrees and measured with the y-axis pointing up, which is the
//! convention connector code relies on when it orients jumps and corner joints.

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

/// Normalizes an angle in degrees into `[0, 360)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % 360.0;
    if a < 0.0 { a + 360.0 } else { a }
}

pub trait PointExt: Sized {
    /// Euclidean distance to `other`.
    fn distance(&self, other: Point) -> f64;

    fn squared_distance(&self, other: Point) -> f64;

    /// `self - other`, component wise.
    fn difference(&self, other: Point) -> Point;

    /// Angle (degrees, y-axis up, `[0, 360)`) of the vector from `self` to `p`.
    fn theta(&self, p: Point) -> f64;

    /// Moves `self` along the line from `reference` through `self` by `distance`.
    ///
    /// Negative distances move back towards `reference`.
    fn move_from(&self, reference: Point, distance: f64) -> Point;

    /// Rotates `self` by `angle` degrees about `origin`.
    fn rotate_around(&self, origin: Point, angle: f64) -> Point;

    /// Rounds both coordinates to `precision` decimal places (half-up).
    fn round_to(&self, precision: u32) -> Point;

    /// Cross product of the vectors `self -> p2` and `self -> p1`.
    fn cross(&self, p1: Point, p2: Point) -> f64;

    fn offset(&self, dx: f64, dy: f64) -> Point;
}

impl PointExt for Point {
    fn distance(&self, other: Point) -> f64 {
        self.squared_distance(other).sqrt()
    }

    fn squared_distance(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    fn difference(&self, other: Point) -> Point {
        point(self.x - other.x, self.y - other.y)
    }

    fn theta(&self, p: Point) -> f64 {
        let y = -(p.y - self.y);
        let x = p.x - self.x;
        let mut rad = y.atan2(x);
        if rad < 0.0 {
            rad += 2.0 * std::f64::consts::PI;
        }
        180.0 * rad / std::f64::consts::PI
    }

    fn move_from(&self, reference: Point, distance: f64) -> Point {
        let theta = reference.theta(*self).to_radians();
        self.offset(theta.cos() * distance, -theta.sin() * distance)
    }

    fn rotate_around(&self, origin: Point, angle: f64) -> Point {
        if angle == 0.0 {
            return *self;
        }
        let rad = normalize_angle(-angle).to_radians();
        let (sin, cos) = rad.sin_cos();
        let dx = self.x - origin.x;
        let dy = self.y - origin.y;
        point(
            cos * dx - sin * dy + origin.x,
            sin * dx + cos * dy + origin.y,
        )
    }

    fn round_to(&self, precision: u32) -> Point {
        let f = 10f64.powi(precision as i32);
        point((self.x * f + 0.5).floor() / f, (self.y * f + 0.5).floor() / f)
    }

    fn cross(&self, p1: Point, p2: Point) -> f64 {
        (p2.x - self.x) * (p1.y - self.y) - (p2.y - self.y) * (p1.x - self.x)
    }

    fn offset(&self, dx: f64, dy: f64) -> Point {
        point(self.x + dx, self.y + dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn theta_uses_an_upward_y_axis() {
        let o = point(0.0, 0.0);
        assert_eq!(o.theta(point(10.0, 0.0)), 0.0);
        assert!((o.theta(point(0.0, -10.0)) - 90.0).abs() < 1e-9);
        assert!((o.theta(point(-10.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((o.theta(point(0.0, 10.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn move_from_walks_along_the_reference_direction() {
        let p = point(50.0, 0.0);
        assert_close(p.move_from(point(0.0, 0.0), -5.0), point(45.0, 0.0));
        assert_close(p.move_from(point(0.0, 0.0), 5.0), point(55.0, 0.0));
        let q = point(0.0, 20.0);
        assert_close(q.move_from(point(0.0, 0.0), 5.0), point(0.0, 25.0));
    }

    #[test]
    fn rotate_around_turns_counter_clockwise_on_screen_for_negative_angles() {
        let p = point(10.0, 0.0);
        assert_close(p.rotate_around(point(0.0, 0.0), -90.0), point(0.0, 10.0));
        assert_close(p.rotate_around(point(0.0, 0.0), 90.0), point(0.0, -10.0));
        assert_close(p.rotate_around(point(5.0, 0.0), 180.0), point(0.0, 0.0));
    }

    #[test]
    fn round_to_rounds_half_up() {
        assert_eq!(point(1.5, -2.5).round_to(0), point(2.0, -2.0));
        assert_eq!(point(1.234, 5.678).round_to(1), point(1.2, 5.7));
    }
}
