#![forbid(unsafe_code)]

//! Geometry primitives shared by the trellis crates.
//!
//! Points are `euclid` points in an untyped unit space. `Line`, `Polyline` and `PathData`
//! add the small amount of 2D machinery the connectors need (intersections, rotation about
//! an origin, SVG path data serialization).

pub mod fmt;
pub mod line;
pub mod path;
pub mod point;
pub mod polyline;

pub use line::Line;
pub use path::{PathData, Segment};
pub use point::{Point, PointExt, Unit, Vector, point, vector};
pub use polyline::Polyline;
