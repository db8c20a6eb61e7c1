//! Minimal planar geometry: points, extents, and feature geometries.
//!
//! Only what the clustering pass needs: vector addition and scaling for
//! centroids, and axis-aligned extents for neighbor windows. Extents map
//! onto `rstar` envelopes so stores can index them directly. No projection
//! handling; coordinates are whatever map units the store uses.

use core::fmt;
use core::ops::{Add, AddAssign, Div};

use rstar::{Envelope, AABB};
use serde::{Deserialize, Serialize};

/// A 2D coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The origin.
    pub const fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Multiply both coordinates by `factor`.
    pub fn scale(self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Div<f64> for Point {
    type Output = Point;

    fn div(self, divisor: f64) -> Point {
        Point::new(self.x / divisor, self.y / divisor)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned bounding box, edges inclusive.
///
/// An empty extent has `min > max` on both axes and intersects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Lower-left corner.
    pub min: Point,
    /// Upper-right corner.
    pub max: Point,
}

impl Extent {
    /// Create an extent from its corners.
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// The empty extent.
    pub fn empty() -> Self {
        Self {
            min: Point::new(f64::INFINITY, f64::INFINITY),
            max: Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Zero-area extent covering exactly `point`.
    pub fn from_point(point: Point) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Whether this extent covers no area and no point.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Grow uniformly by `margin` on every side.
    pub fn buffer(self, margin: f64) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Grow to include `point`.
    pub fn extend(&mut self, point: Point) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
    }

    /// The equivalent R-tree envelope, or `None` for the empty extent.
    pub fn to_aabb(&self) -> Option<AABB<[f64; 2]>> {
        if self.is_empty() {
            return None;
        }
        Some(AABB::from_corners(
            [self.min.x, self.min.y],
            [self.max.x, self.max.y],
        ))
    }

    /// Extent covering an R-tree envelope.
    pub fn from_aabb(aabb: &AABB<[f64; 2]>) -> Self {
        Self {
            min: aabb.lower().into(),
            max: aabb.upper().into(),
        }
    }

    /// Whether `point` lies inside or on the boundary.
    pub fn contains_point(&self, point: &Point) -> bool {
        self.to_aabb()
            .is_some_and(|aabb| aabb.contains_point(&[point.x, point.y]))
    }

    /// Whether the two extents share at least one point.
    pub fn intersects(&self, other: &Extent) -> bool {
        match (self.to_aabb(), other.to_aabb()) {
            (Some(a), Some(b)) => a.intersects(&b),
            _ => false,
        }
    }

    /// Width along x.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height along y.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::empty()
    }
}

/// Native geometry of a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single position.
    Point(Point),
    /// An open polyline.
    LineString(Vec<Point>),
    /// A closed ring (first ring is the exterior).
    Polygon(Vec<Vec<Point>>),
}

impl Geometry {
    /// Short lowercase name of the geometry kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "point",
            Geometry::LineString(_) => "linestring",
            Geometry::Polygon(_) => "polygon",
        }
    }

    /// The point, if this is a point geometry.
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    /// Bounding extent of all vertices.
    pub fn extent(&self) -> Extent {
        let mut extent = Extent::empty();
        match self {
            Geometry::Point(p) => extent.extend(*p),
            Geometry::LineString(line) => line.iter().for_each(|p| extent.extend(*p)),
            Geometry::Polygon(rings) => rings.iter().flatten().for_each(|p| extent.extend(*p)),
        }
        extent
    }
}
