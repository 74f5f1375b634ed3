//! Minimum bounding rectangles over geographic coordinates: a plain
//! min/max struct with `intersects`/`merge`/`expand`/`area`, over lon/lat
//! rather than an opaque x/y pair.

use crate::geometry::Geometry;
use crate::primitives::Coord;

/// A geographic bounding box: west/south/east/north in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// An inverted box that `expand` will absorb into the first real point.
    pub fn empty() -> Self {
        Self {
            west: f64::INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            north: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.west > self.east || self.south > self.north
    }

    pub fn from_coord(c: Coord) -> Self {
        Self {
            west: c.lon,
            south: c.lat,
            east: c.lon,
            north: c.lat,
        }
    }

    pub fn expand(&mut self, other: &Bounds) {
        self.west = self.west.min(other.west);
        self.south = self.south.min(other.south);
        self.east = self.east.max(other.east);
        self.north = self.north.max(other.north);
    }

    pub fn merge(&self, other: &Bounds) -> Bounds {
        let mut b = *self;
        b.expand(other);
        b
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        !(self.east < other.west
            || self.west > other.east
            || self.north < other.south
            || self.south > other.north)
    }

    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }

    pub fn area(&self) -> f64 {
        (self.east - self.west) * (self.north - self.south)
    }

    /// How much this box's area would grow to also cover `other`.
    pub fn enlargement(&self, other: &Bounds) -> f64 {
        self.merge(other).area() - self.area()
    }

    /// Every coordinate of `geometry`, folded into a single MBR.
    pub fn of_geometry(geometry: &Geometry) -> Bounds {
        let mut bounds = Bounds::empty();
        match geometry {
            Geometry::Point(c) => bounds.expand(&Bounds::from_coord(*c)),
            Geometry::Line(coords) => {
                for c in coords {
                    bounds.expand(&Bounds::from_coord(*c));
                }
            }
            Geometry::Polygon(rings) => {
                for ring in rings {
                    for c in ring {
                        bounds.expand(&Bounds::from_coord(*c));
                    }
                }
            }
        }
        bounds
    }

    /// Every coordinate of `geometry`, for the point+radius query.
    pub fn coords_of(geometry: &Geometry) -> Vec<Coord> {
        match geometry {
            Geometry::Point(c) => vec![*c],
            Geometry::Line(coords) => coords.clone(),
            Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
        }
    }
}
