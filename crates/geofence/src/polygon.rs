//! Bounding box and border ring geometry

use crate::{GeoError, GeoPoint, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned lat/lon box, used as a fast-reject pre-filter only
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Inclusive on all four edges
    #[inline]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude() >= self.south
            && point.latitude() <= self.north
            && point.longitude() >= self.west
            && point.longitude() <= self.east
    }

    /// Smallest box enclosing every point of the ring
    pub fn enclosing(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let init = BoundingBox {
            north: first.latitude(),
            south: first.latitude(),
            east: first.longitude(),
            west: first.longitude(),
        };
        Some(points.iter().fold(init, |b, p| BoundingBox {
            north: b.north.max(p.latitude()),
            south: b.south.min(p.latitude()),
            east: b.east.max(p.longitude()),
            west: b.west.min(p.longitude()),
        }))
    }
}

/// Closed border ring. The closing edge (last -> first) is implicit, so the
/// first point does not need to be repeated at the end.
///
/// Self-intersection is assumed absent and not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GeoPoint>", into = "Vec<GeoPoint>")]
pub struct BorderPolygon {
    ring: Vec<GeoPoint>,
}

impl TryFrom<Vec<GeoPoint>> for BorderPolygon {
    type Error = GeoError;

    fn try_from(ring: Vec<GeoPoint>) -> Result<Self> {
        BorderPolygon::new(ring)
    }
}

impl From<BorderPolygon> for Vec<GeoPoint> {
    fn from(polygon: BorderPolygon) -> Self {
        polygon.ring
    }
}

impl BorderPolygon {
    pub fn new(ring: Vec<GeoPoint>) -> Result<Self> {
        if ring.len() < 3 {
            return Err(GeoError::DegenerateRing(ring.len()));
        }
        Ok(Self { ring })
    }

    pub(crate) fn from_static_ring(ring: Vec<GeoPoint>) -> Self {
        debug_assert!(ring.len() >= 3);
        Self { ring }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.ring
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        // ring has >= 3 points by construction
        BoundingBox::enclosing(&self.ring).unwrap_or(BoundingBox {
            north: 0.0,
            south: 0.0,
            east: 0.0,
            west: 0.0,
        })
    }

    /// Ray-casting parity test with longitude as x and latitude as y.
    ///
    /// A horizontal ray is cast eastward from the point; every edge whose
    /// latitude span straddles the point and whose crossing lies east of it
    /// flips the parity. Points exactly on an edge or vertex have no defined
    /// answer.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let x = point.longitude();
        let y = point.latitude();
        let n = self.ring.len();

        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (self.ring[i].longitude(), self.ring[i].latitude());
            let (xj, yj) = (self.ring[j].longitude(), self.ring[j].latitude());

            if (yi > y) != (yj > y) {
                let x_cross = (xj - xi) * (y - yi) / (yj - yi) + xi;
                if x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}
