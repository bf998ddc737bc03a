//! Operating region: bounding box gate + border polygon

use crate::{pakistan, BorderPolygon, BoundingBox, GeoError, GeoPoint, Result};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};

/// A country-sized operating region, loaded once and shared read-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub bounds: BoundingBox,
    pub border: BorderPolygon,
}

impl Region {
    pub fn new(name: impl Into<String>, bounds: BoundingBox, border: BorderPolygon) -> Self {
        Self {
            name: name.into(),
            bounds,
            border,
        }
    }

    /// Pakistan with its published bounding box and simplified border
    pub fn pakistan() -> Self {
        let border = BorderPolygon::from_static_ring(pakistan::border_ring());
        Self::new(pakistan::REGION_NAME, pakistan::BOUNDS, border)
    }

    /// Load the border from a GeoJSON Polygon (geometry, feature, or the first
    /// polygon feature of a collection). Only the exterior ring is used.
    ///
    /// When `bounds` is `None` the box is derived from the ring.
    pub fn from_geojson(name: impl Into<String>, bounds: Option<BoundingBox>, text: &str) -> Result<Self> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| GeoError::GeoJson(e.to_string()))?;

        let geometry = match geojson {
            GeoJson::Geometry(g) => Some(g),
            GeoJson::Feature(f) => f.geometry,
            GeoJson::FeatureCollection(fc) => fc.features.into_iter().find_map(|f| f.geometry),
        }
        .ok_or_else(|| GeoError::GeoJson("no geometry found".to_string()))?;

        let exterior = match geometry.value {
            geojson::Value::Polygon(rings) => rings.into_iter().next(),
            _ => return Err(GeoError::GeoJson("expected a Polygon geometry".to_string())),
        }
        .ok_or_else(|| GeoError::GeoJson("polygon has no exterior ring".to_string()))?;

        // GeoJSON positions are [longitude, latitude, ...]
        let ring = exterior
            .iter()
            .map(|pos| match pos.as_slice() {
                [lon, lat, ..] => GeoPoint::new(*lat, *lon),
                _ => Err(GeoError::GeoJson("position needs two coordinates".to_string())),
            })
            .collect::<Result<Vec<_>>>()?;

        let border = BorderPolygon::new(ring)?;
        let bounds = bounds.unwrap_or_else(|| border.bounding_box());
        Ok(Self::new(name, bounds, border))
    }

    /// Two-stage containment check.
    ///
    /// The bounding box rejects far-away points before any polygon work;
    /// only points inside the box pay for the O(n) ray cast.
    pub fn is_within_region(&self, point: &GeoPoint) -> bool {
        if !self.bounds.contains(point) {
            return false;
        }
        self.border.contains(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_box_rejects_before_polygon() {
        // A polygon that covers the whole globe would accept anything; a
        // tiny box in front of it must still reject.
        let world = BorderPolygon::new(vec![
            pt(-89.0, -179.0),
            pt(-89.0, 179.0),
            pt(89.0, 179.0),
            pt(89.0, -179.0),
        ])
        .unwrap();
        let region = Region::new(
            "tiny",
            BoundingBox { north: 1.0, south: 0.0, east: 1.0, west: 0.0 },
            world,
        );
        assert!(region.is_within_region(&pt(0.5, 0.5)));
        assert!(!region.is_within_region(&pt(48.85, 2.35)));
    }

    #[test]
    fn test_from_geojson_feature() {
        let text = r#"{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]]
            }
        }"#;
        let region = Region::from_geojson("square", None, text).unwrap();
        assert_eq!(region.bounds.north, 10.0);
        assert!(region.is_within_region(&pt(5.0, 5.0)));
        assert!(!region.is_within_region(&pt(11.0, 5.0)));
    }

    #[test]
    fn test_from_geojson_rejects_points() {
        let text = r#"{"type": "Point", "coordinates": [67.0, 24.8]}"#;
        assert!(matches!(
            Region::from_geojson("pt", None, text),
            Err(GeoError::GeoJson(_))
        ));
    }
}
