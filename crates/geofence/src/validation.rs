//! Location record validation for report forms
//!
//! Soft checks only: coordinates outside the region and unknown
//! province/city combinations produce warnings, never errors. The hard
//! region gate for submissions is `Region::is_within_region`.

use crate::{pakistan, GeoPoint, Region};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LocationValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_location(
    region: &Region,
    province: Option<&str>,
    city: Option<&str>,
    point: Option<&GeoPoint>,
) -> LocationValidation {
    let mut result = LocationValidation::default();

    if let Some(point) = point {
        if !region.is_within_region(point) {
            result
                .warnings
                .push(format!("Location appears to be outside {}", region.name));
        }
    }

    if let (Some(province), Some(city)) = (non_empty(province), non_empty(city)) {
        if !is_known_province_city(province, city) {
            result
                .warnings
                .push("City may not belong to the selected province".to_string());
        }
    }

    result
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn is_known_province_city(province: &str, city: &str) -> bool {
    pakistan::PROVINCE_CITIES
        .iter()
        .find(|(p, _)| *p == province)
        .map(|(_, cities)| cities.contains(&city))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyCity {
    pub name: &'static str,
    pub province: &'static str,
    pub distance_km: f64,
}

/// Reference cities within `radius_km`, nearest first.
/// Distances are rounded to two decimals before filtering.
pub fn nearby_major_cities(point: &GeoPoint, radius_km: f64) -> Vec<NearbyCity> {
    let mut cities: Vec<NearbyCity> = pakistan::MAJOR_CITIES
        .iter()
        .map(|&(name, province, lat, lon)| {
            let km = point.distance_m(&GeoPoint::from_static(lat, lon)) / 1000.0;
            NearbyCity {
                name,
                province,
                distance_km: (km * 100.0).round() / 100.0,
            }
        })
        .filter(|c| c.distance_km <= radius_km)
        .collect();

    cities.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    cities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_clean_record_has_no_findings() {
        let region = Region::pakistan();
        let v = validate_location(&region, Some("Sindh"), Some("Karachi"), Some(&pt(24.8607, 67.0011)));
        assert!(v.is_valid());
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn test_outside_region_warns() {
        let region = Region::pakistan();
        // Delhi
        let v = validate_location(&region, None, None, Some(&pt(28.6139, 77.2090)));
        assert!(v.is_valid());
        assert_eq!(v.warnings, vec!["Location appears to be outside Pakistan".to_string()]);
    }

    #[test]
    fn test_province_city_mismatch_warns() {
        let region = Region::pakistan();
        let v = validate_location(&region, Some("Punjab"), Some("Quetta"), None);
        assert_eq!(v.warnings.len(), 1);

        let v = validate_location(&region, Some("GB"), Some("Skardu"), None);
        assert!(v.warnings.is_empty());

        // blank fields are not checked
        let v = validate_location(&region, Some("Punjab"), Some("  "), None);
        assert!(v.warnings.is_empty());
    }

    #[test]
    fn test_nearby_cities_sorted() {
        // Between Islamabad and Rawalpindi
        let cities = nearby_major_cities(&pt(33.62, 73.03), 50.0);
        let names: Vec<_> = cities.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Islamabad") && names.contains(&"Rawalpindi"));
        assert!(cities[0].distance_km <= cities[1].distance_km);
    }

    #[test]
    fn test_nearby_cities_empty_far_away() {
        assert!(nearby_major_cities(&pt(51.5074, -0.1278), 50.0).is_empty());
    }
}
