//! Pakistan reference data: bounding box, simplified border ring,
//! province/city table and major cities.

use crate::{BoundingBox, GeoPoint};

pub const REGION_NAME: &str = "Pakistan";

pub const BOUNDS: BoundingBox = BoundingBox {
    north: 37.084,
    south: 23.635,
    east: 77.841,
    west: 60.872,
};

/// Simplified border as (longitude, latitude), clockwise from the Iranian
/// coast at Gwadar Bay. Follows the Iran and Afghanistan borders north, the
/// China border east, the Line of Control and the Indian border south, then
/// the coastline back west.
const BORDER_LON_LAT: &[(f64, f64)] = &[
    (61.61, 25.19),
    (61.85, 26.20),
    (63.18, 26.64),
    (63.30, 27.15),
    (62.78, 27.26),
    (62.78, 28.25),
    (61.90, 28.55),
    (61.50, 29.00),
    (60.88, 29.86),
    (62.48, 29.40),
    (63.58, 29.48),
    (64.35, 29.56),
    (65.05, 29.47),
    (66.35, 29.85),
    (66.50, 30.40),
    (66.40, 30.95),
    (67.00, 31.30),
    (67.80, 31.60),
    (68.50, 31.75),
    (69.30, 31.90),
    (69.50, 33.00),
    (69.90, 34.00),
    (71.10, 34.10),
    (71.50, 34.90),
    (71.20, 35.50),
    (71.50, 36.10),
    (72.50, 36.80),
    (73.80, 36.90),
    (74.50, 37.05),
    (75.40, 36.90),
    (76.60, 35.90),
    (77.80, 35.50),
    (76.90, 34.95),
    (75.70, 34.55),
    (74.30, 34.70),
    (74.00, 34.20),
    (73.95, 33.50),
    (74.10, 33.00),
    (74.65, 32.75),
    (74.90, 32.45),
    (74.65, 31.95),
    (74.57, 31.60),
    (74.62, 31.10),
    (74.00, 30.50),
    (73.40, 29.95),
    (72.95, 29.05),
    (71.90, 27.95),
    (70.70, 27.75),
    (69.60, 27.20),
    (70.20, 26.50),
    (70.10, 25.70),
    (69.60, 24.40),
    (68.80, 24.30),
    (68.20, 23.70),
    (67.30, 24.45),
    (66.70, 24.85),
    (66.60, 25.40),
    (65.50, 25.35),
    (64.50, 25.20),
    (63.50, 25.20),
    (62.30, 25.10),
];

pub fn border_ring() -> Vec<GeoPoint> {
    BORDER_LON_LAT
        .iter()
        .map(|&(lon, lat)| GeoPoint::from_static(lat, lon))
        .collect()
}

pub const PROVINCE_CITIES: &[(&str, &[&str])] = &[
    (
        "Sindh",
        &["Karachi", "Hyderabad", "Sukkur", "Larkana", "Nawabshah", "Mirpur Khas", "Shikarpur", "Jacobabad"],
    ),
    (
        "Punjab",
        &[
            "Lahore", "Faisalabad", "Rawalpindi", "Multan", "Gujranwala", "Sialkot", "Bahawalpur",
            "Sargodha", "Sheikhupura", "Jhang",
        ],
    ),
    (
        "KPK",
        &["Peshawar", "Mardan", "Abbottabad", "Swat", "Kohat", "Bannu", "Dera Ismail Khan", "Mingora"],
    ),
    ("Balochistan", &["Quetta", "Gwadar", "Turbat", "Khuzdar", "Hub", "Chaman", "Zhob"]),
    ("ICT", &["Islamabad"]),
    ("AJK", &["Muzaffarabad", "Mirpur", "Rawalakot", "Kotli"]),
    ("GB", &["Gilgit", "Skardu", "Hunza", "Ghanche"]),
];

/// (name, province, latitude, longitude)
pub const MAJOR_CITIES: &[(&str, &str, f64, f64)] = &[
    ("Karachi", "Sindh", 24.8607, 67.0011),
    ("Lahore", "Punjab", 31.5497, 74.3436),
    ("Faisalabad", "Punjab", 31.4504, 73.1350),
    ("Rawalpindi", "Punjab", 33.5651, 73.0169),
    ("Multan", "Punjab", 30.1575, 71.5249),
    ("Hyderabad", "Sindh", 25.3960, 68.3578),
    ("Gujranwala", "Punjab", 32.1877, 74.1945),
    ("Peshawar", "KPK", 34.0151, 71.5249),
    ("Quetta", "Balochistan", 30.1798, 66.9750),
    ("Islamabad", "ICT", 33.6844, 73.0479),
];
