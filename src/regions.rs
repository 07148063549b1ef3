//! Catalog of the coastal regions the dashboard can display.

use crate::model::GeoPoint;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Region {
    pub name: &'static str,
    pub country: &'static str,
    pub position: GeoPoint,
}

impl Region {
    const fn new(name: &'static str, country: &'static str, lat: f64, lon: f64) -> Self {
        Self {
            name,
            country,
            position: GeoPoint::new(lat, lon),
        }
    }
}

pub const COASTAL_REGIONS: [Region; 10] = [
    Region::new("Chennai Coast", "India", 12.9716, 80.22),
    Region::new("Mumbai Coast", "India", 19.0760, 72.8777),
    Region::new("Kolkata Coast", "India", 22.5726, 88.3639),
    Region::new("Kochi Coast", "India", 9.9312, 76.2673),
    Region::new("Vishakhapatnam Coast", "India", 17.6868, 83.2185),
    Region::new("Goa Coast", "India", 15.2993, 74.1240),
    Region::new("Puri Coast", "India", 19.8133, 85.8312),
    Region::new("Mangalore Coast", "India", 12.9141, 74.8560),
    Region::new("Tuticorin Coast", "India", 8.7642, 78.1348),
    Region::new("Paradip Coast", "India", 20.3164, 86.6085),
];

/// Region selected when nothing else is configured.
pub fn default_region() -> Region {
    COASTAL_REGIONS[0]
}

/// Looks a region up by name. Case is ignored and `_` matches a space, so
/// `chennai_coast` finds "Chennai Coast".
pub fn find(name: &str) -> Option<Region> {
    let wanted = slug(name);
    COASTAL_REGIONS.iter().copied().find(|r| slug(r.name) == wanted)
}

/// Snaps an arbitrary point to the closest known region.
///
/// Distance is planar in degree space, which is all a map click needs.
pub fn nearest(point: GeoPoint) -> Region {
    let mut closest = COASTAL_REGIONS[0];
    let mut min_distance = f64::INFINITY;

    for region in COASTAL_REGIONS {
        let d_lat = region.position.lat - point.lat;
        let d_lon = region.position.lon - point.lon;
        let distance = (d_lat * d_lat + d_lon * d_lon).sqrt();
        if distance < min_distance {
            min_distance = distance;
            closest = region;
        }
    }

    closest
}

fn slug(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_slug_and_name() {
        assert_eq!(find("chennai_coast").unwrap().name, "Chennai Coast");
        assert_eq!(find("Mumbai Coast").unwrap().name, "Mumbai Coast");
        assert_eq!(find("  GOA coast ").unwrap().name, "Goa Coast");
        assert!(find("Atlantis Coast").is_none());
    }

    #[test]
    fn test_nearest_snaps_to_closest_region() {
        let r = nearest(GeoPoint::new(19.1, 72.9));
        assert_eq!(r.name, "Mumbai Coast");

        let r = nearest(GeoPoint::new(13.0, 80.3));
        assert_eq!(r.name, "Chennai Coast");
    }

    #[test]
    fn test_nearest_always_returns_a_region() {
        let r = nearest(GeoPoint::new(-89.0, -179.0));
        assert!(COASTAL_REGIONS.contains(&r));
    }

    #[test]
    fn test_default_region_is_chennai() {
        assert_eq!(default_region().name, "Chennai Coast");
    }
}
