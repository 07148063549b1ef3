//! Decides whether a reading belongs to the region on screen.

use crate::model::GeoPoint;

/// Per-axis tolerance in degrees. Not distance corrected, so the box is
/// narrower in kilometres at high latitudes.
pub const LOCATION_TOLERANCE_DEG: f64 = 0.01;

/// True when both axes differ by strictly less than [`LOCATION_TOLERANCE_DEG`].
pub fn matches(reading: GeoPoint, selected: GeoPoint) -> bool {
    (reading.lat - selected.lat).abs() < LOCATION_TOLERANCE_DEG
        && (reading.lon - selected.lon).abs() < LOCATION_TOLERANCE_DEG
}
