//! Domain types carried by the telemetry feed.
//!
//! Field names follow the feed's JSON wire format, so these types are
//! deserialized straight out of `state` frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lon)
    }
}

/// One telemetry sample from a coastal sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub tide_m: f64,
    pub wind_kmh: f64,
    pub pollution_index: f64,
    pub location: GeoPoint,
    #[serde(default)]
    pub is_model_anomaly: bool,
    #[serde(default)]
    pub threshold_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_score: Option<f64>,
}

/// Alert severity. Anything the feed sends that is not `medium` or `high`
/// is rendered as `low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    #[default]
    #[serde(other)]
    Low,
}

impl Severity {
    /// Badge text shown next to an alert.
    pub fn label(self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }

    /// Wire value, as accepted by the manual alert endpoint.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        })
    }
}

/// Any severity that is not a known string (null, a number, an unknown
/// word) reads as `Low` instead of failing the whole frame.
fn lenient_severity<'de, D>(deserializer: D) -> Result<Severity, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s.parse().unwrap_or_default(),
        _ => Severity::Low,
    })
}

/// Alert identifiers are integers on the current feed, but older
/// deployments sent strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertId::Numeric(n) => write!(f, "{n}"),
            AlertId::Text(s) => f.write_str(s),
        }
    }
}

/// A notable event raised by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

/// Payload of a `state` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    #[serde(default)]
    pub reading: Option<Reading>,
    #[serde(default)]
    pub alerts: Option<Vec<Alert>>,
}

impl StatePayload {
    /// Alerts newest first; empty when the frame carried none.
    pub fn alerts(&self) -> &[Alert] {
        self.alerts.as_deref().unwrap_or_default()
    }

    pub fn into_parts(self) -> (Option<Reading>, Vec<Alert>) {
        (self.reading, self.alerts.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_unknown_is_low() {
        let s: Severity = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(s, Severity::Low);
        let s: Severity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(s, Severity::High);
        let s: Severity = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(s, Severity::Medium);
    }

    #[test]
    fn test_alert_with_odd_severity_is_low() {
        for severity in ["null", "3", "{\"level\":\"high\"}", "\"CRITICAL\""] {
            let json = format!(
                r#"{{"id":7,"type":"storm","message":"m","timestamp":"2025-09-14T10:00:00Z","severity":{severity}}}"#
            );
            let alert: Alert = serde_json::from_str(&json).unwrap();
            assert_eq!(alert.severity, Severity::Low, "severity {severity}");
        }

        let alert: Alert = serde_json::from_str(
            r#"{"id":7,"type":"storm","message":"m","timestamp":"2025-09-14T10:00:00Z","severity":"high"}"#,
        )
        .unwrap();
        assert_eq!(alert.severity, Severity::High);
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!("whatever".parse::<Severity>().unwrap(), Severity::Low);
        assert_eq!(Severity::Medium.label(), "MEDIUM");
    }

    #[test]
    fn test_reading_defaults_optional_fields() {
        let json = r#"{
            "timestamp": "2025-09-14T10:00:00.123456Z",
            "tide_m": 2.1,
            "wind_kmh": 20,
            "pollution_index": 30,
            "location": {"lat": 12.9716, "lon": 80.22}
        }"#;
        let r: Reading = serde_json::from_str(json).unwrap();
        assert!(!r.is_model_anomaly);
        assert!(r.threshold_reasons.is_empty());
        assert_eq!(r.model_score, None);
        assert_eq!(r.wind_kmh, 20.0);
    }

    #[test]
    fn test_alert_decodes_wire_format() {
        let json = r#"{
            "id": 1726300000,
            "type": "coastal_threat",
            "severity": "medium",
            "message": "Alert: High tide (>4.5m)",
            "timestamp": "2025-09-14T10:00:00Z",
            "location": {"lat": 12.9716, "lon": 80.22}
        }"#;
        let a: Alert = serde_json::from_str(json).unwrap();
        assert_eq!(a.id, AlertId::Numeric(1726300000));
        assert_eq!(a.kind, "coastal_threat");
        assert_eq!(a.severity, Severity::Medium);
        assert!(a.location.is_some());
    }

    #[test]
    fn test_alert_missing_severity_is_low() {
        let json = r#"{"id": "m-1", "type": "manual", "message": "x",
                       "timestamp": "2025-09-14T10:00:00Z"}"#;
        let a: Alert = serde_json::from_str(json).unwrap();
        assert_eq!(a.severity, Severity::Low);
        assert_eq!(a.id.to_string(), "m-1");
    }

    #[test]
    fn test_state_payload_null_alerts() {
        let p: StatePayload = serde_json::from_str(r#"{"reading": null, "alerts": null}"#).unwrap();
        assert!(p.reading.is_none());
        assert!(p.alerts().is_empty());
    }
}
