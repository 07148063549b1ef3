//! Render sinks that consume the synchronized dashboard state.
//!
//! A sink owns no state of its own: every call receives the full
//! [`RenderFrame`] and must produce the same output for the same frame.
//! Empty windows and empty alert lists are normal inputs.

use anyhow::Result;
use csv::WriterBuilder;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::model::{Alert, GeoPoint, Reading};
use crate::window::WindowSnapshot;

/// Everything a renderer needs for one redraw.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RenderFrame<'a> {
    pub location_name: &'a str,
    pub marker: GeoPoint,
    pub reading: Option<&'a Reading>,
    pub alerts: &'a [Alert],
    pub window: WindowSnapshot<'a>,
    pub alert_active: bool,
}

pub trait RenderSink: Send {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()>;
}

/// Logs the dashboard state, the terminal stand-in for the reading panel,
/// the alert feed and the chart.
#[derive(Debug, Default)]
pub struct TracingSink;

impl RenderSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        match frame.reading {
            Some(r) => {
                let reasons = if r.threshold_reasons.is_empty() {
                    "None".to_string()
                } else {
                    r.threshold_reasons.join(", ")
                };
                info!(
                    location = frame.location_name,
                    timestamp = %r.timestamp,
                    tide_m = r.tide_m,
                    wind_kmh = r.wind_kmh,
                    pollution_index = r.pollution_index,
                    model_anomaly = r.is_model_anomaly,
                    threshold_reasons = %reasons,
                    "Reading"
                );
            }
            None => info!(location = frame.location_name, "No data yet"),
        }

        if frame.alerts.is_empty() {
            debug!("No alerts");
        }
        for alert in frame.alerts {
            debug!(
                severity = alert.severity.label(),
                kind = %alert.kind,
                timestamp = %alert.timestamp,
                "{}",
                alert.message
            );
        }

        info!(
            location = frame.location_name,
            marker = %frame.marker,
            points = frame.window.len(),
            alerts = frame.alerts.len(),
            alert_active = frame.alert_active,
            "Dashboard updated"
        );
        Ok(())
    }
}

/// Rewrites a JSON file with the whole frame on every render.
#[derive(Debug)]
pub struct JsonSnapshotSink {
    path: PathBuf,
}

impl JsonSnapshotSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RenderSink for JsonSnapshotSink {
    fn name(&self) -> &str {
        "json-snapshot"
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        let json = serde_json::to_string_pretty(frame)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct WindowRow {
    timestamp: chrono::DateTime<chrono::Utc>,
    tide_m: f64,
    wind_kmh: f64,
    pollution_index: f64,
}

/// Rewrites a CSV file holding the chart window, one row per sample.
#[derive(Debug)]
pub struct CsvWindowSink {
    path: PathBuf,
}

impl CsvWindowSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RenderSink for CsvWindowSink {
    fn name(&self) -> &str {
        "csv-window"
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        write_window_csv(&self.path, &frame.window)
    }
}

/// Writes the window to `path`, replacing any previous content. The header
/// is written even when the window is empty.
pub fn write_window_csv(path: &Path, window: &WindowSnapshot<'_>) -> Result<()> {
    debug!(path = %path.display(), rows = window.len(), "Writing window CSV");

    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["timestamp", "tide_m", "wind_kmh", "pollution_index"])?;
    for (timestamp, tide_m, wind_kmh, pollution_index) in window.rows() {
        writer.serialize(WindowRow {
            timestamp,
            tide_m,
            wind_kmh,
            pollution_index,
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::RollingWindow;
    use chrono::{TimeZone, Utc};
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn frame<'a>(window: &'a RollingWindow, alerts: &'a [Alert]) -> RenderFrame<'a> {
        RenderFrame {
            location_name: "Chennai Coast",
            marker: GeoPoint::new(12.9716, 80.22),
            reading: None,
            alerts,
            window: window.snapshot(),
            alert_active: false,
        }
    }

    fn filled_window() -> RollingWindow {
        let mut window = RollingWindow::new(10);
        window.append(Utc.timestamp_opt(1_726_300_000, 0).unwrap(), 2.1, 20.0, 30.0);
        window.append(Utc.timestamp_opt(1_726_300_002, 0).unwrap(), 2.3, 22.5, 31.0);
        window
    }

    #[test]
    fn test_tracing_sink_accepts_empty_state() {
        let window = RollingWindow::new(10);
        let mut sink = TracingSink;
        sink.render(&frame(&window, &[])).unwrap();
    }

    #[test]
    fn test_csv_sink_writes_header_and_rows() {
        let path = temp_path("coastal_feed_sync_test_window.csv");
        let _ = fs::remove_file(&path);

        let window = filled_window();
        let mut sink = CsvWindowSink::new(&path);
        sink.render(&frame(&window, &[])).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,tide_m,wind_kmh,pollution_index");
        assert!(lines[2].ends_with(",2.3,22.5,31.0"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_csv_sink_is_idempotent() {
        let path = temp_path("coastal_feed_sync_test_idempotent.csv");
        let _ = fs::remove_file(&path);

        let window = filled_window();
        let mut sink = CsvWindowSink::new(&path);
        sink.render(&frame(&window, &[])).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        sink.render(&frame(&window, &[])).unwrap();
        let second = fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_csv_sink_empty_window_has_header_only() {
        let path = temp_path("coastal_feed_sync_test_empty.csv");
        let _ = fs::remove_file(&path);

        let window = RollingWindow::new(10);
        CsvWindowSink::new(&path).render(&frame(&window, &[])).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_json_sink_writes_frame() {
        let path = temp_path("coastal_feed_sync_test_frame.json");
        let _ = fs::remove_file(&path);

        let window = filled_window();
        JsonSnapshotSink::new(&path).render(&frame(&window, &[])).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["location_name"], "Chennai Coast");
        assert_eq!(value["window"]["tide"].as_array().unwrap().len(), 2);
        assert!(value["reading"].is_null());

        fs::remove_file(&path).unwrap();
    }
}
