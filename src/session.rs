//! One dashboard instance: the feed connection, the chart window, the alert
//! signal and the selected region, owned together.

use chrono::{DateTime, Utc};
use reqwest::Url;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::alert_signal::AlertSignal;
use crate::config::SyncConfig;
use crate::feed::{Effect, FeedConnection};
use crate::location;
use crate::model::{Alert, GeoPoint, Reading, StatePayload};
use crate::regions::{self, Region};
use crate::sink::{RenderFrame, RenderSink};
use crate::stats::SessionStats;
use crate::window::{RollingWindow, WindowSnapshot};

/// User input delivered to a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    SelectRegion(Region),
    /// A map click; snapped to the nearest known region.
    SelectPoint(GeoPoint),
}

impl SessionCommand {
    /// Parses a line of user input: either `lat,lon` (treated as a map
    /// click) or a region name such as `Goa Coast` / `goa_coast`.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Some((lat, lon)) = input.split_once(',') {
            if let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) {
                if !(lat.is_finite() && lon.is_finite()) {
                    return None;
                }
                return Some(SessionCommand::SelectPoint(GeoPoint::new(lat, lon)));
            }
        }
        regions::find(input).map(SessionCommand::SelectRegion)
    }
}

/// What happened to the reading carried by a state frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingOutcome {
    Accepted,
    Discarded,
    Absent,
}

pub struct DashboardSession {
    pub(crate) feed: FeedConnection,
    window: RollingWindow,
    alert_signal: AlertSignal,
    selected: Region,
    reading: Option<Reading>,
    alerts: Vec<Alert>,
    sinks: Vec<Box<dyn RenderSink>>,
    stats: SessionStats,
}

impl DashboardSession {
    pub fn new(config: &SyncConfig, feed_url: Url) -> Self {
        Self {
            feed: FeedConnection::new(feed_url, config.reconnect_delay),
            window: RollingWindow::new(config.window_capacity),
            alert_signal: AlertSignal::new(config.alert_freshness, config.alert_active_for),
            selected: config.region,
            reading: None,
            alerts: Vec::new(),
            sinks: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn with_sink(mut self, sink: impl RenderSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn feed(&self) -> &FeedConnection {
        &self.feed
    }

    pub fn selected(&self) -> Region {
        self.selected
    }

    pub fn reading(&self) -> Option<&Reading> {
        self.reading.as_ref()
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn window(&self) -> WindowSnapshot<'_> {
        self.window.snapshot()
    }

    pub fn alert_signal(&self) -> &AlertSignal {
        &self.alert_signal
    }

    /// Counters, with the connection machine's figures folded in.
    pub fn stats(&self) -> SessionStats {
        let mut stats = self.stats.clone();
        stats.decode_failures = self.feed.decode_failures();
        stats.connection_attempts = self.feed.attempts();
        stats
    }

    /// Applies a state frame: alerts go to the signal, the reading goes to
    /// the window if it belongs to the selected region, then sinks redraw.
    pub fn apply_state(
        &mut self,
        payload: StatePayload,
        received_at: DateTime<Utc>,
        now: Instant,
    ) -> ReadingOutcome {
        self.stats.state_frames += 1;
        let (reading, alerts) = payload.into_parts();

        if self.alert_signal.on_alerts(&alerts, received_at, now) {
            self.stats.alert_signals_armed += 1;
        }
        self.alerts = alerts;

        let outcome = match reading {
            Some(r) if location::matches(r.location, self.selected.position) => {
                self.window
                    .append(r.timestamp, r.tide_m, r.wind_kmh, r.pollution_index);
                self.reading = Some(r);
                self.stats.readings_accepted += 1;
                ReadingOutcome::Accepted
            }
            Some(r) => {
                debug!(
                    reading_location = %r.location,
                    selected = self.selected.name,
                    "Reading is for another location, discarding"
                );
                self.stats.readings_discarded += 1;
                ReadingOutcome::Discarded
            }
            None => ReadingOutcome::Absent,
        };

        self.render();
        outcome
    }

    /// Switches the displayed region and starts a fresh chart history.
    pub fn select_region(&mut self, region: Region) {
        info!(region = region.name, position = %region.position, "Location selected");
        self.selected = region;
        self.reading = None;
        self.window.reset();
        self.render();
    }

    /// Selects the known region closest to an arbitrary point.
    pub fn select_point(&mut self, point: GeoPoint) -> Region {
        let region = regions::nearest(point);
        debug!(clicked = %point, snapped = region.name, "Snapped selection to region");
        self.select_region(region);
        region
    }

    pub fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SelectRegion(region) => self.select_region(region),
            SessionCommand::SelectPoint(point) => {
                self.select_point(point);
            }
        }
    }

    /// Clears history when the very first connection comes up.
    pub(crate) fn on_connection_opened(&mut self) {
        if self.feed.connections_opened() == 1 {
            self.window.reset();
        }
    }

    pub(crate) fn note_reconnect_scheduled(&mut self) {
        self.stats.reconnects_scheduled += 1;
    }

    pub(crate) fn note_frame(&mut self) {
        self.stats.frames_received += 1;
    }

    /// Deactivates the alert signal if its deadline has passed, redrawing on
    /// the transition.
    pub fn on_alert_deadline(&mut self, now: Instant) -> bool {
        let deactivated = self.alert_signal.on_deadline(now);
        if deactivated {
            debug!("Alert signal cleared");
            self.render();
        }
        deactivated
    }

    /// Pushes the current state to every sink. A failing or panicking sink
    /// is logged and skipped.
    pub fn render(&mut self) {
        let frame = RenderFrame {
            location_name: self.selected.name,
            marker: self.selected.position,
            reading: self.reading.as_ref(),
            alerts: &self.alerts,
            window: self.window.snapshot(),
            alert_active: self.alert_signal.is_active(),
        };

        let mut failures = 0;
        for sink in &mut self.sinks {
            match catch_unwind(AssertUnwindSafe(|| sink.render(&frame))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(sink = sink.name(), error = %e, "Render sink failed");
                }
                Err(_) => {
                    failures += 1;
                    error!(sink = sink.name(), "Render sink panicked");
                }
            }
        }
        self.stats.sink_failures += failures;
    }

    /// Executes a connection effect that needs no transport.
    pub(crate) fn apply_local_effect(&mut self, effect: Effect) -> Option<Effect> {
        match effect {
            Effect::Deliver(payload) => {
                self.apply_state(payload, Utc::now(), Instant::now());
                None
            }
            other => Some(other),
        }
    }
}
