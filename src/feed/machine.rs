//! Connection lifecycle for the telemetry feed.
//!
//! [`FeedConnection`] never touches a socket. Each event entry point performs
//! the state transition and returns the side effects the runtime must carry
//! out, which keeps reconnect behaviour testable without a transport.

use reqwest::Url;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::model::StatePayload;
use crate::parser::{FeedMessage, decode_frame};

/// Fixed delay before every reconnect attempt. There is no backoff growth
/// and no retry cap.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Sent once right after the socket opens.
pub const LIVENESS_PROBE: &str = "ping";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a new socket to the given URL.
    Open(Url),
    /// Send a text frame on the open socket.
    SendProbe(&'static str),
    /// Hand a decoded state payload to the session.
    Deliver(StatePayload),
    /// Tear the socket down; the runtime reports back via `on_close`.
    CloseTransport,
    /// Call `on_reconnect_due` after the delay.
    ScheduleReconnect(Duration),
}

#[derive(Debug, Clone)]
pub struct FeedConnection {
    url: Url,
    reconnect_delay: Duration,
    state: ConnectionState,
    reconnect_pending: bool,
    attempts: u64,
    opened: u64,
    decode_failures: u64,
}

impl FeedConnection {
    pub fn new(url: Url, reconnect_delay: Duration) -> Self {
        Self {
            url,
            reconnect_delay,
            state: ConnectionState::Idle,
            reconnect_pending: false,
            attempts: 0,
            opened: 0,
            decode_failures: 0,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Number of connection attempts started.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Number of connections that completed the handshake.
    pub fn connections_opened(&self) -> u64 {
        self.opened
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    /// Starts a connection attempt. A no-op while connecting or connected.
    pub fn connect(&mut self) -> Vec<Effect> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                trace!(state = ?self.state, "connect() ignored");
                Vec::new()
            }
            ConnectionState::Idle | ConnectionState::Disconnected => {
                self.state = ConnectionState::Connecting;
                self.reconnect_pending = false;
                self.attempts += 1;
                info!(url = %self.url, attempt = self.attempts, "Connecting to feed");
                vec![Effect::Open(self.url.clone())]
            }
        }
    }

    pub fn on_open(&mut self) -> Vec<Effect> {
        if self.state != ConnectionState::Connecting {
            warn!(state = ?self.state, "Unexpected open event");
            return Vec::new();
        }
        self.state = ConnectionState::Connected;
        self.opened += 1;
        info!(url = %self.url, "Feed connected");
        vec![Effect::SendProbe(LIVENESS_PROBE)]
    }

    /// Decodes one inbound frame. Malformed frames are counted and dropped;
    /// they never change the connection state.
    pub fn on_frame(&mut self, text: &str) -> Vec<Effect> {
        if self.state != ConnectionState::Connected {
            debug!(state = ?self.state, "Frame received while not connected, dropping");
            return Vec::new();
        }

        match decode_frame(text) {
            Ok(FeedMessage::State(payload)) => vec![Effect::Deliver(payload)],
            Ok(FeedMessage::Ignored { kind }) => {
                trace!(kind = %kind, "Ignoring feed message");
                Vec::new()
            }
            Err(e) => {
                self.decode_failures += 1;
                warn!(error = %e, failures = self.decode_failures, "Discarding malformed frame");
                Vec::new()
            }
        }
    }

    /// Transport reported an error. The socket is closed proactively so the
    /// close path (and its single reconnect) always runs.
    pub fn on_error(&mut self, reason: &str) -> Vec<Effect> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                warn!(reason, state = ?self.state, "Feed error, closing connection");
                vec![Effect::CloseTransport]
            }
            ConnectionState::Idle | ConnectionState::Disconnected => {
                debug!(reason, "Feed error after disconnect, ignoring");
                Vec::new()
            }
        }
    }

    /// Socket closed, cleanly or not. Schedules exactly one reconnect per
    /// failure however many close/error events follow.
    pub fn on_close(&mut self) -> Vec<Effect> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected => {
                self.state = ConnectionState::Disconnected;
                self.reconnect_pending = true;
                warn!(
                    delay_ms = self.reconnect_delay.as_millis() as u64,
                    "Feed closed, reconnecting"
                );
                vec![Effect::ScheduleReconnect(self.reconnect_delay)]
            }
            ConnectionState::Idle | ConnectionState::Disconnected => Vec::new(),
        }
    }

    pub fn on_reconnect_due(&mut self) -> Vec<Effect> {
        if self.state != ConnectionState::Disconnected || !self.reconnect_pending {
            return Vec::new();
        }
        self.connect()
    }
}
