//! Transient highlight raised when a fresh alert arrives.
//!
//! The signal owns at most one deactivation deadline. The session runtime
//! sleeps until [`AlertSignal::deadline`] and then calls
//! [`AlertSignal::on_deadline`], so re-arming simply moves the one deadline.

use crate::model::Alert;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_ACTIVE_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertSignalState {
    pub active: bool,
    pub expiry: Option<Instant>,
}

#[derive(Debug, Clone)]
pub struct AlertSignal {
    freshness_window: Duration,
    active_duration: Duration,
    state: AlertSignalState,
}

impl AlertSignal {
    pub fn new(freshness_window: Duration, active_duration: Duration) -> Self {
        Self {
            freshness_window,
            active_duration,
            state: AlertSignalState::default(),
        }
    }

    pub fn state(&self) -> AlertSignalState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// The pending deactivation, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.state.expiry
    }

    /// Inspects the newest alert (the list is newest first) and arms the
    /// signal when it is younger than the freshness window.
    ///
    /// `received_at` is the wall-clock arrival time used for the age,
    /// `now` the monotonic time the deactivation is scheduled from.
    /// Returns whether the signal was armed.
    pub fn on_alerts(&mut self, alerts: &[Alert], received_at: DateTime<Utc>, now: Instant) -> bool {
        let Some(newest) = alerts.first() else {
            return false;
        };

        // A timestamp ahead of our clock gives a negative age, which is fresh.
        let age = received_at.signed_duration_since(newest.timestamp);
        let fresh = match age.to_std() {
            Ok(age) => age < self.freshness_window,
            Err(_) => true,
        };

        if fresh {
            debug!(alert_id = %newest.id, age_ms = age.num_milliseconds(), "Fresh alert received");
            self.arm(now);
        }
        fresh
    }

    /// Activates the signal and (re)schedules the single deactivation
    /// `active_duration` after `now`. A duration too large for the clock
    /// falls back to the default one.
    pub fn arm(&mut self, now: Instant) {
        let expiry = now
            .checked_add(self.active_duration)
            .unwrap_or_else(|| now + DEFAULT_ACTIVE_DURATION);
        self.state = AlertSignalState {
            active: true,
            expiry: Some(expiry),
        };
    }

    /// Clears the signal once its deadline has passed. Returns `true` only on
    /// the call that actually deactivates it.
    pub fn on_deadline(&mut self, now: Instant) -> bool {
        match self.state.expiry {
            Some(expiry) if now >= expiry => {
                self.state = AlertSignalState::default();
                true
            }
            _ => false,
        }
    }
}

impl Default for AlertSignal {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_WINDOW, DEFAULT_ACTIVE_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertId, Severity};

    fn alert_aged(received_at: DateTime<Utc>, age_ms: i64) -> Alert {
        Alert {
            id: AlertId::Numeric(1),
            severity: Severity::High,
            kind: "storm".to_string(),
            message: "Surge warning".to_string(),
            timestamp: received_at - chrono::Duration::milliseconds(age_ms),
            location: None,
        }
    }

    #[test]
    fn test_oversized_active_duration_does_not_overflow() {
        let mut signal = AlertSignal::new(DEFAULT_FRESHNESS_WINDOW, Duration::MAX);
        let now = Instant::now();
        signal.arm(now);

        assert!(signal.is_active());
        assert_eq!(signal.deadline(), Some(now + DEFAULT_ACTIVE_DURATION));
        assert!(signal.on_deadline(now + DEFAULT_ACTIVE_DURATION));
    }

    #[test]
    fn test_empty_list_does_not_arm() {
        let mut signal = AlertSignal::default();
        assert!(!signal.on_alerts(&[], Utc::now(), Instant::now()));
        assert!(!signal.is_active());
        assert_eq!(signal.deadline(), None);
    }

    #[test]
    fn test_fresh_alert_arms_for_five_seconds() {
        let mut signal = AlertSignal::default();
        let received = Utc::now();
        let t0 = Instant::now();

        assert!(signal.on_alerts(&[alert_aged(received, 9_900)], received, t0));
        assert!(signal.is_active());
        assert_eq!(signal.deadline(), Some(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_stale_alert_does_not_arm() {
        let mut signal = AlertSignal::default();
        let received = Utc::now();

        assert!(!signal.on_alerts(&[alert_aged(received, 10_000)], received, Instant::now()));
        assert!(!signal.is_active());
    }

    #[test]
    fn test_only_newest_alert_is_considered() {
        let mut signal = AlertSignal::default();
        let received = Utc::now();
        let alerts = vec![alert_aged(received, 60_000), alert_aged(received, 1_000)];

        assert!(!signal.on_alerts(&alerts, received, Instant::now()));
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let mut signal = AlertSignal::default();
        let received = Utc::now();

        assert!(signal.on_alerts(&[alert_aged(received, -3_000)], received, Instant::now()));
    }

    #[test]
    fn test_deactivates_exactly_once() {
        let mut signal = AlertSignal::default();
        let t0 = Instant::now();
        signal.arm(t0);

        assert!(!signal.on_deadline(t0 + Duration::from_millis(4_999)));
        assert!(signal.is_active());

        assert!(signal.on_deadline(t0 + Duration::from_secs(5)));
        assert!(!signal.is_active());
        assert_eq!(signal.deadline(), None);

        assert!(!signal.on_deadline(t0 + Duration::from_secs(6)));
        assert!(!signal.is_active());
    }

    #[test]
    fn test_rearm_restarts_window() {
        let mut signal = AlertSignal::default();
        let t0 = Instant::now();
        signal.arm(t0);

        let t4 = t0 + Duration::from_secs(4);
        signal.arm(t4);
        assert_eq!(signal.deadline(), Some(t4 + Duration::from_secs(5)));

        // The first deadline no longer deactivates.
        assert!(!signal.on_deadline(t0 + Duration::from_secs(5)));
        assert!(signal.is_active());

        assert!(signal.on_deadline(t4 + Duration::from_secs(5)));
        assert!(!signal.is_active());
    }
}
