use chrono::{DateTime, Utc};
use serde::Serialize;

/// Running counters for one dashboard session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub started_at: DateTime<Utc>,

    // feed
    pub frames_received: u64,
    pub state_frames: u64,
    pub decode_failures: u64,
    pub connection_attempts: u64,
    pub reconnects_scheduled: u64,

    // readings
    pub readings_accepted: u64,
    pub readings_discarded: u64,

    // alerts and rendering
    pub alert_signals_armed: u64,
    pub sink_failures: u64,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            frames_received: 0,
            state_frames: 0,
            decode_failures: 0,
            connection_attempts: 0,
            reconnects_scheduled: 0,
            readings_accepted: 0,
            readings_discarded: 0,
            alert_signals_armed: 0,
            sink_failures: 0,
        }
    }
}

impl SessionStats {
    pub fn pct(part: u64, total: u64) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of readings that matched the selected location.
    pub fn acceptance_pct(&self) -> f64 {
        Self::pct(
            self.readings_accepted,
            self.readings_accepted + self.readings_discarded,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(SessionStats::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(SessionStats::pct(50, 100), 50.0);
        assert_eq!(SessionStats::pct(1, 4), 25.0);
    }

    #[test]
    fn test_acceptance_pct() {
        let stats = SessionStats {
            readings_accepted: 3,
            readings_discarded: 1,
            ..Default::default()
        };
        assert_eq!(stats.acceptance_pct(), 75.0);
    }

    #[test]
    fn test_serializes_counters() {
        let json = serde_json::to_value(SessionStats::default()).unwrap();
        assert_eq!(json["frames_received"], 0);
        assert!(json["started_at"].is_string());
    }
}
