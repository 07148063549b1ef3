//! Fixed-capacity rolling history that feeds the multi-axis chart.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Number of samples kept per metric (two minutes at the feed's 2 s cadence).
pub const DEFAULT_WINDOW_CAPACITY: usize = 60;

/// Parallel per-metric series, oldest sample first.
///
/// All four sequences always have the same length, never more than
/// `capacity`.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    timestamps: VecDeque<DateTime<Utc>>,
    tide: VecDeque<f64>,
    wind: VecDeque<f64>,
    pollution: VecDeque<f64>,
}

/// Read-only view handed to render sinks.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WindowSnapshot<'a> {
    pub timestamps: &'a VecDeque<DateTime<Utc>>,
    pub tide: &'a VecDeque<f64>,
    pub wind: &'a VecDeque<f64>,
    pub pollution: &'a VecDeque<f64>,
}

impl WindowSnapshot<'_> {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Rows in arrival order as `(timestamp, tide, wind, pollution)`.
    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Utc>, f64, f64, f64)> + '_ {
        self.timestamps
            .iter()
            .zip(self.tide)
            .zip(self.wind)
            .zip(self.pollution)
            .map(|(((ts, tide), wind), pollution)| (*ts, *tide, *wind, *pollution))
    }
}

impl RollingWindow {
    /// `capacity` must be non-zero; config validation enforces that upstream.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            timestamps: VecDeque::with_capacity(capacity + 1),
            tide: VecDeque::with_capacity(capacity + 1),
            wind: VecDeque::with_capacity(capacity + 1),
            pollution: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Appends one sample to every series, evicting the oldest once full.
    ///
    /// Samples are kept in arrival order; timestamps are not checked for
    /// monotonicity.
    pub fn append(&mut self, timestamp: DateTime<Utc>, tide: f64, wind: f64, pollution: f64) {
        self.timestamps.push_back(timestamp);
        self.tide.push_back(tide);
        self.wind.push_back(wind);
        self.pollution.push_back(pollution);

        while self.timestamps.len() > self.capacity {
            self.timestamps.pop_front();
            self.tide.pop_front();
            self.wind.pop_front();
            self.pollution.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.timestamps.clear();
        self.tide.clear();
        self.wind.clear();
        self.pollution.clear();
    }

    pub fn snapshot(&self) -> WindowSnapshot<'_> {
        WindowSnapshot {
            timestamps: &self.timestamps,
            tide: &self.tide,
            wind: &self.wind,
            pollution: &self.pollution,
        }
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_726_300_000 + secs, 0).unwrap()
    }

    fn push(window: &mut RollingWindow, i: i64) {
        window.append(ts(i), i as f64, 10.0 * i as f64, 100.0 * i as f64);
    }

    fn assert_parallel(window: &RollingWindow) {
        let s = window.snapshot();
        assert_eq!(s.timestamps.len(), s.tide.len());
        assert_eq!(s.tide.len(), s.wind.len());
        assert_eq!(s.wind.len(), s.pollution.len());
        assert!(s.len() <= window.capacity());
    }

    #[test]
    fn test_new_window_is_empty() {
        let window = RollingWindow::default();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), DEFAULT_WINDOW_CAPACITY);
        assert!(window.snapshot().is_empty());
    }

    #[test]
    fn test_lengths_stay_equal_and_bounded() {
        let mut window = RollingWindow::new(5);
        for i in 0..23 {
            push(&mut window, i);
            assert_parallel(&window);
        }
        assert_eq!(window.len(), 5);
    }

    #[test]
    fn test_overflow_keeps_most_recent_in_order() {
        let mut window = RollingWindow::new(3);
        for i in 0..7 {
            push(&mut window, i);
        }

        let rows: Vec<_> = window.snapshot().rows().collect();
        assert_eq!(
            rows,
            vec![
                (ts(4), 4.0, 40.0, 400.0),
                (ts(5), 5.0, 50.0, 500.0),
                (ts(6), 6.0, 60.0, 600.0),
            ]
        );
    }

    #[test]
    fn test_reset_leaves_no_residue() {
        let mut reused = RollingWindow::new(4);
        for i in 0..10 {
            push(&mut reused, i);
        }
        reused.reset();
        assert!(reused.is_empty());

        let mut fresh = RollingWindow::new(4);
        for i in 100..106 {
            push(&mut reused, i);
            push(&mut fresh, i);
        }

        let a: Vec<_> = reused.snapshot().rows().collect();
        let b: Vec<_> = fresh.snapshot().rows().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_out_of_order_timestamps_kept_in_arrival_order() {
        let mut window = RollingWindow::new(10);
        push(&mut window, 5);
        push(&mut window, 2);

        let stamps: Vec<_> = window.snapshot().timestamps.iter().copied().collect();
        assert_eq!(stamps, vec![ts(5), ts(2)]);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut window = RollingWindow::new(0);
        push(&mut window, 1);
        push(&mut window, 2);
        assert_eq!(window.len(), 1);
    }
}
