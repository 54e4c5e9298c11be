//! Wall-clock timing for export progress.
//!
//! The real-time capture path is wall-clock bound: its progress is the
//! elapsed wall time over the estimated runtime of the modulated source.
//! This module provides:
//! - An export clock anchored at the moment playback starts
//! - The capped progress estimate reported while a capture runs
//! - A rate controller for throttling periodic ticks

use std::time::{Duration, Instant};

/// Progress reported by an estimate never reaches completion on its own;
/// only a finished job reports `1.0`.
pub const MAX_ESTIMATED_PROGRESS: f64 = 0.99;

/// A monotonic clock anchored to a fixed epoch (the moment an export phase
/// started).
#[derive(Debug, Clone)]
pub struct ExportClock {
    /// The instant the clock started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl ExportClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the clock started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Progress estimate for a wall-clock bound job.
    pub fn estimated_progress(&self, estimated_secs: f64) -> f64 {
        estimated_progress(self.elapsed_secs(), estimated_secs)
    }
}

/// `min(0.99, elapsed / estimated)`, with `0.0` for a non-positive estimate.
pub fn estimated_progress(elapsed_secs: f64, estimated_secs: f64) -> f64 {
    if estimated_secs.is_nan() || estimated_secs <= 0.0 || !elapsed_secs.is_finite() {
        return 0.0;
    }
    (elapsed_secs / estimated_secs).clamp(0.0, MAX_ESTIMATED_PROGRESS)
}

/// Convert seconds to a `Duration`, saturating negative and non-finite input to zero.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

/// Convert seconds to nanoseconds, saturating at zero.
pub fn secs_to_ns(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1_000_000_000.0).round() as u64
    } else {
        0
    }
}

/// Convert nanoseconds to seconds.
pub fn ns_to_secs(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

/// Rate controller for periodic ticks (position sampling, progress events).
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = ExportClock::start();
        assert!(clock.elapsed_secs() < 1.0);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_estimated_progress_is_capped() {
        assert!((estimated_progress(2.5, 10.0) - 0.25).abs() < 1e-12);
        assert!((estimated_progress(12.0, 10.0) - MAX_ESTIMATED_PROGRESS).abs() < 1e-12);
        assert_eq!(estimated_progress(1.0, 0.0), 0.0);
        assert_eq!(estimated_progress(1.0, f64::NAN), 0.0);
    }

    #[test]
    fn test_secs_conversions_saturate() {
        assert_eq!(secs_to_ns(2.0), 2_000_000_000);
        assert_eq!(secs_to_ns(-1.0), 0);
        assert!((ns_to_secs(1_500_000_000) - 1.5).abs() < 1e-9);
        assert_eq!(secs_to_duration(f64::INFINITY), Duration::ZERO);
        assert_eq!(secs_to_duration(0.5), Duration::from_millis(500));
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(30);
        assert!(ctrl.should_tick(0)); // first tick always fires
        assert!(!ctrl.should_tick(10_000_000)); // 10ms later, too soon
        assert!(ctrl.should_tick(34_000_000)); // ~34ms later, should fire (30Hz ~ 33.3ms)
    }
}
