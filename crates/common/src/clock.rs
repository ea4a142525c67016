//! Clock and timing utilities for real-time capture.
//!
//! The captured stream is timestamped by frame count at a fixed rate while
//! frames are produced against the wall clock. This module provides:
//! - A monotonic capture clock anchored at recording start
//! - Frame-count to media-time conversion
//! - Drift measurement between media time and wall time

use std::time::{Duration, Instant};

/// A capture clock that provides monotonic timestamps relative to the
/// moment recording started.
#[derive(Debug, Clone)]
pub struct RecordingClock {
    epoch: Instant,
}

impl RecordingClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Nanoseconds elapsed since recording start.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Seconds elapsed since recording start.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Drift of a stream of `frames` frames at `fps` against elapsed wall time.
    pub fn frame_drift(&self, frames: u64, fps: u32) -> DriftMeasurement {
        DriftMeasurement {
            reference_ns: self.elapsed_ns(),
            measured_ns: media_time_ns(frames, fps),
        }
    }
}

/// Interval between frames at `fps` (a zero rate is treated as 1 fps).
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / fps.max(1) as u64)
}

/// Media timestamp of frame number `frames` in a constant-rate stream.
pub fn media_time_ns(frames: u64, fps: u32) -> u64 {
    frames.saturating_mul(1_000_000_000) / fps.max(1) as u64
}

/// Drift measurement between two timelines.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Timestamp on the reference timeline (ns).
    pub reference_ns: u64,
    /// Timestamp on the measured timeline (ns).
    pub measured_ns: u64,
}

impl DriftMeasurement {
    /// Drift in nanoseconds (positive = measured is ahead).
    pub fn drift_ns(&self) -> i64 {
        self.measured_ns as i64 - self.reference_ns as i64
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_ns() as f64 / 1_000_000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = RecordingClock::start();
        assert!(clock.elapsed_ns() < 1_000_000_000);
    }

    #[test]
    fn test_frame_interval_at_30fps() {
        assert_eq!(frame_interval(30), Duration::from_nanos(33_333_333));
        assert_eq!(frame_interval(0), Duration::from_secs(1));
    }

    #[test]
    fn test_media_time() {
        assert_eq!(media_time_ns(30, 30), 1_000_000_000);
        assert_eq!(media_time_ns(300, 30), 10_000_000_000);
    }

    #[test]
    fn test_drift_measurement() {
        let drift = DriftMeasurement {
            reference_ns: 1_000_000_000,
            measured_ns: 1_050_000_000,
        };
        assert_eq!(drift.drift_ns(), 50_000_000);
        assert!((drift.drift_ms() - 50.0).abs() < 1e-9);
        assert!(drift.exceeds_threshold_ms(10.0));
        assert!(!drift.exceeds_threshold_ms(100.0));
    }
}
