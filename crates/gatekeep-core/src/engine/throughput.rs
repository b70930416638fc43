//! Sliding-window throughput meter
//!
//! Keeps the byte counts of the last second of reads and reports them as
//! megabits per second.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Width of the sampling window
pub const WINDOW: Duration = Duration::from_secs(1);

/// Bytes transferred within the trailing one-second window
#[derive(Debug, Default)]
pub struct ThroughputWindow {
    samples: VecDeque<(Instant, u64)>,
    window_bytes: u64,
}

impl ThroughputWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read at `at` and return the current speed in Mbps
    pub fn record(&mut self, at: Instant, bytes: u64) -> f64 {
        self.samples.push_back((at, bytes));
        self.window_bytes += bytes;

        while let Some(&(t, size)) = self.samples.front() {
            if at.saturating_duration_since(t) > WINDOW {
                self.samples.pop_front();
                self.window_bytes -= size;
            } else {
                break;
            }
        }

        self.speed_mbps()
    }

    pub fn window_bytes(&self) -> u64 {
        self.window_bytes
    }

    /// Megabits per second, with 1 Mb = 1024 * 1024 bits
    pub fn speed_mbps(&self) -> f64 {
        (self.window_bytes * 8) as f64 / (1024.0 * 1024.0)
    }
}
