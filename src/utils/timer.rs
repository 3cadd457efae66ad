//! Timer utilities
//!
//! Scenario and step timing.

use std::time::{Duration, Instant};

use crate::models::StepTiming;

/// Simple timer for measuring elapsed time
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    label: String,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            label: label.into(),
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Stop timer and return elapsed time in milliseconds
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("{}: {}ms", self.label, elapsed);
        elapsed
    }
}

/// Records the end of each scenario step.
///
/// Laps are cumulative from the stopwatch start; `steps` converts them to
/// per-step durations.
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    laps: Vec<(String, Duration)>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            laps: Vec::new(),
        }
    }

    /// Mark the end of step `label`
    pub fn lap(&mut self, label: impl Into<String>) {
        let elapsed = self.start.elapsed();
        self.laps.push((label.into(), elapsed));
    }

    /// Per-step durations, in the order the steps finished
    pub fn steps(&self) -> Vec<StepTiming> {
        let mut result = Vec::with_capacity(self.laps.len());
        let mut prev = Duration::ZERO;

        for (label, cumulative) in &self.laps {
            result.push(StepTiming {
                name: label.clone(),
                duration_ms: cumulative.saturating_sub(prev).as_millis() as u64,
            });
            prev = *cumulative;
        }

        result
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
