//! Progress tracking for the display.

use serde::{Deserialize, Serialize};

/// Turns fractional engine samples into a 0-100 display value.
///
/// The value never goes backwards within a job: a sample lower than the
/// current value is ignored. Values are rounded to one decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressTracker {
    percent: f64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current display value.
    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Back to zero, at the start of a job.
    pub fn reset(&mut self) {
        self.percent = 0.0;
    }

    /// Records one sample and returns the display value.
    pub fn record(&mut self, fraction: f64) -> f64 {
        if !fraction.is_finite() {
            return self.percent;
        }
        let percent = (fraction.clamp(0.0, 1.0) * 1000.0).round() / 10.0;
        if percent > self.percent {
            self.percent = percent;
        }
        self.percent
    }

    /// Jumps to 100 once the job is done.
    pub fn complete(&mut self) {
        self.percent = 100.0;
    }
}
