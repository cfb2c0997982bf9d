//! `TimeInterpolator`: resamples a variable at times between model steps.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// How values between two recorded samples are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Straight line between the bracketing samples.
    #[default]
    Linear,
    /// The latest sample at or before the requested time.
    Previous,
    /// Whichever bracketing sample is closer in time.
    Nearest,
}

/// A bounded window of `(time, values)` samples for one variable.
///
/// Samples must arrive in nondecreasing time. A sample at the same time as
/// the last one replaces it; a sample earlier than the last one means the
/// model was rewound, and the window restarts from it. Requests outside the
/// recorded window clamp to the nearest end.
#[derive(Debug, Clone)]
pub struct TimeInterpolator {
    method: InterpolationMethod,
    capacity: usize,
    samples: VecDeque<(f64, Vec<f64>)>,
}

impl TimeInterpolator {
    pub const DEFAULT_CAPACITY: usize = 8;

    pub fn new(method: InterpolationMethod) -> Self {
        Self::with_capacity(method, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(method: InterpolationMethod, capacity: usize) -> Self {
        TimeInterpolator {
            method,
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Earliest and latest recorded sample times.
    pub fn window(&self) -> Option<(f64, f64)> {
        Some((self.samples.front()?.0, self.samples.back()?.0))
    }

    /// Record the variable's values at `time`.
    pub fn push(&mut self, time: f64, values: Vec<f64>) {
        match self.samples.back() {
            Some((last, _)) if time == *last => {
                self.samples.pop_back();
            }
            Some((last, _)) if time < *last => self.samples.clear(),
            _ => {}
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((time, values));
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Values at `at`, or a reason why none can be produced.
    pub fn interpolate(&self, at: f64) -> Result<Vec<f64>, String> {
        if !at.is_finite() {
            return Err(format!("requested time {} is not finite", at));
        }
        let (first, last) = match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err("no samples recorded".to_string()),
        };
        if at <= first.0 {
            return Ok(first.1.clone());
        }
        if at >= last.0 {
            return Ok(last.1.clone());
        }

        // `at` lies strictly inside the window, so a bracketing pair exists.
        let upper = self.samples.iter().position(|(t, _)| *t >= at).unwrap_or(0);
        let (t1, v1) = &self.samples[upper];
        if *t1 == at {
            return Ok(v1.clone());
        }
        let (t0, v0) = &self.samples[upper - 1];

        let values = match self.method {
            InterpolationMethod::Previous => v0.clone(),
            InterpolationMethod::Nearest => {
                if at - t0 <= t1 - at {
                    v0.clone()
                } else {
                    v1.clone()
                }
            }
            InterpolationMethod::Linear => {
                let w = (at - t0) / (t1 - t0);
                v0.iter().zip(v1).map(|(a, b)| a + w * (b - a)).collect()
            }
        };
        Ok(values)
    }
}
