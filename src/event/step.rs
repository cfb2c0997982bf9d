//! `StepEvent`: advance one model to the scheduler's clock.

use tracing::trace;

use crate::adapter::SharedAdapter;
use crate::error::CouplingResult;
use crate::time::SimTime;

use super::traits::{Event, EventContext};

/// Brings its model up to the time the event runs at.
///
/// By default the next run is one model time step later (converted to
/// the scheduler's units). [`fixed`](StepEvent::fixed) keeps the
/// registration interval instead. Models whose step is not positive
/// also fall back to the interval.
pub struct StepEvent {
    name: String,
    adapter: SharedAdapter,
    follow_time_step: bool,
}

impl StepEvent {
    pub fn new(adapter: SharedAdapter) -> Self {
        let name = adapter.borrow().name().to_string();
        StepEvent {
            name,
            adapter,
            follow_time_step: true,
        }
    }

    /// Rename the event.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Run at the registration interval regardless of the model's step.
    pub fn fixed(mut self) -> Self {
        self.follow_time_step = false;
        self
    }

    pub fn adapter(&self) -> &SharedAdapter {
        &self.adapter
    }
}

impl Event for StepEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, ctx: &EventContext<'_>) -> CouplingResult<()> {
        trace!(event = %self.name, now = %ctx.now(), "stepping model");
        self.adapter
            .borrow_mut()
            .update_until(ctx.now().value(), ctx.time_units())
    }

    fn next_due(&self, ctx: &EventContext<'_>) -> CouplingResult<Option<SimTime>> {
        if !self.follow_time_step {
            return Ok(None);
        }
        let dt = self.adapter.borrow().time_step(ctx.time_units())?;
        if dt.is_finite() && dt > 0.0 {
            Ok(Some(ctx.now().plus(dt)))
        } else {
            Ok(None)
        }
    }
}
