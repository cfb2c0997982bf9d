//! `Event` trait and the context the scheduler hands to it.

use crate::error::CouplingResult;
use crate::time::SimTime;

// ── EventContext ──────────────────────────────────────────────────────

/// What an event sees when it runs.
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub(crate) now: SimTime,
    pub(crate) time_units: Option<&'a str>,
}

impl<'a> EventContext<'a> {
    pub fn new(now: SimTime, time_units: Option<&'a str>) -> Self {
        EventContext { now, time_units }
    }

    /// Time the event is running at, on the scheduler's clock.
    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Units of the scheduler's clock. `None` means each adapter's own
    /// time units.
    #[inline]
    pub fn time_units(&self) -> Option<&'a str> {
        self.time_units
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A unit of scheduled coupling work.
///
/// The scheduler calls [`execute`](Event::execute) at each due time, then
/// asks [`next_due`](Event::next_due) when to run again. Returning `None`
/// keeps the interval the event was registered with.
///
/// # Contract
///
/// A `Some` next-due time must be strictly after `ctx.now()`; the
/// scheduler panics otherwise.
pub trait Event {
    /// Name used in traces and logs; unique per scheduler.
    fn name(&self) -> &str;

    /// Do the work. An error stops the run.
    fn execute(&mut self, ctx: &EventContext<'_>) -> CouplingResult<()>;

    /// Absolute time of the next run, if the event decides it.
    fn next_due(&self, ctx: &EventContext<'_>) -> CouplingResult<Option<SimTime>> {
        let _ = ctx;
        Ok(None)
    }
}

/// An event backed by a closure. Handy for tests and ad-hoc hooks.
pub struct FnEvent<F> {
    name: String,
    f: F,
}

impl<F> FnEvent<F>
where
    F: FnMut(&EventContext<'_>) -> CouplingResult<()>,
{
    pub fn new(name: &str, f: F) -> Self {
        FnEvent {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> Event for FnEvent<F>
where
    F: FnMut(&EventContext<'_>) -> CouplingResult<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, ctx: &EventContext<'_>) -> CouplingResult<()> {
        (self.f)(ctx)
    }
}
