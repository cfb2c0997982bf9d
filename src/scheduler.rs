//! Coupling scheduler.
//!
//! Uses a `BinaryHeap` with reversed `Ord` on [`QueueEntry`] as a min-heap
//! keyed by `(due, event_id)`. An [`EventId`] is the index of the event's
//! slot, so events due at the same time always run in the order they were
//! registered and two runs over the same registrations produce the same
//! trace.
//!
//! Event names label traces and logs only. Two events may share a name;
//! each registration gets its own slot.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::{CouplingError, CouplingResult};
use crate::event::{Event, EventContext};
use crate::time::SimTime;
use crate::units::Unit;

// ── Event ids ─────────────────────────────────────────────────────────

/// Slot handed out by [`Scheduler::register`]; ids count up from zero in
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct EventId(usize);

impl EventId {
    /// Position of the event among the scheduler's registrations.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Queue entry ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    due: SimTime,
    id: EventId,
}

/// Ordering: smallest `(due, id)` first, reversed for `BinaryHeap`.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.due.cmp(&self.due).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Slot {
    event: Box<dyn Event>,
    interval: f64,
    // Fixed-interval runs are due at `origin + k * interval`.
    origin: SimTime,
    k: u64,
    runs: u64,
}

// ── Trace / StopHandle ────────────────────────────────────────────────

/// One executed event.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TraceEntry {
    pub id: EventId,
    pub name: String,
    pub time: SimTime,
}

/// Cooperative cancellation for a running scheduler.
///
/// A stop request takes effect before the next event is selected; it
/// never interrupts an event in progress. The scheduler clears the
/// request once it has honoured it.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, AtomicOrdering::SeqCst)
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────

/// Drives registered events along one global clock.
///
/// The scheduler never initializes or finalizes models; adapters behind
/// events must be initialized before `run`/`step` and finalized by the
/// caller afterwards.
///
/// Any error from an event stops the run immediately: the failed event is
/// not re-queued and the clock stays at the last event that succeeded.
pub struct Scheduler {
    queue: BinaryHeap<QueueEntry>,
    slots: Vec<Slot>,
    current_time: SimTime,
    events_processed: u64,
    time_units: Option<String>,
    trace: Vec<TraceEntry>,
    stop: StopHandle,
}

impl Scheduler {
    /// Create an empty scheduler at time zero, in each adapter's own time
    /// units.
    pub fn new() -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            slots: Vec::new(),
            current_time: SimTime::ZERO,
            events_processed: 0,
            time_units: None,
            trace: Vec::new(),
            stop: StopHandle::default(),
        }
    }

    /// Run the clock in `units`; events convert into each model's units.
    pub fn with_time_units(mut self, units: &str) -> CouplingResult<Self> {
        if !Unit::parse(units)?.is_time() {
            return Err(CouplingError::Configuration(format!(
                "scheduler time units must be a unit of time, got '{}'",
                units
            )));
        }
        self.time_units = Some(units.to_string());
        Ok(self)
    }

    pub fn time_units(&self) -> Option<&str> {
        self.time_units.as_deref()
    }

    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Events executed over the scheduler's lifetime.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Every executed `(id, name, time)`, in execution order.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Handle that can stop a run from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Earliest due time in the queue.
    pub fn next_due(&self) -> Option<SimTime> {
        self.queue.peek().map(|e| e.due)
    }

    /// Queued events as `(id, name, due)`, in the order they would run.
    pub fn pending(&self) -> Vec<(EventId, &str, SimTime)> {
        let mut entries: Vec<QueueEntry> = self.queue.iter().copied().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries
            .into_iter()
            .map(|e| (e.id, self.slots[e.id.index()].event.name(), e.due))
            .collect()
    }

    /// How many times the event registered as `id` has run.
    pub fn runs(&self, id: EventId) -> Option<u64> {
        self.slots.get(id.index()).map(|s| s.runs)
    }

    /// Register `event` to first run `interval` after the current time.
    ///
    /// Fails with a configuration error, leaving the queue untouched, if
    /// `interval` is not a positive finite number. The scheduler owns the
    /// event from here on, so one event can never hold two slots.
    pub fn register(&mut self, event: impl Event + 'static, interval: f64) -> CouplingResult<EventId> {
        self.register_boxed(Box::new(event), interval)
    }

    /// [`register`](Self::register) for an already boxed event.
    pub fn register_boxed(&mut self, event: Box<dyn Event>, interval: f64) -> CouplingResult<EventId> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(CouplingError::Configuration(format!(
                "interval for '{}' must be positive, got {}",
                event.name(),
                interval
            )));
        }
        let id = EventId(self.slots.len());
        let due = self.current_time.plus(interval);
        debug!(%id, name = event.name(), interval, first = %due, "event registered");
        self.slots.push(Slot {
            event,
            interval,
            origin: self.current_time,
            k: 1,
            runs: 0,
        });
        self.queue.push(QueueEntry { due, id });
        Ok(id)
    }

    /// Execute every event due at or before `stop_time`, then move the
    /// clock to `stop_time`.
    ///
    /// Returns the number of events executed. A stop request ends the run
    /// early with the clock at the last executed event. `stop_time` must be
    /// finite.
    #[instrument(skip(self), fields(from = %self.current_time))]
    pub fn run(&mut self, stop_time: f64) -> CouplingResult<u64> {
        if !stop_time.is_finite() {
            return Err(CouplingError::Configuration(format!(
                "stop time must be finite, got {}",
                stop_time
            )));
        }
        let stop_at = SimTime::new(stop_time);
        let start = self.events_processed;
        loop {
            if self.stop.take() {
                info!(now = %self.current_time, "run stopped on request");
                return Ok(self.events_processed - start);
            }
            match self.queue.peek() {
                Some(entry) if entry.due <= stop_at => {}
                _ => break,
            }
            self.fire_next()?;
        }
        if self.current_time < stop_at {
            self.current_time = stop_at;
        }
        let executed = self.events_processed - start;
        info!(executed, now = %self.current_time, "run complete");
        Ok(executed)
    }

    /// Execute the next batch of simultaneously due events.
    ///
    /// Returns the time the batch ran at, or `None` if nothing is queued.
    pub fn step(&mut self) -> CouplingResult<Option<SimTime>> {
        let due = match self.queue.peek() {
            Some(entry) => entry.due,
            None => return Ok(None),
        };
        while self.queue.peek().is_some_and(|e| e.due == due) {
            self.fire_next()?;
        }
        Ok(Some(due))
    }

    // Pop one entry, execute it, re-queue it.
    fn fire_next(&mut self) -> CouplingResult<()> {
        let entry = match self.queue.pop() {
            Some(entry) => entry,
            None => return Ok(()),
        };

        // Simulated time must never go backward.
        assert!(
            entry.due >= self.current_time,
            "Time went backward! current={}, event={}",
            self.current_time,
            entry.due
        );

        let ctx = EventContext::new(entry.due, self.time_units.as_deref());
        let slot = &mut self.slots[entry.id.index()];
        debug!(id = %entry.id, name = slot.event.name(), now = %entry.due, "executing");
        slot.event.execute(&ctx)?;

        self.current_time = entry.due;
        self.events_processed += 1;
        slot.runs += 1;
        self.trace.push(TraceEntry {
            id: entry.id,
            name: slot.event.name().to_string(),
            time: entry.due,
        });

        let next = match slot.event.next_due(&ctx)? {
            Some(t) => {
                slot.origin = t;
                slot.k = 0;
                t
            }
            None => {
                slot.k += 1;
                slot.origin.plus(slot.k as f64 * slot.interval)
            }
        };
        assert!(
            next > entry.due,
            "event '{}' wants to run at {} after running at {}",
            slot.event.name(),
            next,
            entry.due
        );
        self.queue.push(QueueEntry { due: next, id: entry.id });
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("current_time", &self.current_time)
            .field("pending", &self.queue.len())
            .field("events_processed", &self.events_processed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::event::FnEvent;
    use crate::model::BmiError;

    type Log = Rc<RefCell<Vec<(String, f64)>>>;

    fn recorder(name: &str, log: &Log) -> FnEvent<impl FnMut(&EventContext<'_>) -> CouplingResult<()>> {
        let log = Rc::clone(log);
        let owned = name.to_string();
        FnEvent::new(name, move |ctx: &EventContext<'_>| {
            log.borrow_mut().push((owned.clone(), ctx.now().value()));
            Ok(())
        })
    }

    fn names(log: &Log) -> Vec<(String, f64)> {
        log.borrow().clone()
    }

    #[test]
    fn test_queue_entry_ordering() {
        let early = QueueEntry { due: SimTime::new(1.0), id: EventId(5) };
        let late = QueueEntry { due: SimTime::new(2.0), id: EventId(0) };
        let tie = QueueEntry { due: SimTime::new(1.0), id: EventId(6) };
        // Reversed: the entry that should run first compares greater.
        assert!(early > late);
        assert!(early > tie);
    }

    #[test]
    fn test_tie_break_is_registration_order() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        sched.register(recorder("a", &log), 1.0).unwrap();
        sched.register(recorder("b", &log), 1.0).unwrap();
        sched.run(1.0).unwrap();
        assert_eq!(names(&log), vec![("a".to_string(), 1.0), ("b".to_string(), 1.0)]);
    }

    #[test]
    fn test_nondecreasing_time_order() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        sched.register(recorder("slow", &log), 0.75).unwrap();
        sched.register(recorder("fast", &log), 0.5).unwrap();
        sched.run(1.5).unwrap();
        let times: Vec<f64> = names(&log).iter().map(|(_, t)| *t).collect();
        assert_eq!(times, vec![0.5, 0.75, 1.0, 1.5, 1.5]);
        // At 1.5 both are due; "slow" was registered first.
        assert_eq!(names(&log)[3].0, "slow");
    }

    #[test]
    fn test_fixed_interval_run_count() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let id = sched.register(recorder("tick", &log), 0.1).unwrap();
        let executed = sched.run(1.0).unwrap();
        // origin + k * interval keeps the tenth firing at exactly 1.0.
        assert_eq!(executed, 10);
        assert_eq!(sched.runs(id), Some(10));
        assert_eq!(sched.current_time(), SimTime::new(1.0));
        assert_eq!(sched.next_due(), Some(SimTime::new(1.1)));
    }

    #[test]
    fn test_run_is_resumable() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        sched.register(recorder("tick", &log), 1.0).unwrap();
        assert_eq!(sched.run(2.5).unwrap(), 2);
        assert_eq!(sched.current_time(), SimTime::new(2.5));
        assert_eq!(sched.run(4.0).unwrap(), 2);
        assert_eq!(sched.events_processed(), 4);
    }

    #[test]
    fn test_invalid_interval_leaves_queue_unchanged() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = sched.register(recorder("bad", &log), bad).unwrap_err();
            assert!(matches!(err, CouplingError::Configuration(_)));
        }
        assert!(sched.is_empty());
        assert_eq!(sched.register(recorder("good", &log), 1.0).unwrap(), EventId(0));
    }

    #[test]
    fn test_shared_name_gets_own_slot() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        let fast = sched.register(recorder("a", &log), 1.0).unwrap();
        let slow = sched.register(recorder("a", &log), 2.0).unwrap();
        assert_ne!(fast, slow);
        assert_eq!(sched.len(), 2);

        sched.run(2.0).unwrap();
        assert_eq!(sched.runs(fast), Some(2));
        assert_eq!(sched.runs(slow), Some(1));
        let ids: Vec<EventId> = sched.trace().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![fast, fast, slow]);
    }

    #[test]
    fn test_stop_time_must_be_finite() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        sched.register(recorder("a", &log), 1.0).unwrap();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = sched.run(bad).unwrap_err();
            assert!(matches!(err, CouplingError::Configuration(_)));
        }
        assert_eq!(sched.current_time(), SimTime::ZERO);
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn test_register_after_run_starts_from_current_time() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        sched.run(3.0).unwrap();
        sched.register(recorder("late", &log), 1.0).unwrap();
        assert_eq!(sched.next_due(), Some(SimTime::new(4.0)));
    }

    #[test]
    fn test_step_runs_one_batch() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        sched.register(recorder("a", &log), 1.0).unwrap();
        sched.register(recorder("b", &log), 1.0).unwrap();
        sched.register(recorder("c", &log), 1.5).unwrap();

        assert_eq!(sched.step().unwrap(), Some(SimTime::new(1.0)));
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(sched.current_time(), SimTime::new(1.0));

        assert_eq!(sched.step().unwrap(), Some(SimTime::new(1.5)));
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(Scheduler::new().step().unwrap(), None);
    }

    #[test]
    fn test_error_stops_run_and_keeps_clock() {
        let mut sched = Scheduler::new();
        let mut calls = 0;
        sched
            .register(
                FnEvent::new("flaky", move |_ctx: &EventContext<'_>| {
                    calls += 1;
                    if calls == 3 {
                        Err(CouplingError::Model {
                            operation: "update",
                            args: String::new(),
                            source: BmiError::failure("boom"),
                        })
                    } else {
                        Ok(())
                    }
                }),
                1.0,
            )
            .unwrap();

        let err = sched.run(10.0).unwrap_err();
        assert!(err.is_model_error());
        assert_eq!(sched.current_time(), SimTime::new(2.0));
        assert_eq!(sched.events_processed(), 2);
        // The failed event was not re-queued.
        assert!(sched.is_empty());
    }

    #[test]
    fn test_trace_is_deterministic() {
        fn build() -> Vec<TraceEntry> {
            let log = Log::default();
            let mut sched = Scheduler::new();
            sched.register(recorder("x", &log), 0.3).unwrap();
            sched.register(recorder("y", &log), 0.2).unwrap();
            sched.register(recorder("z", &log), 0.6).unwrap();
            sched.run(3.0).unwrap();
            sched.trace().to_vec()
        }
        let a = build();
        let b = build();
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_pending_in_run_order() {
        let log = Log::default();
        let mut sched = Scheduler::new();
        sched.register(recorder("b", &log), 2.0).unwrap();
        sched.register(recorder("a", &log), 1.0).unwrap();
        let pending: Vec<&str> = sched.pending().iter().map(|(_, n, _)| *n).collect();
        assert_eq!(pending, vec!["a", "b"]);
    }

    #[test]
    fn test_stop_handle() {
        let mut sched = Scheduler::new();
        let handle = sched.stop_handle();
        let mut seen = 0;
        sched
            .register(
                FnEvent::new("stopper", move |_ctx: &EventContext<'_>| {
                    seen += 1;
                    if seen == 2 {
                        handle.stop();
                    }
                    Ok(())
                }),
                1.0,
            )
            .unwrap();

        assert_eq!(sched.run(10.0).unwrap(), 2);
        assert_eq!(sched.current_time(), SimTime::new(2.0));
        // The request was consumed; the next run continues.
        assert!(!sched.stop_handle().is_stopped());
        assert_eq!(sched.run(4.0).unwrap(), 2);
    }

    #[test]
    fn test_time_units_must_be_time() {
        assert!(Scheduler::new().with_time_units("h").is_ok());
        assert!(matches!(
            Scheduler::new().with_time_units("m"),
            Err(CouplingError::Configuration(_))
        ));
    }

    struct Stuck;

    impl Event for Stuck {
        fn name(&self) -> &str {
            "stuck"
        }

        fn execute(&mut self, _ctx: &EventContext<'_>) -> CouplingResult<()> {
            Ok(())
        }

        fn next_due(&self, ctx: &EventContext<'_>) -> CouplingResult<Option<SimTime>> {
            Ok(Some(ctx.now()))
        }
    }

    #[test]
    #[should_panic(expected = "wants to run at")]
    fn test_no_progress_panics() {
        let mut sched = Scheduler::new();
        sched.register(Stuck, 1.0).unwrap();
        let _ = sched.run(2.0);
    }
}
