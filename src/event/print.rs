//! `PrintEvent`: hand variables to an output collaborator.

use std::cell::RefCell;
use std::rc::Rc;

use crate::adapter::{ModelAdapter, SharedAdapter, ValueQuery};
use crate::error::CouplingResult;
use crate::time::SimTime;

use super::traits::{Event, EventContext};

/// Receives variables to persist. Formats and file naming are entirely
/// the sink's business.
pub trait OutputSink {
    fn write(&mut self, adapter: &ModelAdapter, name: &str, format: &str, time: SimTime) -> CouplingResult<()>;
}

/// Each time it runs, passes every `(variable, format)` pair to its sink.
pub struct PrintEvent {
    name: String,
    adapter: SharedAdapter,
    fields: Vec<(String, String)>,
    sink: Box<dyn OutputSink>,
}

impl PrintEvent {
    pub fn new(adapter: SharedAdapter, fields: &[(&str, &str)], sink: impl OutputSink + 'static) -> Self {
        let name = format!("print:{}", adapter.borrow().name());
        PrintEvent {
            name,
            adapter,
            fields: fields
                .iter()
                .map(|(v, f)| (v.to_string(), f.to_string()))
                .collect(),
            sink: Box::new(sink),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

impl Event for PrintEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, ctx: &EventContext<'_>) -> CouplingResult<()> {
        let adapter = self.adapter.borrow();
        for (var, format) in &self.fields {
            self.sink.write(&adapter, var, format, ctx.now())?;
        }
        Ok(())
    }
}

// ── MemorySink ────────────────────────────────────────────────────────

/// One write captured by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrintRecord {
    pub component: String,
    pub name: String,
    pub format: String,
    pub time: SimTime,
    pub units: String,
    pub values: Vec<f64>,
}

/// Sink that keeps every write in memory. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<PrintRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn records(&self) -> Vec<PrintRecord> {
        self.records.borrow().clone()
    }
}

impl OutputSink for MemorySink {
    fn write(&mut self, adapter: &ModelAdapter, name: &str, format: &str, time: SimTime) -> CouplingResult<()> {
        let record = PrintRecord {
            component: adapter.name().to_string(),
            name: name.to_string(),
            format: format.to_string(),
            time,
            units: adapter.var_units(name)?,
            values: adapter.get_value(name, &ValueQuery::new())?,
        };
        self.records.borrow_mut().push(record);
        Ok(())
    }
}
