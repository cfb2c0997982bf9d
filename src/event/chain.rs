//! `ChainEvent`: several events run back to back as one.

use crate::error::CouplingResult;

use super::traits::{Event, EventContext};

/// Runs its sub-events in order, as one scheduling unit.
///
/// The chain is queued and re-queued at its own registration interval;
/// sub-events' own next-due times are not consulted. If a sub-event
/// fails, the rest of the chain does not run.
pub struct ChainEvent {
    name: String,
    events: Vec<Box<dyn Event>>,
}

impl ChainEvent {
    pub fn new(events: Vec<Box<dyn Event>>) -> Self {
        let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
        let name = format!("chain[{}]", names.join(", "));
        ChainEvent { name, events }
    }

    /// Append one more event.
    pub fn then(mut self, event: impl Event + 'static) -> Self {
        self.events.push(Box::new(event));
        self
    }

    /// Rename the chain.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Event for ChainEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, ctx: &EventContext<'_>) -> CouplingResult<()> {
        for event in &mut self.events {
            event.execute(ctx)?;
        }
        Ok(())
    }
}
