//! Schedulable units of coupling work.
//!
//! An [`Event`] runs at a due time and says when it wants to run next.
//! The built-in variants step a model, copy variables between models,
//! group events into one unit, or hand variables to an output sink.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`traits`] | [`Event`] trait, [`EventContext`], [`FnEvent`] |
//! | [`step`] | [`StepEvent`] |
//! | [`map`] | [`MapEvent`] |
//! | [`chain`] | [`ChainEvent`] |
//! | [`print`] | [`PrintEvent`], [`OutputSink`], [`MemorySink`] |

pub mod chain;
pub mod map;
pub mod print;
pub mod step;
pub mod traits;

pub use chain::ChainEvent;
pub use map::MapEvent;
pub use print::{MemorySink, OutputSink, PrintEvent, PrintRecord};
pub use step::StepEvent;
pub use traits::{Event, EventContext, FnEvent};

#[cfg(test)]
mod tests;
