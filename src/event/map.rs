//! `MapEvent`: copy variables from one model into another.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::adapter::{SharedAdapter, ValueQuery};
use crate::error::{CouplingError, CouplingResult};
use crate::mapper::{self, GridMapping, MappingMethod};
use crate::units;

use super::traits::{Event, EventContext};

/// Reads output variables of `src` and writes them into input variables of
/// `dst`.
///
/// Values are read in the destination variable's units and carried across
/// grids by a [`GridMapping`]. Mappings are built at construction when
/// both adapters are already initialized, otherwise on first execution.
/// The event runs at its registration interval.
pub struct MapEvent {
    name: String,
    src: SharedAdapter,
    dst: SharedAdapter,
    /// `(dst_var, src_var)` pairs.
    vars: Vec<(String, String)>,
    method: MappingMethod,
    mappings: Option<Vec<GridMapping>>,
}

impl MapEvent {
    /// Map each `(dst_var, src_var)` pair from `src` into `dst`.
    pub fn new(
        src: SharedAdapter,
        dst: SharedAdapter,
        vars: &[(&str, &str)],
        method: MappingMethod,
    ) -> CouplingResult<Self> {
        if vars.is_empty() {
            return Err(CouplingError::Configuration(
                "a map event needs at least one variable pair".to_string(),
            ));
        }
        let name = format!("map:{}->{}", src.borrow().name(), dst.borrow().name());
        let mut event = MapEvent {
            name,
            src,
            dst,
            vars: vars
                .iter()
                .map(|(d, s)| (d.to_string(), s.to_string()))
                .collect(),
            method,
            mappings: None,
        };
        let ready = event.src.borrow().is_initialized() && event.dst.borrow().is_initialized();
        if ready {
            event.mappings = Some(event.build_mappings()?);
        }
        Ok(event)
    }

    /// Map every variable that is an output of `src` and an input of
    /// `dst`, by name.
    pub fn matching(src: SharedAdapter, dst: SharedAdapter, method: MappingMethod) -> CouplingResult<Self> {
        let outputs = src.borrow().output_var_names();
        let inputs = dst.borrow().input_var_names();
        let shared: Vec<String> = outputs.into_iter().filter(|n| inputs.contains(n)).collect();
        if shared.is_empty() {
            return Err(CouplingError::Configuration(format!(
                "{} has no outputs that {} takes as inputs",
                src.borrow().name(),
                dst.borrow().name()
            )));
        }
        let pairs: Vec<(&str, &str)> = shared.iter().map(|n| (n.as_str(), n.as_str())).collect();
        Self::new(src, dst, &pairs, method)
    }

    /// Rename the event.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// The `(dst_var, src_var)` pairs this event copies.
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    /// Grid mappings, once built.
    pub fn mappings(&self) -> Option<&[GridMapping]> {
        self.mappings.as_deref()
    }

    fn build_mappings(&self) -> CouplingResult<Vec<GridMapping>> {
        let src = self.src.borrow();
        let dst = self.dst.borrow();
        let mappings = self
            .vars
            .iter()
            .map(|(dst_var, src_var)| {
                src.var(src_var)?;
                dst.var(dst_var)?;
                mapper::build(&src, src_var, &dst, dst_var, self.method)
            })
            .collect::<CouplingResult<Vec<_>>>()?;
        debug!(event = %self.name, pairs = mappings.len(), "map event ready");
        Ok(mappings)
    }

    // Values of `src_var` in `dst_var`'s units, resampled at `ctx.now()`
    // when the source records its history.
    fn read(&self, ctx: &EventContext<'_>, dst_var: &str, src_var: &str) -> CouplingResult<Vec<f64>> {
        let dst_units = self.dst.borrow().var_units(dst_var)?;
        let src = self.src.borrow();
        let mut query = ValueQuery::new().units(&dst_units);
        if src.interpolator(src_var).is_some() {
            let at = match ctx.time_units() {
                Some(u) => units::convert_time(ctx.now().value(), u, &src.time_units()?)?,
                None => ctx.now().value(),
            };
            query = query.at(at);
        }
        src.get_value(src_var, &query)
    }
}

impl Event for MapEvent {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self, ctx: &EventContext<'_>) -> CouplingResult<()> {
        if self.mappings.is_none() {
            self.mappings = Some(self.build_mappings()?);
        }
        let mappings = self.mappings.as_deref().unwrap_or_default();
        for ((dst_var, src_var), mapping) in self.vars.iter().zip(mappings) {
            let values = self.read(ctx, dst_var, src_var)?;
            let mapped = mapping.apply(&values)?;
            trace!(event = %self.name, src = %src_var, dst = %dst_var, n = mapped.len(), "mapped");
            self.dst.borrow_mut().set_value(dst_var, &mapped)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for MapEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapEvent")
            .field("name", &self.name)
            .field("vars", &self.vars)
            .field("method", &self.method)
            .field("same_adapter", &Rc::ptr_eq(&self.src, &self.dst))
            .finish()
    }
}
