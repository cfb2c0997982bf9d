//! Variable metadata and the live `VariableHandle` view.

use serde::Serialize;

use crate::adapter::wrapper::{ModelAdapter, ValueQuery};
use crate::error::{CouplingError, CouplingResult};
use crate::model::GridLocation;

/// Direction a variable flows across the model boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    In,
    Out,
    InOut,
}

impl Intent {
    pub fn from_flags(input: bool, output: bool) -> Option<Intent> {
        match (input, output) {
            (true, true) => Some(Intent::InOut),
            (true, false) => Some(Intent::In),
            (false, true) => Some(Intent::Out),
            (false, false) => None,
        }
    }

    pub fn is_input(self) -> bool {
        matches!(self, Intent::In | Intent::InOut)
    }

    pub fn is_output(self) -> bool {
        matches!(self, Intent::Out | Intent::InOut)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::In => write!(f, "in"),
            Intent::Out => write!(f, "out"),
            Intent::InOut => write!(f, "inout"),
        }
    }
}

/// Metadata of one variable, captured at initialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDescriptor {
    pub name: String,
    pub units: String,
    pub dtype: String,
    pub itemsize: usize,
    pub nbytes: usize,
    pub grid: i32,
    pub location: GridLocation,
    pub intent: Intent,
}

/// A read-only view of one variable on an adapter.
///
/// Every accessor asks the adapter (and through it the model) at call
/// time; nothing is cached in the handle.
#[derive(Clone, Copy)]
pub struct VariableHandle<'a> {
    adapter: &'a ModelAdapter,
    name: &'a str,
}

impl<'a> VariableHandle<'a> {
    pub(crate) fn new(adapter: &'a ModelAdapter, name: &'a str) -> Self {
        VariableHandle { adapter, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn units(&self) -> CouplingResult<String> {
        self.adapter.var_units(self.name)
    }

    pub fn grid(&self) -> CouplingResult<i32> {
        self.adapter.var_grid(self.name)
    }

    pub fn dtype(&self) -> CouplingResult<String> {
        self.adapter.var_type(self.name)
    }

    pub fn location(&self) -> CouplingResult<GridLocation> {
        self.adapter.var_location(self.name)
    }

    pub fn intent(&self) -> CouplingResult<Intent> {
        self.adapter.var_intent(self.name)
    }

    /// Number of values the variable carries.
    pub fn size(&self) -> CouplingResult<usize> {
        self.adapter.var_size(self.name)
    }

    /// Current values of an output variable.
    pub fn values(&self, query: &ValueQuery) -> CouplingResult<Vec<f64>> {
        if !self.intent()?.is_output() {
            return Err(CouplingError::NotAnOutput(self.name.to_string()));
        }
        self.adapter.get_value(self.name, query)
    }

    /// One-line description: name, units, intent, grid, location, size.
    pub fn describe(&self) -> CouplingResult<String> {
        Ok(format!(
            "{} [{}] ({}) grid={} location={} size={}",
            self.name,
            self.units()?,
            self.intent()?,
            self.grid()?,
            self.location()?,
            self.size()?
        ))
    }
}

impl std::fmt::Debug for VariableHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableHandle")
            .field("component", &self.adapter.name())
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_from_flags() {
        assert_eq!(Intent::from_flags(true, true), Some(Intent::InOut));
        assert_eq!(Intent::from_flags(true, false), Some(Intent::In));
        assert_eq!(Intent::from_flags(false, true), Some(Intent::Out));
        assert_eq!(Intent::from_flags(false, false), None);
        assert!(Intent::InOut.is_input() && Intent::InOut.is_output());
        assert!(!Intent::In.is_output());
    }

    #[test]
    fn test_intent_display() {
        assert_eq!(Intent::InOut.to_string(), "inout");
    }
}
