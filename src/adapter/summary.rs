//! `ModelSummary`: a serializable snapshot of an adapter's metadata.

use serde::Serialize;

use crate::error::{CouplingError, CouplingResult};

use super::grid::GridDescriptor;
use super::variable::VariableDescriptor;
use super::wrapper::ModelAdapter;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub input_var_names: Vec<String>,
    pub output_var_names: Vec<String>,
    pub variables: Vec<VariableDescriptor>,
    pub grids: Vec<GridDescriptor>,
    pub time_units: String,
    pub start_time: f64,
    pub current_time: f64,
    pub end_time: f64,
    pub time_step: f64,
}

impl ModelAdapter {
    /// Metadata of an initialized adapter. Times are in the adapter's
    /// time units.
    pub fn summary(&self) -> CouplingResult<ModelSummary> {
        if !self.is_initialized() {
            return Err(CouplingError::NotInitialized(self.name().to_string()));
        }
        Ok(ModelSummary {
            name: self.name().to_string(),
            input_var_names: self.input_var_names(),
            output_var_names: self.output_var_names(),
            variables: self.variables().cloned().collect(),
            grids: self.grids().cloned().collect(),
            time_units: self.time_units()?,
            start_time: self.start_time(None)?,
            current_time: self.current_time(None)?,
            end_time: self.end_time(None)?,
            time_step: self.time_step(None)?,
        })
    }

    /// [`summary`](Self::summary) rendered as pretty JSON.
    pub fn to_json(&self) -> CouplingResult<String> {
        let summary = self.summary()?;
        serde_json::to_string_pretty(&summary)
            .map_err(|e| CouplingError::Configuration(format!("cannot serialize summary: {}", e)))
    }
}
