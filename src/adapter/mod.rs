//! The model adapter: one uniform contract over any [`Bmi`] component.
//!
//! The adapter owns the wrapped model, scopes its lifecycle calls to the
//! model's working directory, captures variable and grid descriptors at
//! initialize, converts units and angle conventions on read, and
//! optionally resamples outputs in time.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`wrapper`] | [`ModelAdapter`], [`ValueQuery`], [`SharedAdapter`] |
//! | [`variable`] | [`VariableDescriptor`], [`VariableHandle`], [`Intent`] |
//! | [`grid`] | [`GridDescriptor`], [`GridKind`] |
//! | [`interp`] | [`TimeInterpolator`], [`InterpolationMethod`] |
//! | [`workdir`] | [`WorkingDir`] scoped directory guard |
//! | [`summary`] | [`ModelSummary`] |
//! | [`compat`] | deprecated accessor names |
//!
//! [`Bmi`]: crate::model::Bmi

pub mod compat;
pub mod grid;
pub mod interp;
pub mod summary;
pub mod variable;
pub mod workdir;
pub mod wrapper;

pub use grid::{GridDescriptor, GridKind};
pub use interp::{InterpolationMethod, TimeInterpolator};
pub use summary::ModelSummary;
pub use variable::{Intent, VariableDescriptor, VariableHandle};
pub use workdir::WorkingDir;
pub use wrapper::{ModelAdapter, SharedAdapter, ValueQuery};
