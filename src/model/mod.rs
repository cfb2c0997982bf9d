//! The model component boundary.
//!
//! Everything the coupling layer knows about a wrapped model goes through
//! the [`Bmi`] trait. Concrete model families implement it once; the
//! adapter and the scheduler never see concrete model types.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`traits`] | [`Bmi`] trait, [`GridLocation`] |
//! | [`status`] | [`BmiError`], [`BmiResult`] |
//! | [`builtin`] | [`UniformFieldModel`], [`TriangleMeshModel`] |

pub mod builtin;
pub mod status;
pub mod traits;

pub use builtin::{FieldRole, TriangleMeshModel, UniformFieldModel};
pub use status::{BmiError, BmiResult};
pub use traits::{Bmi, GridLocation};
