//! Built-in model components: `UniformFieldModel` and `TriangleMeshModel`.
//!
//! Small synthetic models used for testing and demonstration. They stand
//! in for the wrapped physics components a real coupling would drive.

pub mod mesh;
pub mod uniform;

pub use mesh::TriangleMeshModel;
pub use uniform::{FieldRole, UniformFieldModel};
