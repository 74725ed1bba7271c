//! Core artifact and value types

/// Signal, matrix and track artifacts
pub mod artifact;
/// Dynamically typed parameter and artifact values
pub mod value;

pub use artifact::{Label, Matrix, Signal, Track};
pub use value::{Value, ValueType};
