//! Core data structures and types for the SmartKG router

pub mod context;
pub mod pattern;
pub mod results;

pub use context::{DataSource, QueryContext, SourceKind, SourceValue};
pub use pattern::{Bgp, QuadPattern};
pub use results::{Bindings, BindingsStream, EvaluationOutput, Metadata, Operation};
