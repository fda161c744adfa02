// Post-write observers registered by the pipeline
pub mod cascade_delete;
pub mod derived_aggregate;

pub use cascade_delete::CascadeDelete;
pub use derived_aggregate::{DerivedAggregate, Rounding};
