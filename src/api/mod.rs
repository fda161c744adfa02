pub mod format;

pub use format::{to_api_value, to_api_values, QueryResultEnvelope};
