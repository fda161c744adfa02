// Observer system: post-write hooks run by the service layer after each confirmed write

pub mod context;
pub mod traits;
pub mod pipeline;
pub mod error;
pub mod implementations;

pub use context::*;
pub use traits::*;
pub use pipeline::*;
pub use error::*;
pub use implementations::*;
