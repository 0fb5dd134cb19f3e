//! Secondary indexes.
//!
//! - `definition`: how a table's indexes derive values from records
//! - `manager`: keeping index entry sets in step with writes
//! - `query`: composing several index entries with set algebra

mod definition;
mod manager;
mod query;

pub use definition::{IndexDefinition, IndexDefinitions, IndexFn};
pub use manager::IndexManager;
pub use query::{IndexOp, IndexQuery, IndexUse, RecordStream};

pub(crate) use query::compose;
