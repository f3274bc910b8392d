//! Schema indexes and uniqueness constraints
//!
//! Provides ordered property indexes over `(label, property key)` pairs,
//! index query predicates and the schema descriptors handed out by
//! `SchemaRead`/`SchemaWrite`.

pub mod property_index;
pub mod query;
pub mod schema;

pub use property_index::{IndexEntry, PropertyIndex};
pub use query::{IndexOrder, IndexQuery};
pub use schema::{ConstraintDescriptor, IndexDescriptor, IndexState, SchemaStore};
