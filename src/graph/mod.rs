//! Core property graph model
//!
//! This module implements the data model the kernel API reads and writes:
//! - Nodes with a set of label tokens and properties
//! - Directed, typed relationships with properties, grouped per node by
//!   type and direction
//! - Token interning for labels, relationship types and property keys
//! - The committed in-memory store transactions apply to on commit

pub mod labels;
pub mod node;
pub mod property;
pub mod relationship;
pub mod store;
pub mod token;
pub mod types;

// Re-export main types
pub use labels::LabelSet;
pub use node::NodeRecord;
pub use property::{PropertyMap, PropertyValue, ValueCategory};
pub use relationship::{NodeAdjacency, RelationshipGroupRecord, RelationshipRecord};
pub use store::{GraphStatistics, GraphStore};
pub use token::{TokenKind, TokenRegistry};
pub use types::{Direction, LabelId, NodeId, PropertyKeyId, RelTypeId, RelationshipId, TxId};
