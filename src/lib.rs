//! Samyama Kernel API
//!
//! A cursor-based transactional kernel over an in-memory property graph.
//! Callers open a [`Session`], begin [`Transaction`]s from it, and read
//! through reusable cursors that the transaction's [`CursorFactory`] hands
//! out and the [`Read`] surface populates. Writes go to a per-transaction
//! delta that reads of the same transaction observe immediately and that
//! becomes visible to everyone else on commit.
//!
//! # Architecture
//!
//! - `graph`: identifiers, values, committed records and the [`GraphStore`]
//! - `index`: label/property value indexes, index predicates, schema
//! - `kernel`: sessions, transactions, read/write surfaces, locking and the
//!   merged transaction view
//! - `cursor`: the cursor traits and every cursor implementation
//! - `helpers`: traversal utilities over the cursor traits
//! - `config`: [`KernelConfig`] and logging setup
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_kernel::{AuthToken, Cursor, Kernel, KernelConfig};
//!
//! let kernel = Kernel::new(KernelConfig::default());
//! let session = kernel.begin_session(AuthToken::None).unwrap();
//!
//! let mut tx = session.begin_transaction().unwrap();
//! let person = tx.token_write().label_get_or_create_for_name("Person").unwrap();
//! let knows = tx.token_write().relationship_type_get_or_create_for_name("KNOWS").unwrap();
//! let alice = tx.data_write().node_create().unwrap();
//! let bob = tx.data_write().node_create().unwrap();
//! tx.data_write().node_add_label(alice, person).unwrap();
//! tx.data_write().relationship_create(alice, knows, bob).unwrap();
//!
//! // Expand alice -> groups -> outgoing relationships -> neighbour
//! let mut nodes = tx.cursors().allocate_node_cursor();
//! let mut groups = tx.cursors().allocate_relationship_group_cursor();
//! let mut rels = tx.cursors().allocate_relationship_traversal_cursor();
//! let mut neighbour = tx.cursors().allocate_node_cursor();
//! tx.data_read().single_node(alice, &mut nodes).unwrap();
//! assert!(nodes.next().unwrap());
//! nodes.relationships(&mut groups).unwrap();
//! assert!(groups.next().unwrap());
//! groups.outgoing(&mut rels).unwrap();
//! assert!(rels.next().unwrap());
//! rels.neighbour(&mut neighbour).unwrap();
//! assert!(neighbour.next().unwrap());
//! assert_eq!(neighbour.node_reference(), bob);
//!
//! tx.success().unwrap();
//! tx.close().unwrap();
//! assert!(nodes.is_closed());
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod cursor;
pub mod error;
pub mod graph;
pub mod helpers;
pub mod index;
pub mod kernel;

// Re-export main types for convenience
pub use config::{init_tracing, KernelConfig};

pub use cursor::{
    Cursor, CursorFactory, CursorState, NodeCursor, NodeIndexCursor, NodeLabelIndexCursor,
    NodeValueIndexCursor, PropertyCursor, RelationshipGroupCursor, RelationshipScanCursor,
    RelationshipTraversal, RelationshipTraversalCursor,
};

pub use error::{ErrorKind, KernelError, KernelResult};

pub use graph::{
    Direction, GraphStatistics, GraphStore, LabelId, LabelSet, NodeId, PropertyKeyId, PropertyValue,
    RelTypeId, RelationshipId, TxId,
};

pub use index::{ConstraintDescriptor, IndexDescriptor, IndexOrder, IndexQuery, IndexState};

pub use kernel::{
    AuthToken, Kernel, Read, RelationshipDirection, RelationshipSelection, SchemaRead, SchemaWrite,
    Session, TokenWrite, Transaction, TransactionState, Write,
};
