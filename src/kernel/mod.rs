//! Transactional kernel API
//!
//! - `session`: kernel handle, sessions and authentication
//! - `transaction`: transaction state machine
//! - `read` / `write`: the query and mutation surfaces
//! - `locking`: lock manager and per-transaction lock client
//! - `txstate` / `view` / `context`: uncommitted delta and the merged view

pub mod context;
pub mod locking;
pub mod read;
pub mod session;
pub mod transaction;
pub mod txstate;
pub mod view;
pub mod write;

pub use context::TxContext;
pub use locking::{LockClient, LockManager, LockMode, Locks, ResourceKey};
pub use read::{Read, RelationshipDirection, RelationshipSelection, SchemaRead};
pub use session::{AuthToken, Kernel, Session, SessionId};
pub use transaction::{Transaction, TransactionState};
pub use txstate::TxState;
pub use view::{PropertyEntry, PropertyOwner, RelationshipEntry, TxView};
pub use write::{SchemaWrite, TokenWrite, Write};
