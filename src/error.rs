//! Errors raised by the kernel API
//!
//! Missing entities are *not* errors on the read side: a seek for a
//! reference that does not exist simply leaves the cursor empty. Writes
//! against missing entities fail with [`KernelError::EntityNotFound`].

use thiserror::Error;

use crate::graph::token::TokenKind;
use crate::graph::{LabelId, NodeId, PropertyKeyId, PropertyValue, TxId};
use crate::index::IndexOrder;
use crate::kernel::locking::ResourceKey;

/// Coarse classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// API misuse; never retried
    Usage,
    /// Integrity rule rejected the operation
    ConstraintViolation,
    /// Lock wait exceeded; the whole transaction may be retried
    ConcurrencyTimeout,
    /// A write addressed an entity that is not visible
    EntityNotFound,
    /// Index or constraint definition problem
    Schema,
    /// The transaction could not complete as requested and was rolled back
    TransactionFailure,
    /// Invalid configuration
    Config,
}

/// Entity addressed by a failing write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Node(u64),
    Relationship(u64),
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityRef::Node(id) => write!(f, "node {}", id),
            EntityRef::Relationship(id) => write!(f, "relationship {}", id),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("Cursor is closed")]
    CursorClosed,

    #[error("Cursor is not positioned on an entity")]
    CursorNotPositioned,

    #[error("Cursor position was suspended from a different cursor")]
    ForeignCursorPosition,

    #[error("Transaction {0} is closed")]
    TransactionClosed(TxId),

    #[error("Transaction rolled back even though it was marked successful: it was also marked for failure")]
    TransactionMarkedBothSuccessAndFailure,

    #[error("Session is closed")]
    SessionClosed,

    #[error("Session still has {0} open transaction(s)")]
    SessionHasOpenTransactions(usize),

    #[error("{0} cursor(s) were not closed")]
    CursorsLeaked(usize),

    #[error("Illegal {0} name")]
    IllegalTokenName(TokenKind),

    #[error("Invalid authentication token")]
    InvalidAuthToken,

    #[error("Unable to load {0}: it does not exist")]
    EntityNotFound(EntityRef),

    #[error("Cannot delete node {node}, because it still has {degree} relationship(s)")]
    NodeHasRelationships { node: NodeId, degree: usize },

    #[error("Constraint already exists: unique ({label}, {property})")]
    ConstraintAlreadyExists { label: LabelId, property: PropertyKeyId },

    #[error("No such constraint: unique ({label}, {property})")]
    NoSuchConstraint { label: LabelId, property: PropertyKeyId },

    #[error("Existing data violates unique ({label}, {property}): nodes {first} and {second} share value {value}")]
    ConstraintValidationFailed {
        label: LabelId,
        property: PropertyKeyId,
        value: PropertyValue,
        first: NodeId,
        second: NodeId,
    },

    #[error("Node {existing} already has {label} with {property} = {value}")]
    UniquePropertyValueViolation {
        label: LabelId,
        property: PropertyKeyId,
        value: PropertyValue,
        existing: NodeId,
    },

    #[error("Index already exists on ({label}, {property})")]
    IndexAlreadyExists { label: LabelId, property: PropertyKeyId },

    #[error("No index on ({label}, {property})")]
    IndexNotFound { label: LabelId, property: PropertyKeyId },

    #[error("Index on ({label}, {property}) is not online yet")]
    IndexNotOnline { label: LabelId, property: PropertyKeyId },

    #[error("Index is owned by a constraint and cannot be dropped on its own")]
    IndexOwnedByConstraint,

    #[error("Index cannot provide {order:?} order for this query")]
    IndexOrderNotSupported { order: IndexOrder },

    #[error("Timed out after {timeout_ms}ms waiting for lock on {resource}")]
    LockTimeout { resource: ResourceKey, timeout_ms: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl KernelError {
    pub fn kind(&self) -> ErrorKind {
        use KernelError::*;
        match self {
            CursorClosed
            | CursorNotPositioned
            | ForeignCursorPosition
            | TransactionClosed(_)
            | SessionClosed
            | SessionHasOpenTransactions(_)
            | CursorsLeaked(_)
            | IllegalTokenName(_)
            | InvalidAuthToken => ErrorKind::Usage,
            TransactionMarkedBothSuccessAndFailure => ErrorKind::TransactionFailure,
            EntityNotFound(_) => ErrorKind::EntityNotFound,
            NodeHasRelationships { .. }
            | ConstraintAlreadyExists { .. }
            | ConstraintValidationFailed { .. }
            | UniquePropertyValueViolation { .. } => ErrorKind::ConstraintViolation,
            NoSuchConstraint { .. }
            | IndexAlreadyExists { .. }
            | IndexNotFound { .. }
            | IndexNotOnline { .. }
            | IndexOwnedByConstraint
            | IndexOrderNotSupported { .. } => ErrorKind::Schema,
            LockTimeout { .. } => ErrorKind::ConcurrencyTimeout,
            Config(_) => ErrorKind::Config,
        }
    }

    /// Whether retrying the whole transaction may succeed
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyTimeout
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
