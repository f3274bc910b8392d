//! Core identifier and token types for the kernel API

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable reference to a node
///
/// References are allocated monotonically by the store and never reused, so
/// cursors may treat them as ordered keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Sentinel returned by accessors of a cursor that is not positioned
    pub const NONE: NodeId = NodeId(u64::MAX);

    pub fn new(id: u64) -> Self {
        NodeId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        NodeId(id)
    }
}

/// Stable reference to a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RelationshipId(pub u64);

impl RelationshipId {
    /// Sentinel returned by accessors of a cursor that is not positioned
    pub const NONE: RelationshipId = RelationshipId(u64::MAX);

    pub fn new(id: u64) -> Self {
        RelationshipId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationshipId({})", self.0)
    }
}

impl From<u64> for RelationshipId {
    fn from(id: u64) -> Self {
        RelationshipId(id)
    }
}

/// Interned label token (e.g. "Person")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct LabelId(pub u32);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LabelId({})", self.0)
    }
}

/// Interned relationship type token (e.g. "KNOWS")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct RelTypeId(pub u32);

impl RelTypeId {
    pub const NONE: RelTypeId = RelTypeId(u32::MAX);
}

impl fmt::Display for RelTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelTypeId({})", self.0)
    }
}

/// Interned property key token (e.g. "name")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct PropertyKeyId(pub u32);

impl PropertyKeyId {
    pub const NONE: PropertyKeyId = PropertyKeyId(u32::MAX);
}

impl fmt::Display for PropertyKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyKeyId({})", self.0)
    }
}

/// Transaction identifier, also used as lock owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self.0)
    }
}

/// Direction of a relationship relative to the node it is traversed from
///
/// `Loop` covers relationships whose source and target are the same node;
/// such relationships never show up as `Outgoing` or `Incoming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Loop,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Outgoing, Direction::Incoming, Direction::Loop];

    /// Direction of a relationship `(source, target)` as seen from `origin`
    pub fn of(origin: NodeId, source: NodeId, target: NodeId) -> Option<Direction> {
        match (source == origin, target == origin) {
            (true, true) => Some(Direction::Loop),
            (true, false) => Some(Direction::Outgoing),
            (false, true) => Some(Direction::Incoming),
            (false, false) => None,
        }
    }
}
