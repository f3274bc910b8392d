//! Committed relationship record and per-node relationship groups
//!
//! Implements the grouping of a node's relationships by type and direction.
//! The store keeps one [`NodeAdjacency`] per node; each relationship type
//! present on the node owns a [`RelationshipGroupRecord`] with three buckets.

use super::property::{PropertyMap, PropertyValue};
use super::types::{Direction, NodeId, PropertyKeyId, RelTypeId, RelationshipId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A directed relationship in the committed store
///
/// Type and endpoints are immutable once created; `source == target`
/// denotes a loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub id: RelationshipId,

    /// Source node (relationship goes FROM this node)
    pub source: NodeId,

    /// Target node (relationship goes TO this node)
    pub target: NodeId,

    pub rel_type: RelTypeId,

    pub properties: PropertyMap,

    /// Commit version that last touched this record
    pub version: u64,
}

impl RelationshipRecord {
    pub fn new(id: RelationshipId, source: NodeId, rel_type: RelTypeId, target: NodeId) -> Self {
        RelationshipRecord {
            id,
            source,
            target,
            rel_type,
            properties: PropertyMap::new(),
            version: 0,
        }
    }

    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }

    /// The endpoint that is not `node` (the node itself for loops)
    pub fn other_node(&self, node: NodeId) -> NodeId {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }

    pub fn get_property(&self, key: PropertyKeyId) -> Option<&PropertyValue> {
        self.properties.get(&key)
    }
}

/// Outgoing / incoming / loop buckets of one relationship type on one node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGroupRecord {
    pub outgoing: BTreeSet<RelationshipId>,
    pub incoming: BTreeSet<RelationshipId>,
    pub loops: BTreeSet<RelationshipId>,
}

impl RelationshipGroupRecord {
    pub fn bucket(&self, direction: Direction) -> &BTreeSet<RelationshipId> {
        match direction {
            Direction::Outgoing => &self.outgoing,
            Direction::Incoming => &self.incoming,
            Direction::Loop => &self.loops,
        }
    }

    pub fn bucket_mut(&mut self, direction: Direction) -> &mut BTreeSet<RelationshipId> {
        match direction {
            Direction::Outgoing => &mut self.outgoing,
            Direction::Incoming => &mut self.incoming,
            Direction::Loop => &mut self.loops,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty() && self.loops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.outgoing.len() + self.incoming.len() + self.loops.len()
    }
}

/// All relationship groups of a single node, ordered by type token
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAdjacency {
    pub groups: BTreeMap<RelTypeId, RelationshipGroupRecord>,
}

impl NodeAdjacency {
    /// Register `rel` on the node `node` (one of its endpoints)
    pub fn insert(&mut self, node: NodeId, rel: &RelationshipRecord) {
        if let Some(direction) = Direction::of(node, rel.source, rel.target) {
            self.groups
                .entry(rel.rel_type)
                .or_default()
                .bucket_mut(direction)
                .insert(rel.id);
        }
    }

    pub fn remove(&mut self, node: NodeId, rel: &RelationshipRecord) {
        if let Some(direction) = Direction::of(node, rel.source, rel.target) {
            if let Some(group) = self.groups.get_mut(&rel.rel_type) {
                group.bucket_mut(direction).remove(&rel.id);
                if group.is_empty() {
                    self.groups.remove(&rel.rel_type);
                }
            }
        }
    }

    pub fn group(&self, rel_type: RelTypeId) -> Option<&RelationshipGroupRecord> {
        self.groups.get(&rel_type)
    }

    pub fn degree(&self) -> usize {
        self.groups.values().map(RelationshipGroupRecord::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_node() {
        let rel = RelationshipRecord::new(RelationshipId::new(1), NodeId::new(1), RelTypeId(0), NodeId::new(2));
        assert_eq!(rel.other_node(NodeId::new(1)), NodeId::new(2));
        assert_eq!(rel.other_node(NodeId::new(2)), NodeId::new(1));
        assert!(!rel.is_loop());
    }

    #[test]
    fn test_adjacency_buckets() {
        let a = NodeId::new(1);
        let b = NodeId::new(2);
        let knows = RelTypeId(0);
        let out = RelationshipRecord::new(RelationshipId::new(10), a, knows, b);
        let inc = RelationshipRecord::new(RelationshipId::new(11), b, knows, a);
        let lp = RelationshipRecord::new(RelationshipId::new(12), a, knows, a);

        let mut adjacency = NodeAdjacency::default();
        adjacency.insert(a, &out);
        adjacency.insert(a, &inc);
        adjacency.insert(a, &lp);

        let group = adjacency.group(knows).unwrap();
        assert_eq!(group.outgoing.len(), 1);
        assert_eq!(group.incoming.len(), 1);
        assert_eq!(group.loops.len(), 1);
        assert_eq!(adjacency.degree(), 3);

        adjacency.remove(a, &out);
        adjacency.remove(a, &inc);
        adjacency.remove(a, &lp);
        assert!(adjacency.is_empty());
    }

    #[test]
    fn test_unrelated_node_is_ignored() {
        let rel = RelationshipRecord::new(RelationshipId::new(1), NodeId::new(1), RelTypeId(0), NodeId::new(2));
        let mut adjacency = NodeAdjacency::default();
        adjacency.insert(NodeId::new(3), &rel);
        assert!(adjacency.is_empty());
    }
}
