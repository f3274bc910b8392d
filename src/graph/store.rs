//! In-memory committed graph storage
//!
//! The store holds only committed data. Transactions never mutate it
//! directly: they accumulate a [`TxState`] and the store applies it in one
//! step on commit, while the caller holds the store's write lock.
//!
//! Layout:
//! - nodes: NodeId -> NodeRecord (ordered, so scans can seek by reference)
//! - relationships: RelationshipId -> RelationshipRecord (ordered)
//! - adjacency: NodeId -> relationship groups by type and direction
//! - label_index: LabelId -> ordered set of NodeIds
//! - schema: online property indexes and uniqueness constraints

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

use super::node::NodeRecord;
use super::relationship::{NodeAdjacency, RelationshipRecord};
use super::types::{LabelId, NodeId, PropertyKeyId, RelTypeId, RelationshipId};
use crate::index::{PropertyIndex, SchemaStore};
use crate::kernel::txstate::TxState;

/// Snapshot of store sizes for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub relationship_count: usize,
    pub label_count: usize,
    pub relationship_type_count: usize,
    pub index_count: usize,
    pub constraint_count: usize,
    pub version: u64,
}

/// Committed property graph
#[derive(Debug)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, NodeRecord>,

    relationships: BTreeMap<RelationshipId, RelationshipRecord>,

    /// Relationship groups of each node that has relationships
    adjacency: FxHashMap<NodeId, NodeAdjacency>,

    /// Label index for label scans and counts
    label_index: FxHashMap<LabelId, BTreeSet<NodeId>>,

    /// Relationship count per type
    type_counts: FxHashMap<RelTypeId, usize>,

    schema: SchemaStore,

    /// Version of the last applied commit
    pub current_version: u64,

    // Allocated outside the write lock; references are never reused
    next_node_id: AtomicU64,
    next_relationship_id: AtomicU64,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        GraphStore {
            nodes: BTreeMap::new(),
            relationships: BTreeMap::new(),
            adjacency: FxHashMap::default(),
            label_index: FxHashMap::default(),
            type_counts: FxHashMap::default(),
            schema: SchemaStore::new(),
            current_version: 0,
            next_node_id: AtomicU64::new(0),
            next_relationship_id: AtomicU64::new(0),
        }
    }

    pub fn allocate_node_id(&self) -> NodeId {
        NodeId::new(self.next_node_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn allocate_relationship_id(&self) -> RelationshipId {
        RelationshipId::new(self.next_relationship_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn relationship(&self, id: RelationshipId) -> Option<&RelationshipRecord> {
        self.relationships.get(&id)
    }

    pub fn has_relationship(&self, id: RelationshipId) -> bool {
        self.relationships.contains_key(&id)
    }

    /// Nodes in reference order, starting after `after`
    pub fn nodes_after(&self, after: Option<NodeId>) -> impl DoubleEndedIterator<Item = &NodeRecord> + '_ {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        self.nodes.range((lower, Bound::Unbounded)).map(|(_, node)| node)
    }

    pub fn relationships_after(
        &self,
        after: Option<RelationshipId>,
    ) -> impl DoubleEndedIterator<Item = &RelationshipRecord> + '_ {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        self.relationships
            .range((lower, Bound::Unbounded))
            .map(|(_, rel)| rel)
    }

    pub fn adjacency(&self, node: NodeId) -> Option<&NodeAdjacency> {
        self.adjacency.get(&node)
    }

    pub fn labeled_nodes(&self, label: LabelId) -> Option<&BTreeSet<NodeId>> {
        self.label_index.get(&label)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn label_count(&self, label: LabelId) -> usize {
        self.label_index.get(&label).map_or(0, BTreeSet::len)
    }

    pub fn relationship_type_count(&self, rel_type: RelTypeId) -> usize {
        self.type_counts.get(&rel_type).copied().unwrap_or(0)
    }

    pub fn schema(&self) -> &SchemaStore {
        &self.schema
    }

    pub fn statistics(&self) -> GraphStatistics {
        GraphStatistics {
            node_count: self.nodes.len(),
            relationship_count: self.relationships.len(),
            label_count: self.label_index.values().filter(|nodes| !nodes.is_empty()).count(),
            relationship_type_count: self.type_counts.values().filter(|count| **count > 0).count(),
            index_count: self.schema.indexes().count(),
            constraint_count: self.schema.constraints().count(),
            version: self.current_version,
        }
    }

    /// Populate an index from committed data
    pub fn build_index(&self, label: LabelId, property: PropertyKeyId) -> PropertyIndex {
        let mut index = PropertyIndex::new();
        if let Some(nodes) = self.label_index.get(&label) {
            for id in nodes {
                if let Some(value) = self.nodes.get(id).and_then(|node| node.get_property(property)) {
                    index.insert(value.clone(), *id);
                }
            }
        }
        index
    }

    // ============================================================
    // Commit application
    // ============================================================

    /// Apply a validated transaction delta; returns the new commit version
    pub fn apply(&mut self, state: &TxState) -> u64 {
        let version = self.current_version + 1;
        let schema = state.schema();

        for constraint in &schema.constraints_dropped {
            self.schema.remove_constraint(*constraint);
        }
        for index in &schema.indexes_dropped {
            self.schema.remove_index(index.label, index.property);
        }

        for id in &state.deleted_relationships {
            self.remove_relationship(*id);
        }
        for id in &state.deleted_nodes {
            self.remove_node(*id);
        }

        for (id, record) in &state.created_nodes {
            let mut record = record.clone();
            record.version = version;
            for label in record.labels.iter() {
                self.label_index.entry(label).or_default().insert(*id);
            }
            self.schema
                .on_node_change(*id, None, Some((&record.labels, &record.properties)));
            self.nodes.insert(*id, record);
        }

        for (id, diff) in &state.node_diffs {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            let before = (node.labels.clone(), node.properties.clone());
            for label in &diff.labels_removed {
                node.labels = node.labels.without(*label);
                if let Some(nodes) = self.label_index.get_mut(label) {
                    nodes.remove(id);
                }
            }
            for label in &diff.labels_added {
                node.labels = node.labels.with(*label);
                self.label_index.entry(*label).or_default().insert(*id);
            }
            for (key, value) in &diff.properties {
                match value {
                    Some(value) => {
                        node.properties.insert(*key, value.clone());
                    }
                    None => {
                        node.properties.remove(key);
                    }
                }
            }
            node.version = version;
            self.schema.on_node_change(
                *id,
                Some((&before.0, &before.1)),
                Some((&node.labels, &node.properties)),
            );
        }

        for record in state.created_relationships.values() {
            let mut record = record.clone();
            record.version = version;
            self.insert_relationship(record);
        }

        for (id, diff) in &state.relationship_diffs {
            let Some(rel) = self.relationships.get_mut(id) else {
                continue;
            };
            for (key, value) in diff {
                match value {
                    Some(value) => {
                        rel.properties.insert(*key, value.clone());
                    }
                    None => {
                        rel.properties.remove(key);
                    }
                }
            }
            rel.version = version;
        }

        for index in &schema.indexes_created {
            let data = self.build_index(index.label, index.property);
            self.schema.add_index(*index, data);
        }
        for constraint in &schema.constraints_created {
            let data = self.build_index(constraint.label, constraint.property);
            self.schema.add_constraint(*constraint, data);
        }

        self.current_version = version;
        version
    }

    fn insert_relationship(&mut self, record: RelationshipRecord) {
        self.adjacency
            .entry(record.source)
            .or_default()
            .insert(record.source, &record);
        if !record.is_loop() {
            self.adjacency
                .entry(record.target)
                .or_default()
                .insert(record.target, &record);
        }
        *self.type_counts.entry(record.rel_type).or_insert(0) += 1;
        self.relationships.insert(record.id, record);
    }

    fn remove_relationship(&mut self, id: RelationshipId) {
        let Some(record) = self.relationships.remove(&id) else {
            return;
        };
        for node in [record.source, record.target] {
            if let Some(adjacency) = self.adjacency.get_mut(&node) {
                adjacency.remove(node, &record);
                if adjacency.is_empty() {
                    self.adjacency.remove(&node);
                }
            }
        }
        if let Some(count) = self.type_counts.get_mut(&record.rel_type) {
            *count = count.saturating_sub(1);
        }
    }

    fn remove_node(&mut self, id: NodeId) {
        let Some(record) = self.nodes.remove(&id) else {
            return;
        };
        for label in record.labels.iter() {
            if let Some(nodes) = self.label_index.get_mut(&label) {
                nodes.remove(&id);
            }
        }
        self.schema
            .on_node_change(id, Some((&record.labels, &record.properties)), None);
        self.adjacency.remove(&id);
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;
    use crate::index::IndexDescriptor;

    fn commit(store: &mut GraphStore, build: impl FnOnce(&GraphStore, &mut TxState)) -> u64 {
        let mut state = TxState::new();
        build(store, &mut state);
        store.apply(&state)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let store = GraphStore::new();
        let a = store.allocate_node_id();
        let b = store.allocate_node_id();
        assert!(b > a);
        assert_eq!(store.allocate_relationship_id(), RelationshipId::new(0));
    }

    #[test]
    fn test_apply_creates_and_indexes() {
        let mut store = GraphStore::new();
        let person = LabelId(0);
        let name = PropertyKeyId(0);
        let knows = RelTypeId(0);

        let mut ids = Vec::new();
        let version = commit(&mut store, |store, state| {
            for i in 0..3 {
                let id = store.allocate_node_id();
                state.node_create(id);
                state.node_add_label(id, person, false);
                state.node_set_property(id, name, Some(PropertyValue::Integer(i)), None);
                ids.push(id);
            }
            let rel = RelationshipRecord::new(store.allocate_relationship_id(), ids[0], knows, ids[1]);
            state.relationship_create(rel);
            state.schema_mut().indexes_created.insert(IndexDescriptor::new(person, name));
        });

        assert_eq!(version, 1);
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.label_count(person), 3);
        assert_eq!(store.relationship_type_count(knows), 1);
        assert_eq!(store.adjacency(ids[0]).unwrap().degree(), 1);
        assert_eq!(store.node(ids[2]).unwrap().version, 1);

        let index = store.schema().index(person, name).unwrap();
        assert_eq!(index.get(&PropertyValue::Integer(1)), vec![ids[1]]);
    }

    #[test]
    fn test_apply_deletes_and_diffs() {
        let mut store = GraphStore::new();
        let label = LabelId(1);
        let (a, b) = (store.allocate_node_id(), store.allocate_node_id());
        let rel_id = store.allocate_relationship_id();
        commit(&mut store, |_, state| {
            state.node_create(a);
            state.node_create(b);
            state.node_add_label(b, label, false);
            state.relationship_create(RelationshipRecord::new(rel_id, a, RelTypeId(0), b));
        });

        commit(&mut store, |_, state| {
            state.relationship_delete_committed(rel_id);
            state.node_delete_committed(a);
            state.node_remove_label(b, label, true);
        });

        assert!(!store.has_node(a));
        assert!(!store.has_relationship(rel_id));
        assert!(store.adjacency(b).is_none());
        assert_eq!(store.label_count(label), 0);
        assert!(!store.node(b).unwrap().has_label(label));
        assert_eq!(store.statistics().version, 2);
    }
}
