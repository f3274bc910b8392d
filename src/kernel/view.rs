//! Read-your-writes view over the committed store and a transaction delta
//!
//! Every scan primitive here is a *seek-next*: given the last key a cursor
//! returned, find the smallest (or largest, for descending scans) visible
//! key strictly beyond it. Committed data and the delta are merged per
//! call, so entities created after a scan started still show up if the
//! scan has not passed them yet, and deleted entities are filtered out
//! whenever they would be revisited.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::ops::Bound;

use super::txstate::{PropertyDiff, TxState};
use crate::error::{KernelError, KernelResult};
use crate::graph::{
    Direction, GraphStore, LabelId, LabelSet, NodeAdjacency, NodeId, PropertyKeyId, PropertyMap,
    PropertyValue, RelTypeId, RelationshipGroupRecord, RelationshipId, RelationshipRecord,
};
use crate::index::{ConstraintDescriptor, IndexDescriptor, IndexEntry, IndexQuery, IndexState};

/// Immutable facts of a relationship; ordered by reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipEntry {
    pub id: RelationshipId,
    pub rel_type: RelTypeId,
    pub source: NodeId,
    pub target: NodeId,
}

impl RelationshipEntry {
    fn of(record: &RelationshipRecord) -> Self {
        RelationshipEntry {
            id: record.id,
            rel_type: record.rel_type,
            source: record.source,
            target: record.target,
        }
    }
}

/// One property of an entity; ordered by key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PropertyEntry {
    pub key: PropertyKeyId,
    pub value: PropertyValue,
}

/// Entity a property cursor reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyOwner {
    Node(NodeId),
    Relationship(RelationshipId),
}

pub(crate) fn pick<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if (a <= b) != descending { a } else { b }),
        (a, None) => a,
        (None, b) => b,
    }
}

fn first_in<T: Ord + Copy>(
    set: &BTreeSet<T>,
    from: Bound<T>,
    descending: bool,
    mut accept: impl FnMut(T) -> bool,
) -> Option<T> {
    if descending {
        set.range((Bound::Unbounded, from)).rev().copied().find(|t| accept(*t))
    } else {
        set.range((from, Bound::Unbounded)).copied().find(|t| accept(*t))
    }
}

fn merged_property(committed: &PropertyMap, diff: Option<&PropertyDiff>, key: PropertyKeyId) -> Option<PropertyValue> {
    match diff.and_then(|diff| diff.get(&key)) {
        Some(changed) => changed.clone(),
        None => committed.get(&key).cloned(),
    }
}

fn next_merged_property(
    committed: &PropertyMap,
    diff: Option<&PropertyDiff>,
    after: Option<PropertyKeyId>,
) -> Option<PropertyEntry> {
    let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
    let stored = committed
        .range((lower, Bound::Unbounded))
        .find(|(key, _)| diff.map_or(true, |diff| !diff.contains_key(*key)));
    let changed = diff.and_then(|diff| {
        diff.range((lower, Bound::Unbounded))
            .find_map(|(key, value)| value.as_ref().map(|value| (key, value)))
    });
    let (key, value) = match (stored, changed) {
        (Some(s), Some(c)) => {
            if s.0 <= c.0 {
                s
            } else {
                c
            }
        }
        (Some(s), None) => s,
        (None, Some(c)) => c,
        (None, None) => return None,
    };
    Some(PropertyEntry {
        key: *key,
        value: value.clone(),
    })
}

fn merge_all(committed: &PropertyMap, diff: Option<&PropertyDiff>) -> PropertyMap {
    let mut merged = committed.clone();
    if let Some(diff) = diff {
        for (key, value) in diff {
            match value {
                Some(value) => {
                    merged.insert(*key, value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
    }
    merged
}

/// Merged view of one transaction; built per call under the context locks
pub struct TxView<'a> {
    store: &'a GraphStore,
    tx: &'a TxState,
}

impl<'a> TxView<'a> {
    pub fn new(store: &'a GraphStore, tx: &'a TxState) -> Self {
        TxView { store, tx }
    }

    pub fn store(&self) -> &GraphStore {
        self.store
    }

    pub fn tx_state(&self) -> &TxState {
        self.tx
    }

    // ============================================================
    // Nodes
    // ============================================================

    pub fn node_exists(&self, id: NodeId) -> bool {
        self.tx.is_created_node(id) || (!self.tx.is_deleted_node(id) && self.store.has_node(id))
    }

    /// Next visible node in reference order
    pub fn next_node(&self, after: Option<NodeId>) -> Option<NodeId> {
        let committed = self
            .store
            .nodes_after(after)
            .map(|node| node.id)
            .find(|id| !self.tx.is_deleted_node(*id));
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        let created = self
            .tx
            .created_nodes
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(id, _)| *id);
        pick(committed, created, false)
    }

    pub fn node_labels(&self, id: NodeId) -> Option<LabelSet> {
        if let Some(record) = self.tx.created_nodes.get(&id) {
            return Some(record.labels.clone());
        }
        if self.tx.is_deleted_node(id) {
            return None;
        }
        let node = self.store.node(id)?;
        let Some(diff) = self.tx.node_diffs.get(&id) else {
            return Some(node.labels.clone());
        };
        let mut labels = node.labels.clone();
        for label in &diff.labels_removed {
            labels = labels.without(*label);
        }
        for label in &diff.labels_added {
            labels = labels.with(*label);
        }
        Some(labels)
    }

    pub fn node_has_label(&self, id: NodeId, label: LabelId) -> bool {
        if let Some(record) = self.tx.created_nodes.get(&id) {
            return record.has_label(label);
        }
        if self.tx.is_deleted_node(id) {
            return false;
        }
        let Some(node) = self.store.node(id) else {
            return false;
        };
        match self.tx.node_diffs.get(&id) {
            Some(diff) if diff.labels_added.contains(&label) => true,
            Some(diff) if diff.labels_removed.contains(&label) => false,
            _ => node.has_label(label),
        }
    }

    /// Whether the committed record (ignoring this transaction) has `label`
    pub fn committed_has_label(&self, id: NodeId, label: LabelId) -> bool {
        self.store.node(id).map_or(false, |node| node.has_label(label))
    }

    fn node_property_source(&self, id: NodeId) -> Option<(&PropertyMap, Option<&PropertyDiff>)> {
        if let Some(record) = self.tx.created_nodes.get(&id) {
            return Some((&record.properties, None));
        }
        if self.tx.is_deleted_node(id) {
            return None;
        }
        let node = self.store.node(id)?;
        let diff = self.tx.node_diffs.get(&id).map(|diff| &diff.properties);
        Some((&node.properties, diff))
    }

    pub fn node_property(&self, id: NodeId, key: PropertyKeyId) -> Option<PropertyValue> {
        let (committed, diff) = self.node_property_source(id)?;
        merged_property(committed, diff, key)
    }

    pub fn committed_node_property(&self, id: NodeId, key: PropertyKeyId) -> Option<&PropertyValue> {
        self.store.node(id).and_then(|node| node.get_property(key))
    }

    pub fn next_node_property(&self, id: NodeId, after: Option<PropertyKeyId>) -> Option<PropertyEntry> {
        let (committed, diff) = self.node_property_source(id)?;
        next_merged_property(committed, diff, after)
    }

    pub fn node_properties(&self, id: NodeId) -> Option<PropertyMap> {
        let (committed, diff) = self.node_property_source(id)?;
        Some(merge_all(committed, diff))
    }

    // ============================================================
    // Relationships
    // ============================================================

    pub fn relationship(&self, id: RelationshipId) -> Option<RelationshipEntry> {
        if let Some(record) = self.tx.created_relationships.get(&id) {
            return Some(RelationshipEntry::of(record));
        }
        if self.tx.is_deleted_relationship(id) {
            return None;
        }
        self.store.relationship(id).map(RelationshipEntry::of)
    }

    pub fn relationship_exists(&self, id: RelationshipId) -> bool {
        self.relationship(id).is_some()
    }

    pub fn next_relationship(&self, after: Option<RelationshipId>) -> Option<RelationshipEntry> {
        let committed = self
            .store
            .relationships_after(after)
            .find(|rel| !self.tx.is_deleted_relationship(rel.id))
            .map(RelationshipEntry::of);
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        let created = self
            .tx
            .created_relationships
            .range((lower, Bound::Unbounded))
            .next()
            .map(|(_, record)| RelationshipEntry::of(record));
        pick(committed, created, false)
    }

    fn relationship_property_source(&self, id: RelationshipId) -> Option<(&PropertyMap, Option<&PropertyDiff>)> {
        if let Some(record) = self.tx.created_relationships.get(&id) {
            return Some((&record.properties, None));
        }
        if self.tx.is_deleted_relationship(id) {
            return None;
        }
        let rel = self.store.relationship(id)?;
        Some((&rel.properties, self.tx.relationship_diffs.get(&id)))
    }

    pub fn relationship_property(&self, id: RelationshipId, key: PropertyKeyId) -> Option<PropertyValue> {
        let (committed, diff) = self.relationship_property_source(id)?;
        merged_property(committed, diff, key)
    }

    pub fn committed_relationship_property(&self, id: RelationshipId, key: PropertyKeyId) -> Option<&PropertyValue> {
        self.store.relationship(id).and_then(|rel| rel.get_property(key))
    }

    pub fn next_relationship_property(
        &self,
        id: RelationshipId,
        after: Option<PropertyKeyId>,
    ) -> Option<PropertyEntry> {
        let (committed, diff) = self.relationship_property_source(id)?;
        next_merged_property(committed, diff, after)
    }

    pub fn next_property(&self, owner: PropertyOwner, after: Option<PropertyKeyId>) -> Option<PropertyEntry> {
        match owner {
            PropertyOwner::Node(id) => self.next_node_property(id, after),
            PropertyOwner::Relationship(id) => self.next_relationship_property(id, after),
        }
    }

    // ============================================================
    // Relationship groups and traversal
    // ============================================================

    fn committed_group_visible(&self, group: &RelationshipGroupRecord) -> bool {
        Direction::ALL.iter().any(|direction| {
            group
                .bucket(*direction)
                .iter()
                .any(|id| !self.tx.is_deleted_relationship(*id))
        })
    }

    /// Next relationship type with at least one visible relationship on `node`
    pub fn next_group(&self, node: NodeId, after: Option<RelTypeId>) -> Option<RelTypeId> {
        if !self.node_exists(node) {
            return None;
        }
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        let committed = self.store.adjacency(node).and_then(|adjacency| {
            adjacency
                .groups
                .range((lower, Bound::Unbounded))
                .find(|(_, group)| self.committed_group_visible(group))
                .map(|(rel_type, _)| *rel_type)
        });
        let added = self.tx.added_adjacency.get(&node).and_then(|adjacency| {
            adjacency
                .groups
                .range((lower, Bound::Unbounded))
                .next()
                .map(|(rel_type, _)| *rel_type)
        });
        pick(committed, added, false)
    }

    pub fn group_count(&self, node: NodeId, rel_type: RelTypeId, direction: Direction) -> usize {
        let committed = self
            .store
            .adjacency(node)
            .and_then(|adjacency| adjacency.group(rel_type))
            .map_or(0, |group| {
                group
                    .bucket(direction)
                    .iter()
                    .filter(|id| !self.tx.is_deleted_relationship(**id))
                    .count()
            });
        let added = self
            .tx
            .added_adjacency
            .get(&node)
            .and_then(|adjacency| adjacency.group(rel_type))
            .map_or(0, |group| group.bucket(direction).len());
        committed + added
    }

    /// Visible relationships attached to `node`, loops counted once
    pub fn degree(&self, node: NodeId) -> usize {
        let committed = self.store.adjacency(node).map_or(0, |adjacency| {
            adjacency
                .groups
                .values()
                .flat_map(|group| Direction::ALL.iter().map(move |d| group.bucket(*d)))
                .flatten()
                .filter(|id| !self.tx.is_deleted_relationship(**id))
                .count()
        });
        let added = self
            .tx
            .added_adjacency
            .get(&node)
            .map_or(0, NodeAdjacency::degree);
        committed + added
    }

    /// Next relationship of `node` in reference order, restricted to the
    /// given types (all if `None`) and direction buckets
    pub fn next_relationship_of(
        &self,
        node: NodeId,
        types: Option<&[RelTypeId]>,
        directions: &[Direction],
        after: Option<RelationshipId>,
    ) -> Option<RelationshipEntry> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        let type_selected = |rel_type: &RelTypeId| types.map_or(true, |types| types.contains(rel_type));
        let mut best: Option<RelationshipId> = None;

        if let Some(adjacency) = self.store.adjacency(node) {
            for (_, group) in adjacency.groups.iter().filter(|(t, _)| type_selected(*t)) {
                for direction in directions {
                    let found = group
                        .bucket(*direction)
                        .range((lower, Bound::Unbounded))
                        .find(|id| !self.tx.is_deleted_relationship(**id))
                        .copied();
                    best = pick(best, found, false);
                }
            }
        }
        if let Some(adjacency) = self.tx.added_adjacency.get(&node) {
            for (_, group) in adjacency.groups.iter().filter(|(t, _)| type_selected(*t)) {
                for direction in directions {
                    let found = group
                        .bucket(*direction)
                        .range((lower, Bound::Unbounded))
                        .next()
                        .copied();
                    best = pick(best, found, false);
                }
            }
        }
        best.and_then(|id| self.relationship(id))
    }

    // ============================================================
    // Label and value indexes
    // ============================================================

    /// First node carrying `label` at or beyond `from` in scan direction
    pub fn seek_labeled(&self, label: LabelId, from: Bound<NodeId>, descending: bool) -> Option<NodeId> {
        let removed = self.tx.label_removed.get(&label);
        let committed = self.store.labeled_nodes(label).and_then(|nodes| {
            first_in(nodes, from, descending, |id| {
                !self.tx.is_deleted_node(id) && removed.map_or(true, |removed| !removed.contains(&id))
            })
        });
        let added = self
            .tx
            .label_added
            .get(&label)
            .and_then(|nodes| first_in(nodes, from, descending, |_| true));
        pick(committed, added, descending)
    }

    /// Next entry of the `(label, property)` index matching `query`
    ///
    /// Committed entries of nodes this transaction touched are hidden and
    /// re-evaluated against their current labels and properties.
    pub fn next_index_entry(
        &self,
        label: LabelId,
        property: PropertyKeyId,
        query: &IndexQuery,
        after: Option<&IndexEntry>,
        descending: bool,
    ) -> Option<IndexEntry> {
        let committed = self.store.schema().index(label, property).and_then(|index| {
            index.seek(query, after, descending, |(_, node)| {
                self.tx.is_deleted_node(*node) || self.tx.node_diffs.contains_key(node)
            })
        });

        let mut changed: Option<IndexEntry> = None;
        for node in self.tx.touched_nodes() {
            if !self.node_has_label(node, label) {
                continue;
            }
            let Some(value) = self.node_property(node, property) else {
                continue;
            };
            if !query.matches(&value) {
                continue;
            }
            let entry = (value, node);
            let beyond = match after {
                None => true,
                Some(after) if descending => &entry < after,
                Some(after) => &entry > after,
            };
            if beyond {
                changed = pick(changed, Some(entry), descending);
            }
        }
        pick(committed, changed, descending)
    }

    // ============================================================
    // Counts
    // ============================================================

    pub fn count_nodes(&self, label: Option<LabelId>) -> usize {
        match label {
            None => (self.store.node_count() + self.tx.created_nodes.len())
                .saturating_sub(self.tx.deleted_nodes.len()),
            Some(label) => {
                let deleted = self
                    .tx
                    .deleted_nodes
                    .iter()
                    .filter(|id| self.committed_has_label(**id, label))
                    .count();
                let removed = self.tx.label_removed.get(&label).map_or(0, |nodes| nodes.len());
                let added = self.tx.label_added.get(&label).map_or(0, BTreeSet::len);
                (self.store.label_count(label) + added).saturating_sub(deleted + removed)
            }
        }
    }

    pub fn count_relationships(&self, rel_type: Option<RelTypeId>) -> usize {
        let selected = |t: RelTypeId| rel_type.map_or(true, |wanted| wanted == t);
        let committed = match rel_type {
            None => self.store.relationship_count(),
            Some(rel_type) => self.store.relationship_type_count(rel_type),
        };
        let created = self
            .tx
            .created_relationships
            .values()
            .filter(|rel| selected(rel.rel_type))
            .count();
        let deleted = self
            .tx
            .deleted_relationships
            .iter()
            .filter_map(|id| self.store.relationship(*id))
            .filter(|rel| selected(rel.rel_type))
            .count();
        (committed + created).saturating_sub(deleted)
    }

    // ============================================================
    // Schema
    // ============================================================

    pub fn index(&self, label: LabelId, property: PropertyKeyId) -> Option<(IndexDescriptor, IndexState)> {
        let pending = self.tx.schema();
        if let Some(index) = pending
            .indexes_created
            .iter()
            .find(|index| index.schema() == (label, property))
        {
            return Some((*index, IndexState::Populating));
        }
        let constraint = ConstraintDescriptor::unique(label, property);
        if pending.constraints_created.contains(&constraint) {
            return Some((constraint.owned_index(), IndexState::Populating));
        }
        let index = self.store.schema().index_descriptor(label, property)?;
        let dropped = pending.indexes_dropped.contains(&index)
            || (index.unique && pending.constraints_dropped.contains(&constraint));
        if dropped {
            None
        } else {
            Some((index, IndexState::Online))
        }
    }

    pub fn indexes(&self) -> Vec<(IndexDescriptor, IndexState)> {
        let mut all: Vec<(IndexDescriptor, IndexState)> = self
            .store
            .schema()
            .indexes()
            .filter_map(|index| self.index(index.label, index.property))
            .collect();
        let pending = self.tx.schema();
        all.extend(pending.indexes_created.iter().map(|index| (*index, IndexState::Populating)));
        all.extend(
            pending
                .constraints_created
                .iter()
                .map(|constraint| (constraint.owned_index(), IndexState::Populating)),
        );
        all.sort();
        all.dedup();
        all
    }

    pub fn constraint(&self, label: LabelId, property: PropertyKeyId) -> Option<ConstraintDescriptor> {
        let constraint = ConstraintDescriptor::unique(label, property);
        let pending = self.tx.schema();
        if pending.constraints_created.contains(&constraint) {
            return Some(constraint);
        }
        self.store
            .schema()
            .constraint(label, property)
            .filter(|constraint| !pending.constraints_dropped.contains(constraint))
    }

    pub fn constraints(&self) -> Vec<ConstraintDescriptor> {
        let pending = self.tx.schema();
        let mut all: Vec<ConstraintDescriptor> = self
            .store
            .schema()
            .constraints()
            .filter(|constraint| !pending.constraints_dropped.contains(constraint))
            .chain(pending.constraints_created.iter().copied())
            .collect();
        all.sort();
        all.dedup();
        all
    }

    // ============================================================
    // Uniqueness
    // ============================================================

    /// Another visible node carrying `label` with `property == value`
    pub fn find_duplicate(
        &self,
        label: LabelId,
        property: PropertyKeyId,
        value: &PropertyValue,
        except: NodeId,
    ) -> Option<NodeId> {
        let untouched = |id: &NodeId| {
            *id != except && !self.tx.is_deleted_node(*id) && !self.tx.node_diffs.contains_key(id)
        };
        let committed = match self.store.schema().index(label, property) {
            Some(index) => index.get(value).into_iter().find(|id| untouched(id)),
            None => self.store.labeled_nodes(label).and_then(|nodes| {
                nodes.iter().copied().find(|id| {
                    untouched(id) && self.committed_node_property(*id, property) == Some(value)
                })
            }),
        };
        committed.or_else(|| {
            self.tx.touched_nodes().find(|id| {
                *id != except
                    && self.node_has_label(*id, label)
                    && self.node_property(*id, property).as_ref() == Some(value)
            })
        })
    }

    /// Fail if a uniqueness constraint covers `(label, property)` and another
    /// node already carries `value`
    pub fn check_unique(
        &self,
        node: NodeId,
        label: LabelId,
        property: PropertyKeyId,
        value: &PropertyValue,
    ) -> KernelResult<()> {
        if self.constraint(label, property).is_none() {
            return Ok(());
        }
        match self.find_duplicate(label, property, value, node) {
            Some(existing) => Err(KernelError::UniquePropertyValueViolation {
                label,
                property,
                value: value.clone(),
                existing,
            }),
            None => Ok(()),
        }
    }

    /// Verify that visible data satisfies a uniqueness constraint
    pub fn validate_constraint(&self, label: LabelId, property: PropertyKeyId) -> KernelResult<()> {
        let mut seen: FxHashMap<PropertyValue, NodeId> = FxHashMap::default();
        let mut from = Bound::Unbounded;
        while let Some(node) = self.seek_labeled(label, from, false) {
            from = Bound::Excluded(node);
            let Some(value) = self.node_property(node, property) else {
                continue;
            };
            if let Some(first) = seen.get(&value) {
                return Err(KernelError::ConstraintValidationFailed {
                    label,
                    property,
                    value,
                    first: *first,
                    second: node,
                });
            }
            seen.insert(value, node);
        }
        Ok(())
    }

    /// Re-check every uniqueness constraint the commit could break
    pub fn validate_commit(&self) -> KernelResult<()> {
        for constraint in self.constraints() {
            if self.tx.schema().constraints_created.contains(&constraint) {
                self.validate_constraint(constraint.label, constraint.property)?;
                continue;
            }
            for node in self.tx.touched_nodes() {
                if !self.node_has_label(node, constraint.label) {
                    continue;
                }
                let Some(value) = self.node_property(node, constraint.property) else {
                    continue;
                };
                if let Some(existing) =
                    self.find_duplicate(constraint.label, constraint.property, &value, node)
                {
                    return Err(KernelError::UniquePropertyValueViolation {
                        label: constraint.label,
                        property: constraint.property,
                        value,
                        existing,
                    });
                }
            }
        }
        Ok(())
    }
}
