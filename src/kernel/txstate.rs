//! Uncommitted transaction delta
//!
//! Tracks everything a transaction changed relative to the committed store:
//! created and deleted entities, label and property diffs of committed
//! nodes and relationships, adjacency of created relationships, per-label
//! membership changes and pending schema changes.
//!
//! Entities created in the transaction are held as full records; deleting
//! one simply forgets it. Committed entities are described by diffs that
//! the store applies on commit.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};

use crate::graph::{
    LabelId, NodeAdjacency, NodeId, NodeRecord, PropertyKeyId, PropertyMap, PropertyValue,
    RelationshipId, RelationshipRecord,
};
use crate::index::{ConstraintDescriptor, IndexDescriptor};

/// Property changes keyed by property key; `None` marks a removal
pub type PropertyDiff = BTreeMap<PropertyKeyId, Option<PropertyValue>>;

/// Label and property changes of one committed node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDiff {
    pub labels_added: BTreeSet<LabelId>,
    pub labels_removed: BTreeSet<LabelId>,
    pub properties: PropertyDiff,
}

impl NodeDiff {
    pub fn is_empty(&self) -> bool {
        self.labels_added.is_empty() && self.labels_removed.is_empty() && self.properties.is_empty()
    }
}

/// Pending index and constraint changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaChanges {
    pub indexes_created: BTreeSet<IndexDescriptor>,
    pub indexes_dropped: BTreeSet<IndexDescriptor>,
    pub constraints_created: BTreeSet<ConstraintDescriptor>,
    pub constraints_dropped: BTreeSet<ConstraintDescriptor>,
}

impl SchemaChanges {
    pub fn is_empty(&self) -> bool {
        self.indexes_created.is_empty()
            && self.indexes_dropped.is_empty()
            && self.constraints_created.is_empty()
            && self.constraints_dropped.is_empty()
    }
}

fn set_property(diff: &mut PropertyDiff, key: PropertyKeyId, value: Option<PropertyValue>, committed: Option<&PropertyValue>) {
    let unchanged = match (&value, committed) {
        (Some(value), Some(committed)) => value.is_identical(committed),
        (None, None) => true,
        _ => false,
    };
    if unchanged {
        diff.remove(&key);
    } else {
        diff.insert(key, value);
    }
}

fn apply_to_record(properties: &mut PropertyMap, key: PropertyKeyId, value: Option<PropertyValue>) {
    match value {
        Some(value) => {
            properties.insert(key, value);
        }
        None => {
            properties.remove(&key);
        }
    }
}

#[derive(Debug, Default)]
pub struct TxState {
    pub(crate) created_nodes: BTreeMap<NodeId, NodeRecord>,
    /// Committed nodes deleted by this transaction
    pub(crate) deleted_nodes: FxHashSet<NodeId>,
    pub(crate) node_diffs: FxHashMap<NodeId, NodeDiff>,
    pub(crate) created_relationships: BTreeMap<RelationshipId, RelationshipRecord>,
    /// Committed relationships deleted by this transaction
    pub(crate) deleted_relationships: FxHashSet<RelationshipId>,
    pub(crate) relationship_diffs: FxHashMap<RelationshipId, PropertyDiff>,
    /// Groups of relationships created by this transaction, per endpoint
    pub(crate) added_adjacency: FxHashMap<NodeId, NodeAdjacency>,
    /// Nodes that gained a label here (created nodes included)
    pub(crate) label_added: FxHashMap<LabelId, BTreeSet<NodeId>>,
    /// Live committed nodes that lost a label here
    pub(crate) label_removed: FxHashMap<LabelId, FxHashSet<NodeId>>,
    pub(crate) schema: SchemaChanges,
}

impl TxState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_changes(&self) -> bool {
        !self.created_nodes.is_empty()
            || !self.deleted_nodes.is_empty()
            || self.node_diffs.values().any(|diff| !diff.is_empty())
            || !self.created_relationships.is_empty()
            || !self.deleted_relationships.is_empty()
            || self.relationship_diffs.values().any(|diff| !diff.is_empty())
            || !self.schema.is_empty()
    }

    pub fn clear(&mut self) {
        *self = TxState::default();
    }

    pub fn is_created_node(&self, id: NodeId) -> bool {
        self.created_nodes.contains_key(&id)
    }

    pub fn is_deleted_node(&self, id: NodeId) -> bool {
        self.deleted_nodes.contains(&id)
    }

    pub fn is_created_relationship(&self, id: RelationshipId) -> bool {
        self.created_relationships.contains_key(&id)
    }

    pub fn is_deleted_relationship(&self, id: RelationshipId) -> bool {
        self.deleted_relationships.contains(&id)
    }

    /// Nodes whose visible labels or properties may differ from the store
    pub fn touched_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.created_nodes.keys().chain(self.node_diffs.keys()).copied()
    }

    pub fn schema(&self) -> &SchemaChanges {
        &self.schema
    }

    pub(crate) fn schema_mut(&mut self) -> &mut SchemaChanges {
        &mut self.schema
    }

    // ---- nodes ----

    pub fn node_create(&mut self, id: NodeId) {
        self.created_nodes.insert(id, NodeRecord::new(id));
    }

    /// Forget a node created by this transaction
    pub fn node_delete_created(&mut self, id: NodeId) -> bool {
        let Some(record) = self.created_nodes.remove(&id) else {
            return false;
        };
        for label in record.labels.iter() {
            if let Some(nodes) = self.label_added.get_mut(&label) {
                nodes.remove(&id);
            }
        }
        true
    }

    pub fn node_delete_committed(&mut self, id: NodeId) {
        self.deleted_nodes.insert(id);
        if let Some(diff) = self.node_diffs.remove(&id) {
            for label in diff.labels_added {
                if let Some(nodes) = self.label_added.get_mut(&label) {
                    nodes.remove(&id);
                }
            }
            for label in diff.labels_removed {
                if let Some(nodes) = self.label_removed.get_mut(&label) {
                    nodes.remove(&id);
                }
            }
        }
    }

    /// Add a label the node does not currently carry
    ///
    /// `committed_has` says whether the committed record carries it; it is
    /// ignored for nodes created in this transaction.
    pub fn node_add_label(&mut self, id: NodeId, label: LabelId, committed_has: bool) {
        if let Some(record) = self.created_nodes.get_mut(&id) {
            record.labels = record.labels.with(label);
            self.label_added.entry(label).or_default().insert(id);
            return;
        }
        let diff = self.node_diffs.entry(id).or_default();
        if committed_has {
            diff.labels_removed.remove(&label);
            if let Some(nodes) = self.label_removed.get_mut(&label) {
                nodes.remove(&id);
            }
        } else {
            diff.labels_added.insert(label);
            self.label_added.entry(label).or_default().insert(id);
        }
    }

    /// Remove a label the node currently carries
    pub fn node_remove_label(&mut self, id: NodeId, label: LabelId, committed_has: bool) {
        if let Some(record) = self.created_nodes.get_mut(&id) {
            record.labels = record.labels.without(label);
            if let Some(nodes) = self.label_added.get_mut(&label) {
                nodes.remove(&id);
            }
            return;
        }
        let diff = self.node_diffs.entry(id).or_default();
        if committed_has {
            diff.labels_removed.insert(label);
            self.label_removed.entry(label).or_default().insert(id);
        } else {
            diff.labels_added.remove(&label);
            if let Some(nodes) = self.label_added.get_mut(&label) {
                nodes.remove(&id);
            }
        }
    }

    /// Set (`Some`) or remove (`None`) a node property
    pub fn node_set_property(
        &mut self,
        id: NodeId,
        key: PropertyKeyId,
        value: Option<PropertyValue>,
        committed: Option<&PropertyValue>,
    ) {
        if let Some(record) = self.created_nodes.get_mut(&id) {
            apply_to_record(&mut record.properties, key, value);
            return;
        }
        let diff = self.node_diffs.entry(id).or_default();
        set_property(&mut diff.properties, key, value, committed);
    }

    // ---- relationships ----

    pub fn relationship_create(&mut self, record: RelationshipRecord) {
        self.added_adjacency
            .entry(record.source)
            .or_default()
            .insert(record.source, &record);
        if !record.is_loop() {
            self.added_adjacency
                .entry(record.target)
                .or_default()
                .insert(record.target, &record);
        }
        self.created_relationships.insert(record.id, record);
    }

    pub fn relationship_delete_created(&mut self, id: RelationshipId) -> bool {
        let Some(record) = self.created_relationships.remove(&id) else {
            return false;
        };
        for node in [record.source, record.target] {
            if let Some(adjacency) = self.added_adjacency.get_mut(&node) {
                adjacency.remove(node, &record);
                if adjacency.is_empty() {
                    self.added_adjacency.remove(&node);
                }
            }
        }
        true
    }

    pub fn relationship_delete_committed(&mut self, id: RelationshipId) {
        self.deleted_relationships.insert(id);
        self.relationship_diffs.remove(&id);
    }

    pub fn relationship_set_property(
        &mut self,
        id: RelationshipId,
        key: PropertyKeyId,
        value: Option<PropertyValue>,
        committed: Option<&PropertyValue>,
    ) {
        if let Some(record) = self.created_relationships.get_mut(&id) {
            apply_to_record(&mut record.properties, key, value);
            return;
        }
        let diff = self.relationship_diffs.entry(id).or_default();
        set_property(diff, key, value, committed);
    }
}
