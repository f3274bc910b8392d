//! Committed schema: online indexes and uniqueness constraints
//!
//! Every uniqueness constraint owns an index on the same `(label, property)`
//! pair. Index contents are maintained by the store on commit through
//! [`SchemaStore::on_node_change`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::property_index::PropertyIndex;
use crate::graph::{LabelId, LabelSet, NodeId, PropertyKeyId, PropertyMap};

/// Definition of a schema index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub label: LabelId,
    pub property: PropertyKeyId,
    /// Owned by a uniqueness constraint
    pub unique: bool,
}

impl IndexDescriptor {
    pub fn new(label: LabelId, property: PropertyKeyId) -> Self {
        IndexDescriptor {
            label,
            property,
            unique: false,
        }
    }

    pub fn schema(&self) -> (LabelId, PropertyKeyId) {
        (self.label, self.property)
    }
}

impl fmt::Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.unique { "UNIQUE INDEX" } else { "INDEX" };
        write!(f, "{} ON :{}({})", kind, self.label.0, self.property.0)
    }
}

/// Visibility of an index to the transaction asking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexState {
    /// Committed and seekable
    Online,
    /// Created by the asking transaction, seekable once committed
    Populating,
}

/// Uniqueness constraint on `(label, property)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintDescriptor {
    pub label: LabelId,
    pub property: PropertyKeyId,
}

impl ConstraintDescriptor {
    pub fn unique(label: LabelId, property: PropertyKeyId) -> Self {
        ConstraintDescriptor { label, property }
    }

    pub fn owned_index(&self) -> IndexDescriptor {
        IndexDescriptor {
            label: self.label,
            property: self.property,
            unique: true,
        }
    }
}

impl fmt::Display for ConstraintDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CONSTRAINT ON :{}({}) IS UNIQUE", self.label.0, self.property.0)
    }
}

#[derive(Debug, Clone)]
struct OnlineIndex {
    descriptor: IndexDescriptor,
    data: PropertyIndex,
}

/// Online indexes and constraints of the committed store
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    indexes: BTreeMap<(LabelId, PropertyKeyId), OnlineIndex>,
    constraints: BTreeSet<ConstraintDescriptor>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self, label: LabelId, property: PropertyKeyId) -> Option<&PropertyIndex> {
        self.indexes.get(&(label, property)).map(|online| &online.data)
    }

    pub fn index_descriptor(&self, label: LabelId, property: PropertyKeyId) -> Option<IndexDescriptor> {
        self.indexes.get(&(label, property)).map(|online| online.descriptor)
    }

    pub fn indexes(&self) -> impl Iterator<Item = IndexDescriptor> + '_ {
        self.indexes.values().map(|online| online.descriptor)
    }

    pub fn constraint(&self, label: LabelId, property: PropertyKeyId) -> Option<ConstraintDescriptor> {
        let descriptor = ConstraintDescriptor::unique(label, property);
        self.constraints.contains(&descriptor).then_some(descriptor)
    }

    pub fn constraints(&self) -> impl Iterator<Item = ConstraintDescriptor> + '_ {
        self.constraints.iter().copied()
    }

    /// Bring an index online with already populated contents
    pub fn add_index(&mut self, descriptor: IndexDescriptor, data: PropertyIndex) {
        self.indexes
            .insert(descriptor.schema(), OnlineIndex { descriptor, data });
    }

    pub fn remove_index(&mut self, label: LabelId, property: PropertyKeyId) -> Option<IndexDescriptor> {
        self.indexes
            .remove(&(label, property))
            .map(|online| online.descriptor)
    }

    /// Register a constraint together with its populated owned index
    pub fn add_constraint(&mut self, constraint: ConstraintDescriptor, data: PropertyIndex) {
        self.constraints.insert(constraint);
        self.add_index(constraint.owned_index(), data);
    }

    pub fn remove_constraint(&mut self, constraint: ConstraintDescriptor) -> bool {
        if self.constraints.remove(&constraint) {
            self.remove_index(constraint.label, constraint.property);
            true
        } else {
            false
        }
    }

    /// Keep every index in step with a node's label/property change
    ///
    /// `before` is `None` for a created node, `after` is `None` for a
    /// deleted one.
    pub fn on_node_change(
        &mut self,
        node: NodeId,
        before: Option<(&LabelSet, &PropertyMap)>,
        after: Option<(&LabelSet, &PropertyMap)>,
    ) {
        for ((label, property), online) in self.indexes.iter_mut() {
            let entry = |state: Option<(&LabelSet, &PropertyMap)>| {
                state.and_then(|(labels, properties)| {
                    if labels.contains(*label) {
                        properties.get(property).cloned()
                    } else {
                        None
                    }
                })
            };
            let old = entry(before);
            let new = entry(after);
            let unchanged = match (&old, &new) {
                (Some(old), Some(new)) => old.is_identical(new),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                continue;
            }
            if let Some(old) = old {
                online.data.remove(&old, node);
            }
            if let Some(new) = new {
                online.data.insert(new, node);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyValue;

    #[test]
    fn test_constraint_owns_index() {
        let mut schema = SchemaStore::new();
        let constraint = ConstraintDescriptor::unique(LabelId(1), PropertyKeyId(2));
        schema.add_constraint(constraint, PropertyIndex::new());

        let index = schema.index_descriptor(LabelId(1), PropertyKeyId(2)).unwrap();
        assert!(index.unique);
        assert_eq!(schema.constraint(LabelId(1), PropertyKeyId(2)), Some(constraint));

        assert!(schema.remove_constraint(constraint));
        assert!(schema.index(LabelId(1), PropertyKeyId(2)).is_none());
        assert!(!schema.remove_constraint(constraint));
    }

    #[test]
    fn test_node_change_updates_index() {
        let mut schema = SchemaStore::new();
        let label = LabelId(0);
        let key = PropertyKeyId(0);
        schema.add_index(IndexDescriptor::new(label, key), PropertyIndex::new());

        let node = NodeId::new(1);
        let labelled = LabelSet::from_labels([label]);
        let mut props = PropertyMap::new();
        props.insert(key, PropertyValue::Integer(1));

        schema.on_node_change(node, None, Some((&labelled, &props)));
        assert_eq!(schema.index(label, key).unwrap().get(&PropertyValue::Integer(1)), vec![node]);

        // Losing the label removes the entry
        let bare = LabelSet::empty();
        schema.on_node_change(node, Some((&labelled, &props)), Some((&bare, &props)));
        assert!(schema.index(label, key).unwrap().is_empty());
    }
}
