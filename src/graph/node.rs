//! Committed node record

use super::labels::LabelSet;
use super::property::{PropertyMap, PropertyValue};
use super::types::{LabelId, NodeId, PropertyKeyId};
use serde::{Deserialize, Serialize};

/// A node as held by the committed store
///
/// Nodes carry an unordered set of label tokens (kept sorted internally) and
/// a property map keyed by property key token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Commit version that last touched this record
    pub version: u64,

    pub labels: LabelSet,

    pub properties: PropertyMap,
}

impl NodeRecord {
    pub fn new(id: NodeId) -> Self {
        NodeRecord {
            id,
            version: 0,
            labels: LabelSet::empty(),
            properties: PropertyMap::new(),
        }
    }

    pub fn has_label(&self, label: LabelId) -> bool {
        self.labels.contains(label)
    }

    pub fn get_property(&self, key: PropertyKeyId) -> Option<&PropertyValue> {
        self.properties.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_bare() {
        let node = NodeRecord::new(NodeId::new(7));
        assert_eq!(node.id, NodeId::new(7));
        assert!(node.labels.is_empty());
        assert!(node.properties.is_empty());
    }

    #[test]
    fn test_node_labels_and_properties() {
        let mut node = NodeRecord::new(NodeId::new(1));
        node.labels = node.labels.with(LabelId(3));
        node.properties.insert(PropertyKeyId(0), "Alice".into());

        assert!(node.has_label(LabelId(3)));
        assert!(!node.has_label(LabelId(4)));
        assert_eq!(
            node.get_property(PropertyKeyId(0)).and_then(|v| v.as_string()),
            Some("Alice")
        );
    }
}
