//! Node cursor: all-nodes scans and single-node lookups

use std::sync::Arc;

use super::group::RelationshipGroupCursor;
use super::property::PropertyCursor;
use super::traversal::{RelationshipTraversalCursor, TraversalScope};
use super::{Cursor, CursorCore, CursorHandle, CursorPosition, NodeIndexCursor};
use crate::error::KernelResult;
use crate::graph::{LabelId, LabelSet, NodeId, PropertyKeyId, PropertyValue};
use crate::kernel::context::TxContext;
use crate::kernel::view::PropertyOwner;

/// What a node cursor was populated with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeScan {
    All,
    Single(NodeId),
}

pub type NodePosition = CursorPosition<NodeId, NodeScan>;

#[derive(Debug)]
pub struct NodeCursor {
    core: CursorCore<NodeId, NodeScan>,
}

impl NodeCursor {
    pub(crate) fn new(handle: CursorHandle) -> Self {
        NodeCursor {
            core: CursorCore::new(handle),
        }
    }

    pub(crate) fn reset(&mut self, handle: CursorHandle) {
        self.core.reset(handle);
    }

    pub(crate) fn scan(&mut self, ctx: &Arc<TxContext>, scan: NodeScan) -> KernelResult<()> {
        self.core.bind(ctx, scan)
    }

    pub fn node_reference(&self) -> NodeId {
        self.core.current().copied().unwrap_or(NodeId::NONE)
    }

    /// Labels of the current node; empty when not positioned
    pub fn labels(&self) -> LabelSet {
        self.core
            .read_current(|view, id| view.node_labels(*id))
            .flatten()
            .unwrap_or_default()
    }

    pub fn has_label(&self, label: LabelId) -> bool {
        self.core
            .read_current(|view, id| view.node_has_label(*id, label))
            .unwrap_or(false)
    }

    pub fn property(&self, key: PropertyKeyId) -> Option<PropertyValue> {
        self.core
            .read_current(|view, id| view.node_property(*id, key))
            .flatten()
    }

    /// Visible relationships of the current node, loops counted once
    pub fn degree(&self) -> usize {
        self.core
            .read_current(|view, id| view.degree(*id))
            .unwrap_or(0)
    }

    /// Populate `groups` with the relationship groups of the current node
    pub fn relationships(&self, groups: &mut RelationshipGroupCursor) -> KernelResult<()> {
        let (ctx, id) = self.core.positioned()?;
        groups.bind(ctx, *id)
    }

    /// Populate `traversal` with every relationship of the current node
    pub fn all_relationships(&self, traversal: &mut RelationshipTraversalCursor) -> KernelResult<()> {
        let (ctx, id) = self.core.positioned()?;
        traversal.bind(ctx, TraversalScope::all(*id))
    }

    pub fn properties(&self, properties: &mut PropertyCursor) -> KernelResult<()> {
        let (ctx, id) = self.core.positioned()?;
        properties.bind(ctx, PropertyOwner::Node(*id))
    }
}

impl Cursor for NodeCursor {
    type Position = NodePosition;

    fn next(&mut self) -> KernelResult<bool> {
        self.core.advance(|view, scan, after| match scan {
            NodeScan::All => view.next_node(after.copied()),
            NodeScan::Single(id) => {
                if after.is_none() && view.node_exists(*id) {
                    Some(*id)
                } else {
                    None
                }
            }
        })
    }

    core_lifecycle!();
}

impl NodeIndexCursor for NodeCursor {
    fn node_reference(&self) -> NodeId {
        NodeCursor::node_reference(self)
    }
}
