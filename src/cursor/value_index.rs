//! Value index cursor over one `(label, property)` index

use std::sync::Arc;

use super::node::{NodeCursor, NodeScan};
use super::{Cursor, CursorCore, CursorHandle, CursorPosition, NodeIndexCursor, NO_VALUE};
use crate::error::KernelResult;
use crate::graph::{LabelId, NodeId, PropertyKeyId, PropertyValue};
use crate::index::{IndexEntry, IndexOrder, IndexQuery};
use crate::kernel::context::TxContext;

/// A seek or scan against an online index
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSeek {
    pub label: LabelId,
    pub property: PropertyKeyId,
    pub query: IndexQuery,
    pub order: IndexOrder,
}

pub type ValuePosition = CursorPosition<IndexEntry, ValueSeek>;

/// Results are ordered by `(value, node)`; with [`IndexOrder::None`] the
/// order is ascending.
#[derive(Debug)]
pub struct NodeValueIndexCursor {
    core: CursorCore<IndexEntry, ValueSeek>,
}

impl NodeValueIndexCursor {
    pub(crate) fn new(handle: CursorHandle) -> Self {
        NodeValueIndexCursor {
            core: CursorCore::new(handle),
        }
    }

    pub(crate) fn reset(&mut self, handle: CursorHandle) {
        self.core.reset(handle);
    }

    pub(crate) fn seek(&mut self, ctx: &Arc<TxContext>, seek: ValueSeek) -> KernelResult<()> {
        self.core.bind(ctx, seek)
    }

    pub fn node_reference(&self) -> NodeId {
        self.core.current().map_or(NodeId::NONE, |(_, node)| *node)
    }

    /// Indexed value of the current node
    pub fn property_value(&self) -> &PropertyValue {
        self.core.current().map_or(&NO_VALUE, |(value, _)| value)
    }

    pub fn node(&self, nodes: &mut NodeCursor) -> KernelResult<()> {
        let (ctx, (_, node)) = self.core.positioned()?;
        nodes.scan(ctx, NodeScan::Single(*node))
    }
}

impl Cursor for NodeValueIndexCursor {
    type Position = ValuePosition;

    fn next(&mut self) -> KernelResult<bool> {
        self.core.advance(|view, seek, after| {
            view.next_index_entry(
                seek.label,
                seek.property,
                &seek.query,
                after,
                seek.order.is_descending(),
            )
        })
    }

    core_lifecycle!();
}

impl NodeIndexCursor for NodeValueIndexCursor {
    fn node_reference(&self) -> NodeId {
        NodeValueIndexCursor::node_reference(self)
    }
}
