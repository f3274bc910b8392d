//! Relationship group cursor: one step per relationship type on a node

use std::sync::Arc;

use super::traversal::{RelationshipTraversalCursor, TraversalScope};
use super::{Cursor, CursorCore, CursorHandle, CursorPosition};
use crate::error::KernelResult;
use crate::graph::{Direction, NodeId, RelTypeId};
use crate::kernel::context::TxContext;

pub type GroupPosition = CursorPosition<RelTypeId, NodeId>;

#[derive(Debug)]
pub struct RelationshipGroupCursor {
    core: CursorCore<RelTypeId, NodeId>,
}

impl RelationshipGroupCursor {
    pub(crate) fn new(handle: CursorHandle) -> Self {
        RelationshipGroupCursor {
            core: CursorCore::new(handle),
        }
    }

    pub(crate) fn reset(&mut self, handle: CursorHandle) {
        self.core.reset(handle);
    }

    pub(crate) fn bind(&mut self, ctx: &Arc<TxContext>, origin: NodeId) -> KernelResult<()> {
        self.core.bind(ctx, origin)
    }

    pub fn relationship_type(&self) -> RelTypeId {
        self.core.current().copied().unwrap_or(RelTypeId::NONE)
    }

    pub fn origin_node_reference(&self) -> NodeId {
        self.core.binding().copied().unwrap_or(NodeId::NONE)
    }

    fn count(&self, direction: Direction) -> usize {
        let origin = self.origin_node_reference();
        self.core
            .read_current(|view, rel_type| view.group_count(origin, *rel_type, direction))
            .unwrap_or(0)
    }

    pub fn outgoing_count(&self) -> usize {
        self.count(Direction::Outgoing)
    }

    pub fn incoming_count(&self) -> usize {
        self.count(Direction::Incoming)
    }

    pub fn loop_count(&self) -> usize {
        self.count(Direction::Loop)
    }

    pub fn total_count(&self) -> usize {
        let origin = self.origin_node_reference();
        self.core
            .read_current(|view, rel_type| {
                Direction::ALL
                    .iter()
                    .map(|direction| view.group_count(origin, *rel_type, *direction))
                    .sum()
            })
            .unwrap_or(0)
    }

    fn traverse(&self, direction: Direction, traversal: &mut RelationshipTraversalCursor) -> KernelResult<()> {
        let (ctx, rel_type) = self.core.positioned()?;
        let scope = TraversalScope::bucket(self.origin_node_reference(), *rel_type, direction);
        traversal.bind(ctx, scope)
    }

    pub fn outgoing(&self, traversal: &mut RelationshipTraversalCursor) -> KernelResult<()> {
        self.traverse(Direction::Outgoing, traversal)
    }

    pub fn incoming(&self, traversal: &mut RelationshipTraversalCursor) -> KernelResult<()> {
        self.traverse(Direction::Incoming, traversal)
    }

    pub fn loops(&self, traversal: &mut RelationshipTraversalCursor) -> KernelResult<()> {
        self.traverse(Direction::Loop, traversal)
    }
}

impl Cursor for RelationshipGroupCursor {
    type Position = GroupPosition;

    fn next(&mut self) -> KernelResult<bool> {
        self.core
            .advance(|view, origin, after| view.next_group(*origin, after.copied()))
    }

    core_lifecycle!();
}
