//! In-memory cursors implementing the cursor traits over fixed data
//!
//! Used to drive the merge and traversal helpers without a store, and as
//! test doubles for code that only depends on the traits.

use super::{
    Cursor, CursorHandle, CursorPosition, CursorState, NodeIndexCursor, RelationshipTraversal,
};
use crate::error::{KernelError, KernelResult};
use crate::graph::{NodeId, RelTypeId, RelationshipId};
use crate::index::IndexOrder;

/// Offset-based cursor state over a vector of known length
#[derive(Debug)]
struct StubState {
    handle: CursorHandle,
    state: CursorState<usize>,
}

impl StubState {
    fn new() -> Self {
        StubState {
            handle: CursorHandle::new(),
            state: CursorState::BeforeFirst,
        }
    }

    fn step(&mut self, len: usize) -> KernelResult<bool> {
        if self.handle.is_closed() {
            self.state = CursorState::Closed;
            return Err(KernelError::CursorClosed);
        }
        let next = match self.state {
            CursorState::BeforeFirst => 0,
            CursorState::Positioned(offset) => offset + 1,
            CursorState::Unbound | CursorState::Exhausted => return Ok(false),
            CursorState::Closed => return Err(KernelError::CursorClosed),
        };
        self.state = if next < len {
            CursorState::Positioned(next)
        } else {
            CursorState::Exhausted
        };
        Ok(next < len)
    }

    fn offset(&self) -> Option<usize> {
        match self.state {
            CursorState::Positioned(offset) if !self.handle.is_closed() => Some(offset),
            _ => None,
        }
    }

    fn close(&mut self) {
        self.handle.close();
        self.state = CursorState::Closed;
    }

    fn suspend(&self) -> KernelResult<CursorPosition<usize, ()>> {
        if self.handle.is_closed() {
            return Err(KernelError::CursorClosed);
        }
        Ok(CursorPosition {
            owner: self.handle.id(),
            state: self.state.clone(),
            binding: Some(()),
        })
    }

    fn resume(&mut self, position: CursorPosition<usize, ()>) -> KernelResult<()> {
        if self.handle.is_closed() {
            return Err(KernelError::CursorClosed);
        }
        if position.owner != self.handle.id() {
            return Err(KernelError::ForeignCursorPosition);
        }
        self.state = position.state;
        Ok(())
    }
}

/// Node cursor over a fixed list, sorted and deduplicated per `order`
#[derive(Debug)]
pub struct StubNodeCursor {
    nodes: Vec<NodeId>,
    inner: StubState,
}

impl StubNodeCursor {
    pub fn new(mut nodes: Vec<NodeId>, order: IndexOrder) -> Self {
        nodes.sort_unstable();
        nodes.dedup();
        if order.is_descending() {
            nodes.reverse();
        }
        StubNodeCursor {
            nodes,
            inner: StubState::new(),
        }
    }
}

impl Cursor for StubNodeCursor {
    type Position = CursorPosition<usize, ()>;

    fn next(&mut self) -> KernelResult<bool> {
        self.inner.step(self.nodes.len())
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn is_closed(&self) -> bool {
        self.inner.handle.is_closed()
    }

    fn suspend(&self) -> KernelResult<Self::Position> {
        self.inner.suspend()
    }

    fn resume(&mut self, position: Self::Position) -> KernelResult<()> {
        self.inner.resume(position)
    }
}

impl NodeIndexCursor for StubNodeCursor {
    fn node_reference(&self) -> NodeId {
        self.inner
            .offset()
            .and_then(|offset| self.nodes.get(offset).copied())
            .unwrap_or(NodeId::NONE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubRelationship {
    pub id: RelationshipId,
    pub rel_type: RelTypeId,
    pub source: NodeId,
    pub target: NodeId,
}

impl StubRelationship {
    pub fn new(id: u64, rel_type: RelTypeId, source: NodeId, target: NodeId) -> Self {
        StubRelationship {
            id: RelationshipId::new(id),
            rel_type,
            source,
            target,
        }
    }
}

/// Traversal cursor over the given relationships of `origin`, in list order
#[derive(Debug)]
pub struct StubRelationshipCursor {
    origin: NodeId,
    relationships: Vec<StubRelationship>,
    inner: StubState,
}

impl StubRelationshipCursor {
    pub fn new(origin: NodeId, relationships: Vec<StubRelationship>) -> Self {
        StubRelationshipCursor {
            origin,
            relationships,
            inner: StubState::new(),
        }
    }

    fn current(&self) -> Option<&StubRelationship> {
        self.inner
            .offset()
            .and_then(|offset| self.relationships.get(offset))
    }
}

impl Cursor for StubRelationshipCursor {
    type Position = CursorPosition<usize, ()>;

    fn next(&mut self) -> KernelResult<bool> {
        self.inner.step(self.relationships.len())
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn is_closed(&self) -> bool {
        self.inner.handle.is_closed()
    }

    fn suspend(&self) -> KernelResult<Self::Position> {
        self.inner.suspend()
    }

    fn resume(&mut self, position: Self::Position) -> KernelResult<()> {
        self.inner.resume(position)
    }
}

impl RelationshipTraversal for StubRelationshipCursor {
    fn relationship_reference(&self) -> RelationshipId {
        self.current().map_or(RelationshipId::NONE, |rel| rel.id)
    }

    fn relationship_type(&self) -> RelTypeId {
        self.current().map_or(RelTypeId::NONE, |rel| rel.rel_type)
    }

    fn source_node_reference(&self) -> NodeId {
        self.current().map_or(NodeId::NONE, |rel| rel.source)
    }

    fn target_node_reference(&self) -> NodeId {
        self.current().map_or(NodeId::NONE, |rel| rel.target)
    }

    fn origin_node_reference(&self) -> NodeId {
        self.origin
    }
}
