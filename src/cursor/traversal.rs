//! Relationship traversal cursor
//!
//! Enumerates the relationships attached to one origin node, either one
//! direction bucket of one relationship group (populated from a
//! [`RelationshipGroupCursor`](super::RelationshipGroupCursor)) or a
//! type/direction selection across all groups. Results come in relationship
//! reference order; every relationship appears in exactly one bucket of its
//! origin node, so no relationship is returned twice.

use std::sync::Arc;

use super::node::{NodeCursor, NodeScan};
use super::property::PropertyCursor;
use super::{Cursor, CursorCore, CursorHandle, CursorPosition, RelationshipTraversal};
use crate::error::KernelResult;
use crate::graph::{Direction, NodeId, PropertyKeyId, PropertyValue, RelTypeId, RelationshipId};
use crate::kernel::context::TxContext;
use crate::kernel::view::{PropertyOwner, RelationshipEntry};

/// Which relationships of which node a traversal covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalScope {
    origin: NodeId,
    types: Option<Vec<RelTypeId>>,
    directions: &'static [Direction],
}

impl TraversalScope {
    /// Every relationship of `origin`
    pub fn all(origin: NodeId) -> Self {
        TraversalScope {
            origin,
            types: None,
            directions: &Direction::ALL,
        }
    }

    /// One direction bucket of one group
    pub fn bucket(origin: NodeId, rel_type: RelTypeId, direction: Direction) -> Self {
        let directions: &'static [Direction] = match direction {
            Direction::Outgoing => &[Direction::Outgoing],
            Direction::Incoming => &[Direction::Incoming],
            Direction::Loop => &[Direction::Loop],
        };
        TraversalScope {
            origin,
            types: Some(vec![rel_type]),
            directions,
        }
    }

    pub fn selection(origin: NodeId, types: Option<Vec<RelTypeId>>, directions: &'static [Direction]) -> Self {
        TraversalScope {
            origin,
            types,
            directions,
        }
    }

    pub fn origin(&self) -> NodeId {
        self.origin
    }
}

pub type TraversalPosition = CursorPosition<RelationshipEntry, TraversalScope>;

#[derive(Debug)]
pub struct RelationshipTraversalCursor {
    core: CursorCore<RelationshipEntry, TraversalScope>,
}

impl RelationshipTraversalCursor {
    pub(crate) fn new(handle: CursorHandle) -> Self {
        RelationshipTraversalCursor {
            core: CursorCore::new(handle),
        }
    }

    pub(crate) fn reset(&mut self, handle: CursorHandle) {
        self.core.reset(handle);
    }

    pub(crate) fn bind(&mut self, ctx: &Arc<TxContext>, scope: TraversalScope) -> KernelResult<()> {
        self.core.bind(ctx, scope)
    }

    /// Direction of the current relationship as seen from the origin
    pub fn direction(&self) -> Option<Direction> {
        let rel = self.core.current()?;
        Direction::of(self.origin_node_reference(), rel.source, rel.target)
    }

    pub fn property(&self, key: PropertyKeyId) -> Option<PropertyValue> {
        self.core
            .read_current(|view, rel| view.relationship_property(rel.id, key))
            .flatten()
    }

    /// Position `nodes` on the endpoint opposite the origin
    pub fn neighbour(&self, nodes: &mut NodeCursor) -> KernelResult<()> {
        let (ctx, _) = self.core.positioned()?;
        nodes.scan(ctx, NodeScan::Single(self.other_node_reference()))
    }

    pub fn properties(&self, properties: &mut PropertyCursor) -> KernelResult<()> {
        let (ctx, rel) = self.core.positioned()?;
        properties.bind(ctx, PropertyOwner::Relationship(rel.id))
    }
}

impl Cursor for RelationshipTraversalCursor {
    type Position = TraversalPosition;

    fn next(&mut self) -> KernelResult<bool> {
        self.core.advance(|view, scope, after| {
            view.next_relationship_of(
                scope.origin,
                scope.types.as_deref(),
                scope.directions,
                after.map(|rel| rel.id),
            )
        })
    }

    core_lifecycle!();
}

impl RelationshipTraversal for RelationshipTraversalCursor {
    fn relationship_reference(&self) -> RelationshipId {
        self.core.current().map_or(RelationshipId::NONE, |rel| rel.id)
    }

    fn relationship_type(&self) -> RelTypeId {
        self.core.current().map_or(RelTypeId::NONE, |rel| rel.rel_type)
    }

    fn source_node_reference(&self) -> NodeId {
        self.core.current().map_or(NodeId::NONE, |rel| rel.source)
    }

    fn target_node_reference(&self) -> NodeId {
        self.core.current().map_or(NodeId::NONE, |rel| rel.target)
    }

    fn origin_node_reference(&self) -> NodeId {
        self.core.binding().map_or(NodeId::NONE, TraversalScope::origin)
    }
}
