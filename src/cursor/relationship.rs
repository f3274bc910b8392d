//! Relationship scan cursor: all-relationships scans and single lookups

use std::sync::Arc;

use super::node::{NodeCursor, NodeScan};
use super::property::PropertyCursor;
use super::{Cursor, CursorCore, CursorHandle, CursorPosition};
use crate::error::KernelResult;
use crate::graph::{NodeId, PropertyKeyId, PropertyValue, RelTypeId, RelationshipId};
use crate::kernel::context::TxContext;
use crate::kernel::view::{PropertyOwner, RelationshipEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipScan {
    All,
    Single(RelationshipId),
}

pub type RelationshipScanPosition = CursorPosition<RelationshipEntry, RelationshipScan>;

#[derive(Debug)]
pub struct RelationshipScanCursor {
    core: CursorCore<RelationshipEntry, RelationshipScan>,
}

impl RelationshipScanCursor {
    pub(crate) fn new(handle: CursorHandle) -> Self {
        RelationshipScanCursor {
            core: CursorCore::new(handle),
        }
    }

    pub(crate) fn reset(&mut self, handle: CursorHandle) {
        self.core.reset(handle);
    }

    pub(crate) fn scan(&mut self, ctx: &Arc<TxContext>, scan: RelationshipScan) -> KernelResult<()> {
        self.core.bind(ctx, scan)
    }

    pub fn relationship_reference(&self) -> RelationshipId {
        self.core.current().map_or(RelationshipId::NONE, |rel| rel.id)
    }

    pub fn relationship_type(&self) -> RelTypeId {
        self.core.current().map_or(RelTypeId::NONE, |rel| rel.rel_type)
    }

    pub fn source_node_reference(&self) -> NodeId {
        self.core.current().map_or(NodeId::NONE, |rel| rel.source)
    }

    pub fn target_node_reference(&self) -> NodeId {
        self.core.current().map_or(NodeId::NONE, |rel| rel.target)
    }

    pub fn property(&self, key: PropertyKeyId) -> Option<PropertyValue> {
        self.core
            .read_current(|view, rel| view.relationship_property(rel.id, key))
            .flatten()
    }

    pub fn source(&self, nodes: &mut NodeCursor) -> KernelResult<()> {
        let (ctx, rel) = self.core.positioned()?;
        nodes.scan(ctx, NodeScan::Single(rel.source))
    }

    pub fn target(&self, nodes: &mut NodeCursor) -> KernelResult<()> {
        let (ctx, rel) = self.core.positioned()?;
        nodes.scan(ctx, NodeScan::Single(rel.target))
    }

    pub fn properties(&self, properties: &mut PropertyCursor) -> KernelResult<()> {
        let (ctx, rel) = self.core.positioned()?;
        properties.bind(ctx, PropertyOwner::Relationship(rel.id))
    }
}

impl Cursor for RelationshipScanCursor {
    type Position = RelationshipScanPosition;

    fn next(&mut self) -> KernelResult<bool> {
        self.core.advance(|view, scan, after| match scan {
            RelationshipScan::All => view.next_relationship(after.map(|rel| rel.id)),
            RelationshipScan::Single(id) => {
                if after.is_none() {
                    view.relationship(*id)
                } else {
                    None
                }
            }
        })
    }

    core_lifecycle!();
}
