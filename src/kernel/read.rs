//! Read surface: populates caller-supplied cursors
//!
//! Nothing here allocates cursors or iterates on the caller's behalf; each
//! call binds a cursor to the transaction and a scan description and
//! returns. Missing references leave the cursor empty rather than failing.

use std::sync::Arc;

use crate::cursor::{
    LabelPredicate, LabelScan, NodeCursor, NodeLabelIndexCursor, NodeScan, NodeValueIndexCursor,
    RelationshipScan, RelationshipScanCursor, RelationshipTraversalCursor, TraversalScope,
    ValueSeek,
};
use crate::error::{KernelError, KernelResult};
use crate::graph::{Direction, LabelId, NodeId, PropertyKeyId, RelTypeId, RelationshipId};
use crate::index::{ConstraintDescriptor, IndexDescriptor, IndexOrder, IndexQuery, IndexState};
use crate::kernel::context::TxContext;

/// Direction filter of a relationship selection
///
/// Loops are part of every direction: a loop is both an outgoing and an
/// incoming relationship of its node, and it is reported once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RelationshipDirection {
    Outgoing,
    Incoming,
    #[default]
    Both,
}

impl RelationshipDirection {
    pub(crate) fn buckets(&self) -> &'static [Direction] {
        match self {
            RelationshipDirection::Outgoing => &[Direction::Outgoing, Direction::Loop],
            RelationshipDirection::Incoming => &[Direction::Incoming, Direction::Loop],
            RelationshipDirection::Both => &Direction::ALL,
        }
    }
}

/// Which relationships of a node to expand
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationshipSelection {
    /// `None` selects every type
    pub types: Option<Vec<RelTypeId>>,
    pub direction: RelationshipDirection,
}

impl RelationshipSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn outgoing() -> Self {
        RelationshipSelection {
            types: None,
            direction: RelationshipDirection::Outgoing,
        }
    }

    pub fn incoming() -> Self {
        RelationshipSelection {
            types: None,
            direction: RelationshipDirection::Incoming,
        }
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = RelTypeId>) -> Self {
        self.types = Some(types.into_iter().collect());
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Read<'t> {
    ctx: &'t Arc<TxContext>,
}

impl<'t> Read<'t> {
    pub(crate) fn new(ctx: &'t Arc<TxContext>) -> Self {
        Read { ctx }
    }

    pub fn all_nodes_scan(&self, cursor: &mut NodeCursor) -> KernelResult<()> {
        cursor.scan(self.ctx, NodeScan::All)
    }

    pub fn single_node(&self, node: NodeId, cursor: &mut NodeCursor) -> KernelResult<()> {
        cursor.scan(self.ctx, NodeScan::Single(node))
    }

    pub fn all_relationships_scan(&self, cursor: &mut RelationshipScanCursor) -> KernelResult<()> {
        cursor.scan(self.ctx, RelationshipScan::All)
    }

    pub fn single_relationship(
        &self,
        relationship: RelationshipId,
        cursor: &mut RelationshipScanCursor,
    ) -> KernelResult<()> {
        cursor.scan(self.ctx, RelationshipScan::Single(relationship))
    }

    pub fn node_label_scan(
        &self,
        label: LabelId,
        cursor: &mut NodeLabelIndexCursor,
        order: IndexOrder,
    ) -> KernelResult<()> {
        cursor.scan(self.ctx, LabelScan::new(LabelPredicate::Single(label), order))
    }

    /// Nodes with any of `labels`, each reported once
    pub fn node_label_union_scan(
        &self,
        labels: &[LabelId],
        cursor: &mut NodeLabelIndexCursor,
        order: IndexOrder,
    ) -> KernelResult<()> {
        cursor.scan(self.ctx, LabelScan::new(LabelPredicate::Union(labels.to_vec()), order))
    }

    /// Nodes with all of `labels`
    pub fn node_label_intersection_scan(
        &self,
        labels: &[LabelId],
        cursor: &mut NodeLabelIndexCursor,
        order: IndexOrder,
    ) -> KernelResult<()> {
        cursor.scan(
            self.ctx,
            LabelScan::new(LabelPredicate::Intersection(labels.to_vec()), order),
        )
    }

    /// Seek an online index
    ///
    /// Fails with `IndexNotFound` if no visible index covers the schema,
    /// `IndexNotOnline` if it was created by this transaction and
    /// `IndexOrderNotSupported` if `order` cannot be honored for `query`.
    pub fn node_index_seek(
        &self,
        index: &IndexDescriptor,
        cursor: &mut NodeValueIndexCursor,
        order: IndexOrder,
        query: IndexQuery,
    ) -> KernelResult<()> {
        self.ctx.ensure_open()?;
        let (label, property) = index.schema();
        match self.ctx.with_view(|view| view.index(label, property)) {
            None => return Err(KernelError::IndexNotFound { label, property }),
            Some((_, IndexState::Populating)) => {
                return Err(KernelError::IndexNotOnline { label, property })
            }
            Some((_, IndexState::Online)) => {}
        }
        if !query.supports_order(order) {
            return Err(KernelError::IndexOrderNotSupported { order });
        }
        cursor.seek(
            self.ctx,
            ValueSeek {
                label,
                property,
                query,
                order,
            },
        )
    }

    /// Every entry of an online index
    pub fn node_index_scan(
        &self,
        index: &IndexDescriptor,
        cursor: &mut NodeValueIndexCursor,
        order: IndexOrder,
    ) -> KernelResult<()> {
        self.node_index_seek(index, cursor, order, IndexQuery::Exists)
    }

    /// Populate `traversal` with the relationships of `node` that match
    /// `selection`, without going through a group cursor
    pub fn relationships(
        &self,
        node: NodeId,
        selection: &RelationshipSelection,
        traversal: &mut RelationshipTraversalCursor,
    ) -> KernelResult<()> {
        let scope = TraversalScope::selection(node, selection.types.clone(), selection.direction.buckets());
        traversal.bind(self.ctx, scope)
    }

    pub fn node_exists(&self, node: NodeId) -> KernelResult<bool> {
        self.ctx.ensure_open()?;
        Ok(self.ctx.with_view(|view| view.node_exists(node)))
    }

    pub fn relationship_exists(&self, relationship: RelationshipId) -> KernelResult<bool> {
        self.ctx.ensure_open()?;
        Ok(self.ctx.with_view(|view| view.relationship_exists(relationship)))
    }

    /// Visible nodes, optionally restricted to one label
    pub fn counts_for_node(&self, label: Option<LabelId>) -> KernelResult<usize> {
        self.ctx.ensure_open()?;
        Ok(self.ctx.with_view(|view| view.count_nodes(label)))
    }

    /// Visible relationships, optionally restricted to one type
    pub fn counts_for_relationship(&self, rel_type: Option<RelTypeId>) -> KernelResult<usize> {
        self.ctx.ensure_open()?;
        Ok(self.ctx.with_view(|view| view.count_relationships(rel_type)))
    }

    /// Number of relationships of `node` matching `selection`
    pub fn node_degree(&self, node: NodeId, selection: &RelationshipSelection) -> KernelResult<usize> {
        self.ctx.ensure_open()?;
        let types = selection.types.as_deref();
        let buckets = selection.direction.buckets();
        Ok(self.ctx.with_view(|view| {
            let mut count = 0;
            let mut after = None;
            while let Some(rel) = view.next_relationship_of(node, types, buckets, after) {
                count += 1;
                after = Some(rel.id);
            }
            count
        }))
    }
}

/// Read access to the schema as this transaction sees it
#[derive(Debug, Clone, Copy)]
pub struct SchemaRead<'t> {
    ctx: &'t Arc<TxContext>,
}

impl<'t> SchemaRead<'t> {
    pub(crate) fn new(ctx: &'t Arc<TxContext>) -> Self {
        SchemaRead { ctx }
    }

    pub fn index(&self, label: LabelId, property: PropertyKeyId) -> KernelResult<Option<IndexDescriptor>> {
        self.ctx.ensure_open()?;
        Ok(self
            .ctx
            .with_view(|view| view.index(label, property))
            .map(|(index, _)| index))
    }

    pub fn index_state(&self, index: &IndexDescriptor) -> KernelResult<IndexState> {
        self.ctx.ensure_open()?;
        let (label, property) = index.schema();
        self.ctx
            .with_view(|view| view.index(label, property))
            .map(|(_, state)| state)
            .ok_or(KernelError::IndexNotFound { label, property })
    }

    pub fn indexes(&self) -> KernelResult<Vec<IndexDescriptor>> {
        self.ctx.ensure_open()?;
        Ok(self
            .ctx
            .with_view(|view| view.indexes())
            .into_iter()
            .map(|(index, _)| index)
            .collect())
    }

    pub fn constraint(
        &self,
        label: LabelId,
        property: PropertyKeyId,
    ) -> KernelResult<Option<ConstraintDescriptor>> {
        self.ctx.ensure_open()?;
        Ok(self.ctx.with_view(|view| view.constraint(label, property)))
    }

    pub fn constraints(&self) -> KernelResult<Vec<ConstraintDescriptor>> {
        self.ctx.ensure_open()?;
        Ok(self.ctx.with_view(|view| view.constraints()))
    }
}
