//! Label index cursor: nodes carrying one label, any of several, or all of
//! several, in node reference order

use std::ops::Bound;
use std::sync::Arc;

use super::node::{NodeCursor, NodeScan};
use super::{Cursor, CursorCore, CursorHandle, CursorPosition, NodeIndexCursor};
use crate::error::KernelResult;
use crate::graph::{LabelId, LabelSet, NodeId};
use crate::index::IndexOrder;
use crate::kernel::context::TxContext;
use crate::kernel::view::{pick, TxView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelPredicate {
    Single(LabelId),
    /// Nodes with at least one of the labels, each reported once
    Union(Vec<LabelId>),
    /// Nodes with every one of the labels
    Intersection(Vec<LabelId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelScan {
    pub predicate: LabelPredicate,
    pub order: IndexOrder,
}

impl LabelScan {
    pub fn new(predicate: LabelPredicate, order: IndexOrder) -> Self {
        LabelScan { predicate, order }
    }

    fn seek(&self, view: &TxView<'_>, after: Option<NodeId>) -> Option<NodeId> {
        let descending = self.order.is_descending();
        let from = after.map_or(Bound::Unbounded, Bound::Excluded);
        match &self.predicate {
            LabelPredicate::Single(label) => view.seek_labeled(*label, from, descending),
            LabelPredicate::Union(labels) => labels.iter().fold(None, |best, label| {
                pick(best, view.seek_labeled(*label, from, descending), descending)
            }),
            LabelPredicate::Intersection(labels) => {
                let (first, rest) = labels.split_first()?;
                let mut candidate = view.seek_labeled(*first, from, descending)?;
                // leapfrog until every label agrees on the candidate
                'search: loop {
                    for label in rest {
                        let found = view.seek_labeled(*label, Bound::Included(candidate), descending)?;
                        if found != candidate {
                            candidate = view.seek_labeled(*first, Bound::Included(found), descending)?;
                            continue 'search;
                        }
                    }
                    return Some(candidate);
                }
            }
        }
    }
}

pub type LabelScanPosition = CursorPosition<NodeId, LabelScan>;

#[derive(Debug)]
pub struct NodeLabelIndexCursor {
    core: CursorCore<NodeId, LabelScan>,
}

impl NodeLabelIndexCursor {
    pub(crate) fn new(handle: CursorHandle) -> Self {
        NodeLabelIndexCursor {
            core: CursorCore::new(handle),
        }
    }

    pub(crate) fn reset(&mut self, handle: CursorHandle) {
        self.core.reset(handle);
    }

    pub(crate) fn scan(&mut self, ctx: &Arc<TxContext>, scan: LabelScan) -> KernelResult<()> {
        self.core.bind(ctx, scan)
    }

    pub fn node_reference(&self) -> NodeId {
        self.core.current().copied().unwrap_or(NodeId::NONE)
    }

    pub fn labels(&self) -> LabelSet {
        self.core
            .read_current(|view, id| view.node_labels(*id))
            .flatten()
            .unwrap_or_default()
    }

    /// Position `nodes` on the current node
    pub fn node(&self, nodes: &mut NodeCursor) -> KernelResult<()> {
        let (ctx, id) = self.core.positioned()?;
        nodes.scan(ctx, NodeScan::Single(*id))
    }
}

impl Cursor for NodeLabelIndexCursor {
    type Position = LabelScanPosition;

    fn next(&mut self) -> KernelResult<bool> {
        self.core
            .advance(|view, scan, after| scan.seek(view, after.copied()))
    }

    core_lifecycle!();
}

impl NodeIndexCursor for NodeLabelIndexCursor {
    fn node_reference(&self) -> NodeId {
        NodeLabelIndexCursor::node_reference(self)
    }
}
