//! Streaming union and intersection over ordered node cursors
//!
//! Inputs must all produce node references in the same order, ascending or
//! descending, as given to the constructor. Nothing is materialized: each
//! `next()` advances only the inputs whose head was consumed.

use std::cmp::Ordering;

use super::{Cursor, CursorHandle, CursorState, NodeIndexCursor};
use crate::error::{KernelError, KernelResult};
use crate::graph::NodeId;
use crate::index::IndexOrder;

/// Suspended state of a merge cursor and all its inputs
#[derive(Debug, Clone, PartialEq)]
pub struct MergePosition<P> {
    owner: u64,
    state: CursorState<NodeId>,
    heads: Vec<Option<NodeId>>,
    inputs: Vec<P>,
}

#[derive(Debug)]
struct MergeInputs<C> {
    handle: CursorHandle,
    inputs: Vec<C>,
    heads: Vec<Option<NodeId>>,
    descending: bool,
    state: CursorState<NodeId>,
}

impl<C: NodeIndexCursor> MergeInputs<C> {
    fn new(inputs: Vec<C>, order: IndexOrder) -> Self {
        let heads = vec![None; inputs.len()];
        MergeInputs {
            handle: CursorHandle::new(),
            inputs,
            heads,
            descending: order.is_descending(),
            state: CursorState::BeforeFirst,
        }
    }

    /// Scan-order comparison
    fn cmp(&self, a: NodeId, b: NodeId) -> Ordering {
        if self.descending {
            b.cmp(&a)
        } else {
            a.cmp(&b)
        }
    }

    fn pull(&mut self, input: usize) -> KernelResult<Option<NodeId>> {
        let cursor = &mut self.inputs[input];
        let head = if cursor.next()? {
            Some(cursor.node_reference())
        } else {
            None
        };
        self.heads[input] = head;
        Ok(head)
    }

    /// Where the previous step left off; `None` means nothing more to do
    fn begin(&mut self) -> KernelResult<Option<Option<NodeId>>> {
        if self.handle.is_closed() {
            self.state = CursorState::Closed;
            return Err(KernelError::CursorClosed);
        }
        match self.state {
            CursorState::BeforeFirst => {
                for input in 0..self.inputs.len() {
                    self.pull(input)?;
                }
                Ok(Some(None))
            }
            CursorState::Positioned(current) => Ok(Some(Some(current))),
            CursorState::Unbound | CursorState::Exhausted => Ok(None),
            CursorState::Closed => Err(KernelError::CursorClosed),
        }
    }

    fn finish(&mut self, found: Option<NodeId>) -> bool {
        self.state = match found {
            Some(node) => CursorState::Positioned(node),
            None => CursorState::Exhausted,
        };
        found.is_some()
    }

    fn current(&self) -> NodeId {
        match self.state {
            CursorState::Positioned(node) if !self.handle.is_closed() => node,
            _ => NodeId::NONE,
        }
    }

    fn close(&mut self) {
        for input in &mut self.inputs {
            input.close();
        }
        self.handle.close();
        self.state = CursorState::Closed;
    }

    fn suspend(&self) -> KernelResult<MergePosition<C::Position>> {
        if self.handle.is_closed() {
            return Err(KernelError::CursorClosed);
        }
        let inputs = self
            .inputs
            .iter()
            .map(|input| input.suspend())
            .collect::<KernelResult<Vec<_>>>()?;
        Ok(MergePosition {
            owner: self.handle.id(),
            state: self.state.clone(),
            heads: self.heads.clone(),
            inputs,
        })
    }

    fn resume(&mut self, position: MergePosition<C::Position>) -> KernelResult<()> {
        if self.handle.is_closed() {
            return Err(KernelError::CursorClosed);
        }
        if position.owner != self.handle.id() || position.inputs.len() != self.inputs.len() {
            return Err(KernelError::ForeignCursorPosition);
        }
        for (input, saved) in self.inputs.iter_mut().zip(position.inputs) {
            input.resume(saved)?;
        }
        self.heads = position.heads;
        self.state = position.state;
        Ok(())
    }
}

/// Nodes produced by any input, each once
#[derive(Debug)]
pub struct UnionNodeCursor<C> {
    merge: MergeInputs<C>,
}

impl<C: NodeIndexCursor> UnionNodeCursor<C> {
    pub fn new(inputs: Vec<C>, order: IndexOrder) -> Self {
        UnionNodeCursor {
            merge: MergeInputs::new(inputs, order),
        }
    }

    pub fn node_reference(&self) -> NodeId {
        self.merge.current()
    }

    /// Hand the inputs back, e.g. to recycle them
    pub fn into_inputs(self) -> Vec<C> {
        self.merge.inputs
    }
}

impl<C: NodeIndexCursor> Cursor for UnionNodeCursor<C> {
    type Position = MergePosition<C::Position>;

    fn next(&mut self) -> KernelResult<bool> {
        let Some(previous) = self.merge.begin()? else {
            return Ok(false);
        };
        if let Some(previous) = previous {
            for input in 0..self.merge.inputs.len() {
                if self.merge.heads[input] == Some(previous) {
                    self.merge.pull(input)?;
                }
            }
        }
        let best = self
            .merge
            .heads
            .iter()
            .flatten()
            .copied()
            .min_by(|a, b| self.merge.cmp(*a, *b));
        Ok(self.merge.finish(best))
    }

    fn close(&mut self) {
        self.merge.close();
    }

    fn is_closed(&self) -> bool {
        self.merge.handle.is_closed()
    }

    fn suspend(&self) -> KernelResult<Self::Position> {
        self.merge.suspend()
    }

    fn resume(&mut self, position: Self::Position) -> KernelResult<()> {
        self.merge.resume(position)
    }
}

impl<C: NodeIndexCursor> NodeIndexCursor for UnionNodeCursor<C> {
    fn node_reference(&self) -> NodeId {
        self.merge.current()
    }
}

/// Nodes produced by every input
#[derive(Debug)]
pub struct IntersectionNodeCursor<C> {
    merge: MergeInputs<C>,
}

impl<C: NodeIndexCursor> IntersectionNodeCursor<C> {
    pub fn new(inputs: Vec<C>, order: IndexOrder) -> Self {
        IntersectionNodeCursor {
            merge: MergeInputs::new(inputs, order),
        }
    }

    pub fn node_reference(&self) -> NodeId {
        self.merge.current()
    }

    pub fn into_inputs(self) -> Vec<C> {
        self.merge.inputs
    }

    fn align(&mut self) -> KernelResult<Option<NodeId>> {
        if self.merge.inputs.is_empty() {
            return Ok(None);
        }
        loop {
            let mut target: Option<NodeId> = None;
            for head in &self.merge.heads {
                let Some(head) = *head else {
                    return Ok(None);
                };
                target = match target {
                    Some(t) if self.merge.cmp(t, head) != Ordering::Less => Some(t),
                    _ => Some(head),
                };
            }
            let Some(target) = target else {
                return Ok(None);
            };
            let mut aligned = true;
            for input in 0..self.merge.inputs.len() {
                while let Some(head) = self.merge.heads[input] {
                    if self.merge.cmp(head, target) != Ordering::Less {
                        break;
                    }
                    self.merge.pull(input)?;
                }
                match self.merge.heads[input] {
                    None => return Ok(None),
                    Some(head) if head != target => aligned = false,
                    Some(_) => {}
                }
            }
            if aligned {
                return Ok(Some(target));
            }
        }
    }
}

impl<C: NodeIndexCursor> Cursor for IntersectionNodeCursor<C> {
    type Position = MergePosition<C::Position>;

    fn next(&mut self) -> KernelResult<bool> {
        let Some(previous) = self.merge.begin()? else {
            return Ok(false);
        };
        if previous.is_some() {
            for input in 0..self.merge.inputs.len() {
                self.merge.pull(input)?;
            }
        }
        let found = self.align()?;
        Ok(self.merge.finish(found))
    }

    fn close(&mut self) {
        self.merge.close();
    }

    fn is_closed(&self) -> bool {
        self.merge.handle.is_closed()
    }

    fn suspend(&self) -> KernelResult<Self::Position> {
        self.merge.suspend()
    }

    fn resume(&mut self, position: Self::Position) -> KernelResult<()> {
        self.merge.resume(position)
    }
}

impl<C: NodeIndexCursor> NodeIndexCursor for IntersectionNodeCursor<C> {
    fn node_reference(&self) -> NodeId {
        self.merge.current()
    }
}
