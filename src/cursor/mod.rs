//! Cursors: reusable positional handles over graph entities
//!
//! A cursor is allocated by a transaction's [`CursorFactory`], populated by
//! a `Read` operation (or by another cursor, e.g. group -> traversal ->
//! neighbour node), advanced with [`Cursor::next`] and eventually closed.
//!
//! Positions are keys, not offsets: a positioned cursor remembers the last
//! entity it returned and each `next()` seeks the first visible entity
//! beyond it. This is what makes scans robust against creates and deletes
//! made by the same transaction while the scan is open.
//!
//! [`Cursor::suspend`] captures the state and the scan binding,
//! [`Cursor::resume`] restores them on the same cursor instance, so one
//! physical cursor can be loaned to a nested traversal and handed back.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{KernelError, KernelResult};
use crate::graph::{NodeId, PropertyValue, RelTypeId, RelationshipId};
use crate::kernel::context::TxContext;
use crate::kernel::view::TxView;

/// Implements the lifecycle half of [`Cursor`] by delegating to `self.core`
macro_rules! core_lifecycle {
    () => {
        fn close(&mut self) {
            self.core.close();
        }

        fn is_closed(&self) -> bool {
            self.core.is_closed()
        }

        fn suspend(&self) -> $crate::error::KernelResult<Self::Position> {
            self.core.suspend()
        }

        fn resume(&mut self, position: Self::Position) -> $crate::error::KernelResult<()> {
            self.core.resume(position)
        }
    };
}

pub mod factory;
pub mod group;
pub mod label_index;
pub mod merge;
pub mod node;
pub mod property;
pub mod relationship;
pub mod stub;
pub mod traversal;
pub mod value_index;

pub use factory::{CursorFactory, PoolStatistics, Poolable};
pub use group::{GroupPosition, RelationshipGroupCursor};
pub use label_index::{LabelPredicate, LabelScan, LabelScanPosition, NodeLabelIndexCursor};
pub use merge::{IntersectionNodeCursor, MergePosition, UnionNodeCursor};
pub use node::{NodeCursor, NodePosition, NodeScan};
pub use property::{PropertyCursor, PropertyPosition};
pub use relationship::{RelationshipScan, RelationshipScanCursor, RelationshipScanPosition};
pub use stub::{StubNodeCursor, StubRelationship, StubRelationshipCursor};
pub use traversal::{RelationshipTraversalCursor, TraversalPosition, TraversalScope};
pub use value_index::{NodeValueIndexCursor, ValuePosition, ValueSeek};

/// Value returned by property accessors of an unpositioned cursor
pub(crate) static NO_VALUE: PropertyValue = PropertyValue::Null;

/// Base capability of every cursor
pub trait Cursor {
    /// Snapshot produced by [`Cursor::suspend`]
    type Position;

    /// Advance; `Ok(false)` once exhausted (repeatedly), error if closed
    fn next(&mut self) -> KernelResult<bool>;

    /// Idempotent
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    fn suspend(&self) -> KernelResult<Self::Position>;

    /// Only valid with a position suspended from this same cursor
    fn resume(&mut self, position: Self::Position) -> KernelResult<()>;
}

/// Cursor over node references in a known order
pub trait NodeIndexCursor: Cursor {
    /// `NodeId::NONE` when not positioned
    fn node_reference(&self) -> NodeId;
}

/// Cursor over relationships attached to one origin node
pub trait RelationshipTraversal: Cursor {
    fn relationship_reference(&self) -> RelationshipId;

    fn relationship_type(&self) -> RelTypeId;

    fn source_node_reference(&self) -> NodeId;

    fn target_node_reference(&self) -> NodeId;

    fn origin_node_reference(&self) -> NodeId;

    /// The endpoint that is not the origin (the origin itself for loops)
    fn other_node_reference(&self) -> NodeId {
        let origin = self.origin_node_reference();
        let source = self.source_node_reference();
        if source == origin {
            self.target_node_reference()
        } else {
            source
        }
    }
}

/// Where a cursor is in its stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorState<K> {
    /// Allocated but never populated
    Unbound,
    /// Populated, `next()` not called yet
    BeforeFirst,
    Positioned(K),
    Exhausted,
    Closed,
}

/// Suspended cursor position: the state plus the scan binding
#[derive(Debug, Clone, PartialEq)]
pub struct CursorPosition<K, B> {
    owner: u64,
    state: CursorState<K>,
    binding: Option<B>,
}

impl<K, B> CursorPosition<K, B> {
    pub fn state(&self) -> &CursorState<K> {
        &self.state
    }

    pub fn binding(&self) -> Option<&B> {
        self.binding.as_ref()
    }
}

static NEXT_CURSOR_ID: AtomicU64 = AtomicU64::new(1);

/// Identity and closed flag of one cursor allocation
///
/// The flag is shared with the allocating factory so that closing the
/// transaction closes every cursor it handed out.
#[derive(Debug)]
pub struct CursorHandle {
    id: u64,
    closed: Arc<AtomicBool>,
}

impl CursorHandle {
    pub fn new() -> Self {
        CursorHandle {
            id: NEXT_CURSOR_ID.fetch_add(1, Ordering::Relaxed),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl Default for CursorHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared machinery of the store-backed cursors
#[derive(Debug)]
pub(crate) struct CursorCore<K, B> {
    handle: CursorHandle,
    ctx: Option<Arc<TxContext>>,
    binding: Option<B>,
    state: CursorState<K>,
}

impl<K: Clone, B: Clone> CursorCore<K, B> {
    pub(crate) fn new(handle: CursorHandle) -> Self {
        CursorCore {
            handle,
            ctx: None,
            binding: None,
            state: CursorState::Unbound,
        }
    }

    /// Fresh identity for a pooled cursor handed out again
    pub(crate) fn reset(&mut self, handle: CursorHandle) {
        self.handle = handle;
        self.ctx = None;
        self.binding = None;
        self.state = CursorState::Unbound;
    }

    pub(crate) fn bind(&mut self, ctx: &Arc<TxContext>, binding: B) -> KernelResult<()> {
        if self.is_closed() {
            return Err(KernelError::CursorClosed);
        }
        ctx.ensure_open()?;
        self.ctx = Some(Arc::clone(ctx));
        self.binding = Some(binding);
        self.state = CursorState::BeforeFirst;
        Ok(())
    }

    /// One seek step; `seek` gets the binding and the last returned key
    pub(crate) fn advance<F>(&mut self, seek: F) -> KernelResult<bool>
    where
        F: FnOnce(&TxView<'_>, &B, Option<&K>) -> Option<K>,
    {
        if self.is_closed() {
            self.state = CursorState::Closed;
            return Err(KernelError::CursorClosed);
        }
        let after = match &self.state {
            CursorState::Unbound | CursorState::Exhausted => return Ok(false),
            CursorState::Closed => return Err(KernelError::CursorClosed),
            CursorState::BeforeFirst => None,
            CursorState::Positioned(key) => Some(key),
        };
        let (Some(ctx), Some(binding)) = (&self.ctx, &self.binding) else {
            return Ok(false);
        };
        let found = ctx.with_view(|view| seek(view, binding, after));
        self.state = match found {
            Some(key) => CursorState::Positioned(key),
            None => CursorState::Exhausted,
        };
        Ok(matches!(self.state, CursorState::Positioned(_)))
    }

    pub(crate) fn current(&self) -> Option<&K> {
        match &self.state {
            CursorState::Positioned(key) if !self.is_closed() => Some(key),
            _ => None,
        }
    }

    pub(crate) fn binding(&self) -> Option<&B> {
        self.binding.as_ref()
    }

    pub(crate) fn context(&self) -> Option<&Arc<TxContext>> {
        self.ctx.as_ref()
    }

    /// Context and key of a positioned cursor, for populating other cursors
    pub(crate) fn positioned(&self) -> KernelResult<(&Arc<TxContext>, &K)> {
        if self.is_closed() {
            return Err(KernelError::CursorClosed);
        }
        match (&self.ctx, &self.state) {
            (Some(ctx), CursorState::Positioned(key)) => Ok((ctx, key)),
            _ => Err(KernelError::CursorNotPositioned),
        }
    }

    /// Run `f` against the current entity, `None` when not positioned
    pub(crate) fn read_current<R>(&self, f: impl FnOnce(&TxView<'_>, &K) -> R) -> Option<R> {
        let key = self.current()?;
        let ctx = self.ctx.as_ref()?;
        Some(ctx.with_view(|view| f(view, key)))
    }

    pub(crate) fn close(&mut self) {
        self.handle.close();
        self.state = CursorState::Closed;
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub(crate) fn suspend(&self) -> KernelResult<CursorPosition<K, B>> {
        if self.is_closed() {
            return Err(KernelError::CursorClosed);
        }
        Ok(CursorPosition {
            owner: self.handle.id(),
            state: self.state.clone(),
            binding: self.binding.clone(),
        })
    }

    pub(crate) fn resume(&mut self, position: CursorPosition<K, B>) -> KernelResult<()> {
        if self.is_closed() {
            return Err(KernelError::CursorClosed);
        }
        if position.owner != self.handle.id() {
            return Err(KernelError::ForeignCursorPosition);
        }
        self.state = position.state;
        self.binding = position.binding;
        Ok(())
    }
}
