//! Cursor allocation, pooling and leak tracking
//!
//! Every cursor a transaction hands out is registered by its closed flag.
//! Closing the transaction closes them all; a checkpoint can assert that
//! callers closed everything they allocated. Closed cursors may be handed
//! back with [`CursorFactory::recycle`] and are reused by later allocations
//! of the same type.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

use super::{
    Cursor, CursorHandle, NodeCursor, NodeLabelIndexCursor, NodeValueIndexCursor, PropertyCursor,
    RelationshipGroupCursor, RelationshipScanCursor, RelationshipTraversalCursor,
};
use crate::error::{KernelError, KernelResult};

/// Per-type free lists
#[derive(Debug, Default)]
pub struct CursorPool {
    nodes: Vec<NodeCursor>,
    relationship_scans: Vec<RelationshipScanCursor>,
    traversals: Vec<RelationshipTraversalCursor>,
    groups: Vec<RelationshipGroupCursor>,
    properties: Vec<PropertyCursor>,
    label_indexes: Vec<NodeLabelIndexCursor>,
    value_indexes: Vec<NodeValueIndexCursor>,
}

impl CursorPool {
    fn len(&self) -> usize {
        self.nodes.len()
            + self.relationship_scans.len()
            + self.traversals.len()
            + self.groups.len()
            + self.properties.len()
            + self.label_indexes.len()
            + self.value_indexes.len()
    }
}

/// A store-backed cursor type the factory can allocate and pool
pub trait Poolable: Cursor + Sized {
    fn slot(pool: &mut CursorPool) -> &mut Vec<Self>;

    fn fresh(handle: CursorHandle) -> Self;

    /// Forget the previous binding and take on a new identity
    fn reuse(&mut self, handle: CursorHandle);
}

macro_rules! poolable {
    ($cursor:ty, $slot:ident) => {
        impl Poolable for $cursor {
            fn slot(pool: &mut CursorPool) -> &mut Vec<Self> {
                &mut pool.$slot
            }

            fn fresh(handle: CursorHandle) -> Self {
                <$cursor>::new(handle)
            }

            fn reuse(&mut self, handle: CursorHandle) {
                self.reset(handle);
            }
        }
    };
}

poolable!(NodeCursor, nodes);
poolable!(RelationshipScanCursor, relationship_scans);
poolable!(RelationshipTraversalCursor, traversals);
poolable!(RelationshipGroupCursor, groups);
poolable!(PropertyCursor, properties);
poolable!(NodeLabelIndexCursor, label_indexes);
poolable!(NodeValueIndexCursor, value_indexes);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStatistics {
    /// Cursors constructed from scratch
    pub allocated: usize,
    /// Allocations served from the pool
    pub reused: usize,
    /// Cursors handed back and kept
    pub recycled: usize,
    /// Cursors currently waiting in the pool
    pub pooled: usize,
}

#[derive(Debug, Default)]
struct FactoryInner {
    registry: Vec<Arc<AtomicBool>>,
    pool: CursorPool,
    stats: PoolStatistics,
}

#[derive(Debug)]
pub struct CursorFactory {
    inner: Mutex<FactoryInner>,
    capacity: usize,
    track_leaks: bool,
}

impl CursorFactory {
    pub fn new(capacity: usize, track_leaks: bool) -> Self {
        CursorFactory {
            inner: Mutex::new(FactoryInner::default()),
            capacity,
            track_leaks,
        }
    }

    pub fn track_leaks(&self) -> bool {
        self.track_leaks
    }

    /// Allocate any poolable cursor type, reusing a pooled one if available
    pub fn allocate<C: Poolable>(&self) -> C {
        let handle = CursorHandle::new();
        let mut inner = self.inner.lock();
        inner.registry.retain(|flag| !flag.load(Ordering::Acquire));
        inner.registry.push(handle.flag());
        match C::slot(&mut inner.pool).pop() {
            Some(mut cursor) => {
                cursor.reuse(handle);
                inner.stats.reused += 1;
                cursor
            }
            None => {
                inner.stats.allocated += 1;
                C::fresh(handle)
            }
        }
    }

    pub fn allocate_node_cursor(&self) -> NodeCursor {
        self.allocate()
    }

    pub fn allocate_relationship_scan_cursor(&self) -> RelationshipScanCursor {
        self.allocate()
    }

    pub fn allocate_relationship_traversal_cursor(&self) -> RelationshipTraversalCursor {
        self.allocate()
    }

    pub fn allocate_relationship_group_cursor(&self) -> RelationshipGroupCursor {
        self.allocate()
    }

    pub fn allocate_property_cursor(&self) -> PropertyCursor {
        self.allocate()
    }

    pub fn allocate_node_label_index_cursor(&self) -> NodeLabelIndexCursor {
        self.allocate()
    }

    pub fn allocate_node_value_index_cursor(&self) -> NodeValueIndexCursor {
        self.allocate()
    }

    /// Close `cursor` and keep it for reuse while the pool has room
    pub fn recycle<C: Poolable>(&self, mut cursor: C) {
        cursor.close();
        let mut inner = self.inner.lock();
        if inner.pool.len() < self.capacity {
            C::slot(&mut inner.pool).push(cursor);
            inner.stats.recycled += 1;
        }
    }

    /// Cursors handed out and not yet closed
    pub fn open_cursors(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .registry
            .iter()
            .filter(|flag| !flag.load(Ordering::Acquire))
            .count()
    }

    /// Checkpoint: fails with the number of cursors still open
    pub fn assert_all_closed(&self) -> KernelResult<()> {
        match self.open_cursors() {
            0 => Ok(()),
            open => Err(KernelError::CursorsLeaked(open)),
        }
    }

    pub fn statistics(&self) -> PoolStatistics {
        let inner = self.inner.lock();
        PoolStatistics {
            pooled: inner.pool.len(),
            ..inner.stats
        }
    }

    /// Close every registered cursor; returns how many were still open
    pub(crate) fn close_all(&self) -> usize {
        let mut inner = self.inner.lock();
        let open = inner
            .registry
            .drain(..)
            .filter(|flag| !flag.swap(true, Ordering::AcqRel))
            .count();
        inner.pool = CursorPool::default();
        trace!(open, "closed all cursors");
        open
    }
}
