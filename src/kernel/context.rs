//! State shared between a transaction and the cursors it populated
//!
//! Cursors hold an `Arc<TxContext>` instead of borrowing the transaction, so
//! they can be stored, pooled and nested freely. Every read takes the
//! transaction-state lock and then the store read lock for the duration of
//! one call; commit takes the same two locks in the same order, with the
//! store lock exclusive.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::txstate::TxState;
use super::view::TxView;
use crate::error::{KernelError, KernelResult};
use crate::graph::{GraphStore, TxId};

#[derive(Debug)]
pub struct TxContext {
    id: TxId,
    store: Arc<RwLock<GraphStore>>,
    state: Mutex<TxState>,
    open: AtomicBool,
}

impl TxContext {
    pub(crate) fn new(id: TxId, store: Arc<RwLock<GraphStore>>) -> Arc<Self> {
        Arc::new(TxContext {
            id,
            store,
            state: Mutex::new(TxState::new()),
            open: AtomicBool::new(true),
        })
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn ensure_open(&self) -> KernelResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(KernelError::TransactionClosed(self.id))
        }
    }

    pub(crate) fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Run `f` against the merged view; must not be nested
    pub fn with_view<R>(&self, f: impl FnOnce(&TxView<'_>) -> R) -> R {
        let state = self.state.lock();
        let store = self.store.read();
        f(&TxView::new(&store, &state))
    }

    /// Mutate the transaction state with read access to the store
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&GraphStore, &mut TxState) -> R) -> R {
        let mut state = self.state.lock();
        let store = self.store.read();
        f(&store, &mut state)
    }

    pub fn has_changes(&self) -> bool {
        self.state.lock().has_changes()
    }

    /// Validate and apply the delta; returns the commit version
    pub(crate) fn commit(&self) -> KernelResult<u64> {
        let mut state = self.state.lock();
        let mut store = self.store.write();
        TxView::new(&store, &state).validate_commit()?;
        let version = store.apply(&state);
        state.clear();
        Ok(version)
    }

    pub(crate) fn rollback(&self) {
        self.state.lock().clear();
    }
}
