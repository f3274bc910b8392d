//! Transaction lifecycle
//!
//! A transaction is `Active` until [`Transaction::close`]. Closing commits
//! when only success was marked and rolls back otherwise; marking both is a
//! usage error reported by `close` after rolling back. Whatever the
//! outcome, closing closes every cursor the transaction handed out and
//! releases every lock it holds.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::context::TxContext;
use super::locking::LockClient;
use super::read::{Read, SchemaRead};
use super::write::{SchemaWrite, TokenWrite, Write};
use crate::cursor::CursorFactory;
use crate::error::{KernelError, KernelResult};
use crate::graph::{TokenRegistry, TxId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
    /// Commit was attempted and failed; the delta was discarded
    FailedToClose,
}

#[derive(Debug)]
pub struct Transaction {
    ctx: Arc<TxContext>,
    locks: LockClient,
    tokens: Arc<TokenRegistry>,
    cursors: CursorFactory,
    start_time: DateTime<Utc>,
    success: bool,
    failure: bool,
    state: TransactionState,
    /// Open-transaction counter of the owning session
    live: Arc<AtomicUsize>,
}

impl Transaction {
    pub(crate) fn new(
        ctx: Arc<TxContext>,
        locks: LockClient,
        tokens: Arc<TokenRegistry>,
        cursors: CursorFactory,
        live: Arc<AtomicUsize>,
    ) -> Self {
        live.fetch_add(1, Ordering::AcqRel);
        debug!(tx = %ctx.id(), "transaction started");
        Transaction {
            ctx,
            locks,
            tokens,
            cursors,
            start_time: Utc::now(),
            success: false,
            failure: false,
            state: TransactionState::Active,
            live,
        }
    }

    pub fn id(&self) -> TxId {
        self.ctx.id()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn is_open(&self) -> bool {
        self.state == TransactionState::Active
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Whether the delta holds any uncommitted change
    pub fn has_tx_state_with_changes(&self) -> bool {
        self.is_open() && self.ctx.has_changes()
    }

    pub fn data_read(&self) -> Read<'_> {
        Read::new(&self.ctx)
    }

    pub fn data_write(&self) -> Write<'_> {
        Write::new(&self.ctx, &self.locks)
    }

    pub fn token_write(&self) -> TokenWrite<'_> {
        TokenWrite::new(&self.ctx, &self.tokens)
    }

    pub fn schema_read(&self) -> SchemaRead<'_> {
        SchemaRead::new(&self.ctx)
    }

    pub fn schema_write(&self) -> SchemaWrite<'_> {
        SchemaWrite::new(&self.ctx, &self.locks)
    }

    pub fn cursors(&self) -> &CursorFactory {
        &self.cursors
    }

    /// Mark the transaction to commit on close
    pub fn success(&mut self) -> KernelResult<()> {
        self.ensure_active()?;
        self.success = true;
        Ok(())
    }

    /// Mark the transaction to roll back on close
    pub fn failure(&mut self) -> KernelResult<()> {
        self.ensure_active()?;
        self.failure = true;
        Ok(())
    }

    fn ensure_active(&self) -> KernelResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(KernelError::TransactionClosed(self.id()))
        }
    }

    /// Commit or roll back, then release cursors and locks
    ///
    /// Closing an already closed transaction does nothing.
    pub fn close(&mut self) -> KernelResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        let leaked = self.cursors.close_all();
        if leaked > 0 && self.cursors.track_leaks() {
            warn!(tx = %self.id(), leaked, "transaction closed with open cursors");
        }

        let outcome = match (self.success, self.failure) {
            (true, true) => {
                self.ctx.rollback();
                self.state = TransactionState::RolledBack;
                Err(KernelError::TransactionMarkedBothSuccessAndFailure)
            }
            (true, false) => match self.ctx.commit() {
                Ok(version) => {
                    debug!(tx = %self.id(), version, "transaction committed");
                    self.state = TransactionState::Committed;
                    Ok(())
                }
                Err(err) => {
                    warn!(tx = %self.id(), error = %err, "commit failed, rolled back");
                    self.ctx.rollback();
                    self.state = TransactionState::FailedToClose;
                    Err(err)
                }
            },
            _ => {
                self.ctx.rollback();
                self.state = TransactionState::RolledBack;
                debug!(tx = %self.id(), "transaction rolled back");
                Ok(())
            }
        };

        self.ctx.mark_closed();
        self.locks.release_all();
        self.live.fetch_sub(1, Ordering::AcqRel);
        outcome
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.is_open() {
            warn!(tx = %self.id(), "transaction dropped without close, rolling back");
            self.success = false;
            let _ = self.close();
        }
    }
}
