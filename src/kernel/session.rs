//! Kernel handle and sessions
//!
//! [`Kernel`] owns the committed store, the token registry and the lock
//! manager; cloning it is cheap. A [`Session`] is the authenticated scope
//! transactions are begun from.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::context::TxContext;
use super::locking::{LockClient, LockManager, Locks};
use super::transaction::Transaction;
use crate::config::KernelConfig;
use crate::cursor::CursorFactory;
use crate::error::{KernelError, KernelResult};
use crate::graph::{GraphStatistics, GraphStore, TokenRegistry, TxId};

/// Credentials presented when opening a session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthToken {
    #[default]
    None,
    Basic { principal: String, credentials: String },
}

impl AuthToken {
    pub fn basic(principal: impl Into<String>, credentials: impl Into<String>) -> Self {
        AuthToken::Basic {
            principal: principal.into(),
            credentials: credentials.into(),
        }
    }

    pub fn principal(&self) -> Option<&str> {
        match self {
            AuthToken::None => None,
            AuthToken::Basic { principal, .. } => Some(principal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct KernelInner {
    store: Arc<RwLock<GraphStore>>,
    tokens: Arc<TokenRegistry>,
    locks: Arc<LockManager>,
    config: KernelConfig,
    next_tx_id: AtomicU64,
}

/// Handle to one in-memory graph database
#[derive(Debug, Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Kernel {
    pub fn new(config: KernelConfig) -> Self {
        info!(
            lock_timeout_ms = config.lock_timeout_ms,
            cursor_pool_capacity = config.cursor_pool_capacity,
            "kernel started"
        );
        Kernel {
            inner: Arc::new(KernelInner {
                store: Arc::new(RwLock::new(GraphStore::new())),
                tokens: Arc::new(TokenRegistry::new()),
                locks: Arc::new(LockManager::new()),
                config,
                next_tx_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn begin_session(&self, auth: AuthToken) -> KernelResult<Session> {
        if let AuthToken::Basic { principal, .. } = &auth {
            if principal.is_empty() {
                return Err(KernelError::InvalidAuthToken);
            }
        }
        let session = Session {
            id: SessionId(Uuid::new_v4()),
            kernel: self.clone(),
            auth,
            live: Arc::new(AtomicUsize::new(0)),
            closed: false,
        };
        debug!(session = %session.id, principal = ?session.auth.principal(), "session opened");
        Ok(session)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.inner.config
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.inner.tokens
    }

    /// Committed store statistics
    pub fn statistics(&self) -> GraphStatistics {
        self.inner.store.read().statistics()
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.inner.locks
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::new(KernelConfig::default())
    }
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    kernel: Kernel,
    auth: AuthToken,
    live: Arc<AtomicUsize>,
    closed: bool,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn auth(&self) -> &AuthToken {
        &self.auth
    }

    pub fn begin_transaction(&self) -> KernelResult<Transaction> {
        if self.closed {
            return Err(KernelError::SessionClosed);
        }
        let inner = &self.kernel.inner;
        let id = TxId(inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        let locks: Arc<dyn Locks> = inner.locks.clone();
        Ok(Transaction::new(
            TxContext::new(id, Arc::clone(&inner.store)),
            LockClient::new(id, locks, inner.config.lock_timeout()),
            Arc::clone(&inner.tokens),
            CursorFactory::new(inner.config.cursor_pool_capacity, inner.config.track_cursor_leaks),
            Arc::clone(&self.live),
        ))
    }

    /// Transactions begun from this session and not closed yet
    pub fn open_transactions(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Fails while transactions of this session are still open
    pub fn close(&mut self) -> KernelResult<()> {
        if self.closed {
            return Ok(());
        }
        match self.open_transactions() {
            0 => {
                self.closed = true;
                debug!(session = %self.id, "session closed");
                Ok(())
            }
            open => Err(KernelError::SessionHasOpenTransactions(open)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
