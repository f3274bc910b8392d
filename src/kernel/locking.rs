//! Lock manager and per-transaction lock client
//!
//! Locks are shared/exclusive, reentrant per owner and held until the
//! owning transaction closes (strict two-phase locking). An owner that is
//! the only shared holder may upgrade to exclusive. Waits are bounded by a
//! timeout; a timed-out acquisition reports `false` and the lock client
//! turns that into [`KernelError::LockTimeout`].
//!
//! Granularity:
//! - `Node` / `Relationship`: taken exclusively by writes to that entity
//!   (relationship creation locks both endpoints, lowest reference first)
//! - `Schema { label, property }`: taken exclusively by index and
//!   constraint creation/drop on that pair, shared by data writes that
//!   touch a node carrying `label` on key `property`

use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{KernelError, KernelResult};
use crate::graph::{LabelId, NodeId, PropertyKeyId, RelationshipId, TxId};

/// Lockable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKey {
    Node(NodeId),
    Relationship(RelationshipId),
    Schema { label: LabelId, property: PropertyKeyId },
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKey::Node(id) => write!(f, "{}", id),
            ResourceKey::Relationship(id) => write!(f, "{}", id),
            ResourceKey::Schema { label, property } => write!(f, "schema({}, {})", label, property),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Observable lock manager contract
pub trait Locks: Send + Sync {
    /// Returns `false` if the lock could not be granted within `timeout`
    fn acquire_shared(&self, owner: TxId, key: ResourceKey, timeout: Duration) -> bool;

    fn acquire_exclusive(&self, owner: TxId, key: ResourceKey, timeout: Duration) -> bool;

    fn release(&self, owner: TxId, key: ResourceKey);

    fn release_all(&self, owner: TxId);
}

#[derive(Debug, Default)]
struct LockEntry {
    shared: FxHashSet<TxId>,
    exclusive: Option<TxId>,
}

impl LockEntry {
    fn can_grant(&self, owner: TxId, mode: LockMode) -> bool {
        let exclusive_ok = self.exclusive.map_or(true, |holder| holder == owner);
        match mode {
            LockMode::Shared => exclusive_ok,
            LockMode::Exclusive => {
                exclusive_ok && self.shared.iter().all(|holder| *holder == owner)
            }
        }
    }

    fn grant(&mut self, owner: TxId, mode: LockMode) {
        match mode {
            LockMode::Shared => {
                self.shared.insert(owner);
            }
            LockMode::Exclusive => self.exclusive = Some(owner),
        }
    }

    fn is_free(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }
}

#[derive(Debug, Default)]
struct LockTable {
    entries: FxHashMap<ResourceKey, LockEntry>,
    held: FxHashMap<TxId, FxHashSet<ResourceKey>>,
}

impl LockTable {
    fn release(&mut self, owner: TxId, key: ResourceKey) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.shared.remove(&owner);
            if entry.exclusive == Some(owner) {
                entry.exclusive = None;
            }
            if entry.is_free() {
                self.entries.remove(&key);
            }
        }
    }
}

/// In-process lock manager shared by all transactions of a kernel
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&self, owner: TxId, key: ResourceKey, mode: LockMode, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut table = self.table.lock();
        let mut waited = false;
        loop {
            let entry = table.entries.entry(key).or_default();
            if entry.can_grant(owner, mode) {
                entry.grant(owner, mode);
                table.held.entry(owner).or_default().insert(key);
                return true;
            }
            if !waited {
                debug!("{} waiting for {:?} lock on {}", owner, mode, key);
                waited = true;
            }
            if self.released.wait_until(&mut table, deadline).timed_out() {
                let entry = table.entries.entry(key).or_default();
                if entry.can_grant(owner, mode) {
                    entry.grant(owner, mode);
                    table.held.entry(owner).or_default().insert(key);
                    return true;
                }
                if entry.is_free() {
                    table.entries.remove(&key);
                }
                warn!("{} timed out waiting for {:?} lock on {}", owner, mode, key);
                return false;
            }
        }
    }

    /// Resources currently held by `owner`
    pub fn held_by(&self, owner: TxId) -> Vec<ResourceKey> {
        let table = self.table.lock();
        let mut keys: Vec<ResourceKey> = table
            .held
            .get(&owner)
            .map(|keys| keys.iter().copied().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Number of resources with at least one holder
    pub fn locked_resources(&self) -> usize {
        self.table.lock().entries.len()
    }
}

impl Locks for LockManager {
    fn acquire_shared(&self, owner: TxId, key: ResourceKey, timeout: Duration) -> bool {
        self.acquire(owner, key, LockMode::Shared, timeout)
    }

    fn acquire_exclusive(&self, owner: TxId, key: ResourceKey, timeout: Duration) -> bool {
        self.acquire(owner, key, LockMode::Exclusive, timeout)
    }

    fn release(&self, owner: TxId, key: ResourceKey) {
        let mut table = self.table.lock();
        table.release(owner, key);
        if let Some(keys) = table.held.get_mut(&owner) {
            keys.remove(&key);
        }
        drop(table);
        self.released.notify_all();
    }

    fn release_all(&self, owner: TxId) {
        let mut table = self.table.lock();
        if let Some(keys) = table.held.remove(&owner) {
            for key in keys {
                table.release(owner, key);
            }
        }
        drop(table);
        self.released.notify_all();
    }
}

/// Lock handle of one transaction
pub struct LockClient {
    owner: TxId,
    locks: Arc<dyn Locks>,
    timeout: Duration,
}

impl LockClient {
    pub fn new(owner: TxId, locks: Arc<dyn Locks>, timeout: Duration) -> Self {
        LockClient { owner, locks, timeout }
    }

    pub fn owner(&self) -> TxId {
        self.owner
    }

    pub fn shared(&self, key: ResourceKey) -> KernelResult<()> {
        if self.locks.acquire_shared(self.owner, key, self.timeout) {
            Ok(())
        } else {
            Err(self.timed_out(key))
        }
    }

    pub fn exclusive(&self, key: ResourceKey) -> KernelResult<()> {
        if self.locks.acquire_exclusive(self.owner, key, self.timeout) {
            Ok(())
        } else {
            Err(self.timed_out(key))
        }
    }

    /// Lock both endpoints of a relationship, lowest reference first
    pub fn exclusive_nodes(&self, a: NodeId, b: NodeId) -> KernelResult<()> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        self.exclusive(ResourceKey::Node(first))?;
        if second != first {
            self.exclusive(ResourceKey::Node(second))?;
        }
        Ok(())
    }

    pub fn release_all(&self) {
        self.locks.release_all(self.owner);
    }

    fn timed_out(&self, resource: ResourceKey) -> KernelError {
        KernelError::LockTimeout {
            resource,
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

impl fmt::Debug for LockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockClient")
            .field("owner", &self.owner)
            .field("timeout", &self.timeout)
            .finish()
    }
}
