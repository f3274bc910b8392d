//! Token interning for labels, relationship types and property keys
//!
//! Tokens are created outside of transactional isolation: once a name has an
//! id, every transaction sees it, and concurrent get-or-create calls for the
//! same name converge on a single id.

use indexmap::IndexSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{LabelId, PropertyKeyId, RelTypeId};
use crate::error::{KernelError, KernelResult};

/// Kind of token, used in error messages and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Label,
    RelationshipType,
    PropertyKey,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Label => write!(f, "label"),
            TokenKind::RelationshipType => write!(f, "relationship type"),
            TokenKind::PropertyKey => write!(f, "property key"),
        }
    }
}

/// Name <-> id table for one token kind; ids are dense insertion indices
#[derive(Debug)]
struct TokenTable {
    kind: TokenKind,
    names: RwLock<IndexSet<String>>,
}

impl TokenTable {
    fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            names: RwLock::new(IndexSet::new()),
        }
    }

    fn get_or_create(&self, name: &str) -> KernelResult<u32> {
        if name.is_empty() {
            return Err(KernelError::IllegalTokenName(self.kind));
        }
        if let Some(id) = self.names.read().get_index_of(name) {
            return Ok(id as u32);
        }
        let mut names = self.names.write();
        // Another caller may have won the race between the two locks
        let (id, created) = names.insert_full(name.to_string());
        if created {
            debug!("Created {} token {} = {}", self.kind, name, id);
        }
        Ok(id as u32)
    }

    fn get(&self, name: &str) -> Option<u32> {
        self.names.read().get_index_of(name).map(|id| id as u32)
    }

    fn name(&self, id: u32) -> Option<String> {
        self.names.read().get_index(id as usize).cloned()
    }

    fn len(&self) -> usize {
        self.names.read().len()
    }
}

/// Shared registry of all token kinds
#[derive(Debug)]
pub struct TokenRegistry {
    labels: TokenTable,
    relationship_types: TokenTable,
    property_keys: TokenTable,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self {
            labels: TokenTable::new(TokenKind::Label),
            relationship_types: TokenTable::new(TokenKind::RelationshipType),
            property_keys: TokenTable::new(TokenKind::PropertyKey),
        }
    }

    pub fn label_get_or_create(&self, name: &str) -> KernelResult<LabelId> {
        self.labels.get_or_create(name).map(LabelId)
    }

    pub fn relationship_type_get_or_create(&self, name: &str) -> KernelResult<RelTypeId> {
        self.relationship_types.get_or_create(name).map(RelTypeId)
    }

    pub fn property_key_get_or_create(&self, name: &str) -> KernelResult<PropertyKeyId> {
        self.property_keys.get_or_create(name).map(PropertyKeyId)
    }

    pub fn label(&self, name: &str) -> Option<LabelId> {
        self.labels.get(name).map(LabelId)
    }

    pub fn relationship_type(&self, name: &str) -> Option<RelTypeId> {
        self.relationship_types.get(name).map(RelTypeId)
    }

    pub fn property_key(&self, name: &str) -> Option<PropertyKeyId> {
        self.property_keys.get(name).map(PropertyKeyId)
    }

    pub fn label_name(&self, id: LabelId) -> Option<String> {
        self.labels.name(id.0)
    }

    pub fn relationship_type_name(&self, id: RelTypeId) -> Option<String> {
        self.relationship_types.name(id.0)
    }

    pub fn property_key_name(&self, id: PropertyKeyId) -> Option<String> {
        self.property_keys.name(id.0)
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn relationship_type_count(&self) -> usize {
        self.relationship_types.len()
    }

    pub fn property_key_count(&self) -> usize {
        self.property_keys.len()
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}
