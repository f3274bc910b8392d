//! Write surface: data, token and schema mutations
//!
//! Writes go to the transaction delta and become visible to other
//! transactions on commit. Every write first takes the locks it needs,
//! outside of the state and store guards, and then validates against the
//! merged view while holding them.

use std::sync::Arc;
use tracing::debug;

use super::context::TxContext;
use super::locking::{LockClient, ResourceKey};
use super::view::TxView;
use crate::error::{EntityRef, KernelError, KernelResult};
use crate::graph::{
    LabelId, NodeId, PropertyKeyId, PropertyValue, RelTypeId, RelationshipId, RelationshipRecord,
    TokenRegistry,
};
use crate::index::{ConstraintDescriptor, IndexDescriptor};

fn node_not_found(node: NodeId) -> KernelError {
    KernelError::EntityNotFound(EntityRef::Node(node.as_u64()))
}

fn relationship_not_found(relationship: RelationshipId) -> KernelError {
    KernelError::EntityNotFound(EntityRef::Relationship(relationship.as_u64()))
}

#[derive(Debug, Clone, Copy)]
pub struct Write<'t> {
    ctx: &'t Arc<TxContext>,
    locks: &'t LockClient,
}

impl<'t> Write<'t> {
    pub(crate) fn new(ctx: &'t Arc<TxContext>, locks: &'t LockClient) -> Self {
        Write { ctx, locks }
    }

    pub fn node_create(&self) -> KernelResult<NodeId> {
        self.ctx.ensure_open()?;
        Ok(self.ctx.with_state(|store, state| {
            let id = store.allocate_node_id();
            state.node_create(id);
            id
        }))
    }

    /// Delete a node without relationships
    ///
    /// Returns `false` if the node is not visible. A node that still has
    /// relationships is never deleted implicitly.
    pub fn node_delete(&self, node: NodeId) -> KernelResult<bool> {
        self.ctx.ensure_open()?;
        self.locks.exclusive(ResourceKey::Node(node))?;
        self.ctx.with_state(|store, state| {
            let degree = {
                let view = TxView::new(store, state);
                if !view.node_exists(node) {
                    return Ok(false);
                }
                view.degree(node)
            };
            if degree > 0 {
                return Err(KernelError::NodeHasRelationships { node, degree });
            }
            if !state.node_delete_created(node) {
                state.node_delete_committed(node);
            }
            Ok(true)
        })
    }

    pub fn relationship_create(
        &self,
        source: NodeId,
        rel_type: RelTypeId,
        target: NodeId,
    ) -> KernelResult<RelationshipId> {
        self.ctx.ensure_open()?;
        self.locks.exclusive_nodes(source, target)?;
        self.ctx.with_state(|store, state| {
            {
                let view = TxView::new(store, state);
                for node in [source, target] {
                    if !view.node_exists(node) {
                        return Err(node_not_found(node));
                    }
                }
            }
            let id = store.allocate_relationship_id();
            state.relationship_create(RelationshipRecord::new(id, source, rel_type, target));
            Ok(id)
        })
    }

    /// Returns `false` if the relationship is not visible
    pub fn relationship_delete(&self, relationship: RelationshipId) -> KernelResult<bool> {
        self.ctx.ensure_open()?;
        let Some(entry) = self.ctx.with_view(|view| view.relationship(relationship)) else {
            return Ok(false);
        };
        self.locks.exclusive_nodes(entry.source, entry.target)?;
        self.locks.exclusive(ResourceKey::Relationship(relationship))?;
        self.ctx.with_state(|store, state| {
            if !TxView::new(store, state).relationship_exists(relationship) {
                return Ok(false);
            }
            if !state.relationship_delete_created(relationship) {
                state.relationship_delete_committed(relationship);
            }
            Ok(true)
        })
    }

    /// Returns `false` if the node already carries the label
    pub fn node_add_label(&self, node: NodeId, label: LabelId) -> KernelResult<bool> {
        self.ctx.ensure_open()?;
        self.locks.exclusive(ResourceKey::Node(node))?;
        let properties = self
            .ctx
            .with_view(|view| view.node_properties(node))
            .ok_or_else(|| node_not_found(node))?;
        for key in properties.keys() {
            self.locks.shared(ResourceKey::Schema { label, property: *key })?;
        }
        self.ctx.with_state(|store, state| {
            let committed_has = {
                let view = TxView::new(store, state);
                if !view.node_exists(node) {
                    return Err(node_not_found(node));
                }
                if view.node_has_label(node, label) {
                    return Ok(false);
                }
                for (key, value) in &properties {
                    view.check_unique(node, label, *key, value)?;
                }
                view.committed_has_label(node, label)
            };
            state.node_add_label(node, label, committed_has);
            Ok(true)
        })
    }

    /// Returns `false` if the node does not carry the label
    pub fn node_remove_label(&self, node: NodeId, label: LabelId) -> KernelResult<bool> {
        self.ctx.ensure_open()?;
        self.locks.exclusive(ResourceKey::Node(node))?;
        self.ctx.with_state(|store, state| {
            let committed_has = {
                let view = TxView::new(store, state);
                if !view.node_exists(node) {
                    return Err(node_not_found(node));
                }
                if !view.node_has_label(node, label) {
                    return Ok(false);
                }
                view.committed_has_label(node, label)
            };
            state.node_remove_label(node, label, committed_has);
            Ok(true)
        })
    }

    /// Set a node property; `Null` removes it. Returns the previous value.
    pub fn node_set_property(
        &self,
        node: NodeId,
        key: PropertyKeyId,
        value: PropertyValue,
    ) -> KernelResult<Option<PropertyValue>> {
        self.ctx.ensure_open()?;
        self.locks.exclusive(ResourceKey::Node(node))?;
        let labels = self
            .ctx
            .with_view(|view| view.node_labels(node))
            .ok_or_else(|| node_not_found(node))?;
        for label in labels.iter() {
            self.locks.shared(ResourceKey::Schema { label, property: key })?;
        }
        let value = if value.is_null() { None } else { Some(value) };
        self.ctx.with_state(|store, state| {
            let (previous, committed) = {
                let view = TxView::new(store, state);
                if !view.node_exists(node) {
                    return Err(node_not_found(node));
                }
                if let Some(value) = &value {
                    for label in labels.iter() {
                        view.check_unique(node, label, key, value)?;
                    }
                }
                (
                    view.node_property(node, key),
                    view.committed_node_property(node, key).cloned(),
                )
            };
            if previous.is_none() && value.is_none() {
                return Ok(None);
            }
            state.node_set_property(node, key, value, committed.as_ref());
            Ok(previous)
        })
    }

    pub fn node_remove_property(&self, node: NodeId, key: PropertyKeyId) -> KernelResult<Option<PropertyValue>> {
        self.node_set_property(node, key, PropertyValue::Null)
    }

    /// Set a relationship property; `Null` removes it. Returns the previous value.
    pub fn relationship_set_property(
        &self,
        relationship: RelationshipId,
        key: PropertyKeyId,
        value: PropertyValue,
    ) -> KernelResult<Option<PropertyValue>> {
        self.ctx.ensure_open()?;
        self.locks.exclusive(ResourceKey::Relationship(relationship))?;
        let value = if value.is_null() { None } else { Some(value) };
        self.ctx.with_state(|store, state| {
            let (previous, committed) = {
                let view = TxView::new(store, state);
                if !view.relationship_exists(relationship) {
                    return Err(relationship_not_found(relationship));
                }
                (
                    view.relationship_property(relationship, key),
                    view.committed_relationship_property(relationship, key).cloned(),
                )
            };
            if previous.is_none() && value.is_none() {
                return Ok(None);
            }
            state.relationship_set_property(relationship, key, value, committed.as_ref());
            Ok(previous)
        })
    }

    pub fn relationship_remove_property(
        &self,
        relationship: RelationshipId,
        key: PropertyKeyId,
    ) -> KernelResult<Option<PropertyValue>> {
        self.relationship_set_property(relationship, key, PropertyValue::Null)
    }
}

/// Token creation; tokens are shared and not rolled back
#[derive(Debug, Clone, Copy)]
pub struct TokenWrite<'t> {
    ctx: &'t Arc<TxContext>,
    tokens: &'t TokenRegistry,
}

impl<'t> TokenWrite<'t> {
    pub(crate) fn new(ctx: &'t Arc<TxContext>, tokens: &'t TokenRegistry) -> Self {
        TokenWrite { ctx, tokens }
    }

    pub fn label_get_or_create_for_name(&self, name: &str) -> KernelResult<LabelId> {
        self.ctx.ensure_open()?;
        self.tokens.label_get_or_create(name)
    }

    pub fn property_key_get_or_create_for_name(&self, name: &str) -> KernelResult<PropertyKeyId> {
        self.ctx.ensure_open()?;
        self.tokens.property_key_get_or_create(name)
    }

    pub fn relationship_type_get_or_create_for_name(&self, name: &str) -> KernelResult<RelTypeId> {
        self.ctx.ensure_open()?;
        self.tokens.relationship_type_get_or_create(name)
    }

    pub fn label_get_for_name(&self, name: &str) -> Option<LabelId> {
        self.tokens.label(name)
    }

    pub fn property_key_get_for_name(&self, name: &str) -> Option<PropertyKeyId> {
        self.tokens.property_key(name)
    }

    pub fn relationship_type_get_for_name(&self, name: &str) -> Option<RelTypeId> {
        self.tokens.relationship_type(name)
    }

    pub fn label_name(&self, label: LabelId) -> Option<String> {
        self.tokens.label_name(label)
    }

    pub fn property_key_name(&self, key: PropertyKeyId) -> Option<String> {
        self.tokens.property_key_name(key)
    }

    pub fn relationship_type_name(&self, rel_type: RelTypeId) -> Option<String> {
        self.tokens.relationship_type_name(rel_type)
    }
}

/// Index and constraint definition
///
/// Each operation holds the exclusive schema lock on its `(label,
/// property)` pair until the transaction closes, so two transactions
/// defining the same schema element are serialized and the second one
/// observes the first one's outcome.
#[derive(Debug, Clone, Copy)]
pub struct SchemaWrite<'t> {
    ctx: &'t Arc<TxContext>,
    locks: &'t LockClient,
}

impl<'t> SchemaWrite<'t> {
    pub(crate) fn new(ctx: &'t Arc<TxContext>, locks: &'t LockClient) -> Self {
        SchemaWrite { ctx, locks }
    }

    fn lock(&self, label: LabelId, property: PropertyKeyId) -> KernelResult<()> {
        self.ctx.ensure_open()?;
        self.locks.exclusive(ResourceKey::Schema { label, property })
    }

    pub fn index_create(&self, label: LabelId, property: PropertyKeyId) -> KernelResult<IndexDescriptor> {
        self.lock(label, property)?;
        let descriptor = IndexDescriptor::new(label, property);
        self.ctx.with_state(|store, state| {
            if TxView::new(store, state).index(label, property).is_some() {
                return Err(KernelError::IndexAlreadyExists { label, property });
            }
            let schema = state.schema_mut();
            if !schema.indexes_dropped.remove(&descriptor) {
                schema.indexes_created.insert(descriptor);
            }
            Ok(())
        })?;
        debug!(tx = %self.ctx.id(), index = %descriptor, "index created");
        Ok(descriptor)
    }

    /// Drop a plain index; constraint-owned indexes go with their constraint
    pub fn index_drop(&self, index: &IndexDescriptor) -> KernelResult<()> {
        let (label, property) = index.schema();
        self.lock(label, property)?;
        self.ctx.with_state(|store, state| {
            let visible = TxView::new(store, state).index(label, property).map(|(index, _)| index);
            let descriptor = match visible {
                None => return Err(KernelError::IndexNotFound { label, property }),
                Some(descriptor) if descriptor.unique => return Err(KernelError::IndexOwnedByConstraint),
                Some(descriptor) => descriptor,
            };
            let schema = state.schema_mut();
            if !schema.indexes_created.remove(&descriptor) {
                schema.indexes_dropped.insert(descriptor);
            }
            Ok(())
        })?;
        debug!(tx = %self.ctx.id(), index = %index, "index dropped");
        Ok(())
    }

    /// Create a uniqueness constraint and its owned index
    ///
    /// Fails with `ConstraintAlreadyExists` when the constraint is already
    /// visible, which includes one committed by a concurrent transaction
    /// that held the schema lock first.
    pub fn unique_property_constraint_create(
        &self,
        label: LabelId,
        property: PropertyKeyId,
    ) -> KernelResult<ConstraintDescriptor> {
        self.lock(label, property)?;
        let constraint = ConstraintDescriptor::unique(label, property);
        self.ctx.with_state(|store, state| {
            {
                let view = TxView::new(store, state);
                if view.constraint(label, property).is_some() {
                    return Err(KernelError::ConstraintAlreadyExists { label, property });
                }
                if view.index(label, property).is_some() {
                    return Err(KernelError::IndexAlreadyExists { label, property });
                }
                view.validate_constraint(label, property)?;
            }
            let schema = state.schema_mut();
            if !schema.constraints_dropped.remove(&constraint) {
                schema.constraints_created.insert(constraint);
            }
            Ok(())
        })?;
        debug!(tx = %self.ctx.id(), constraint = %constraint, "constraint created");
        Ok(constraint)
    }

    pub fn constraint_drop(&self, constraint: &ConstraintDescriptor) -> KernelResult<()> {
        let (label, property) = (constraint.label, constraint.property);
        self.lock(label, property)?;
        self.ctx.with_state(|store, state| {
            if TxView::new(store, state).constraint(label, property).is_none() {
                return Err(KernelError::NoSuchConstraint { label, property });
            }
            let schema = state.schema_mut();
            if !schema.constraints_created.remove(constraint) {
                schema.constraints_dropped.insert(*constraint);
            }
            Ok(())
        })?;
        debug!(tx = %self.ctx.id(), constraint = %constraint, "constraint dropped");
        Ok(())
    }
}
