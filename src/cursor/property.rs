//! Property cursor over the merged property set of one entity, in key order

use std::sync::Arc;

use super::{Cursor, CursorCore, CursorHandle, CursorPosition, NO_VALUE};
use crate::error::KernelResult;
use crate::graph::{PropertyKeyId, PropertyValue};
use crate::kernel::context::TxContext;
use crate::kernel::view::{PropertyEntry, PropertyOwner};

pub type PropertyPosition = CursorPosition<PropertyEntry, PropertyOwner>;

#[derive(Debug)]
pub struct PropertyCursor {
    core: CursorCore<PropertyEntry, PropertyOwner>,
}

impl PropertyCursor {
    pub(crate) fn new(handle: CursorHandle) -> Self {
        PropertyCursor {
            core: CursorCore::new(handle),
        }
    }

    pub(crate) fn reset(&mut self, handle: CursorHandle) {
        self.core.reset(handle);
    }

    pub(crate) fn bind(&mut self, ctx: &Arc<TxContext>, owner: PropertyOwner) -> KernelResult<()> {
        self.core.bind(ctx, owner)
    }

    pub fn owner(&self) -> Option<PropertyOwner> {
        self.core.binding().copied()
    }

    pub fn property_key(&self) -> PropertyKeyId {
        self.core.current().map_or(PropertyKeyId::NONE, |entry| entry.key)
    }

    /// Value read when the cursor stepped onto this key; `Null` if unpositioned
    pub fn property_value(&self) -> &PropertyValue {
        self.core.current().map_or(&NO_VALUE, |entry| &entry.value)
    }
}

impl Cursor for PropertyCursor {
    type Position = PropertyPosition;

    fn next(&mut self) -> KernelResult<bool> {
        self.core
            .advance(|view, owner, after| view.next_property(*owner, after.map(|entry| entry.key)))
    }

    core_lifecycle!();
}
