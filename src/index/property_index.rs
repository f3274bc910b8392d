//! B-Tree based property index for ordered seeks
//!
//! Entries are `(value, node)` pairs, so one index answers exact, range,
//! prefix and existence queries in value order, ties broken by node
//! reference. Seeks are positional: a cursor passes the last entry it
//! returned and gets the next one in the requested direction.

use crate::graph::{NodeId, PropertyValue};
use std::collections::BTreeSet;
use std::ops::Bound;

use super::query::IndexQuery;

/// One index entry: the indexed value and the node carrying it
pub type IndexEntry = (PropertyValue, NodeId);

/// Index for a specific property on a specific label
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    entries: BTreeSet<IndexEntry>,
}

fn lower_entry(bound: Bound<PropertyValue>) -> Bound<IndexEntry> {
    match bound {
        Bound::Included(v) => Bound::Included((v, NodeId::new(0))),
        Bound::Excluded(v) => Bound::Excluded((v, NodeId::NONE)),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn upper_entry(bound: Bound<PropertyValue>) -> Bound<IndexEntry> {
    match bound {
        Bound::Included(v) => Bound::Included((v, NodeId::NONE)),
        Bound::Excluded(v) => Bound::Excluded((v, NodeId::new(0))),
        Bound::Unbounded => Bound::Unbounded,
    }
}

fn narrow_lower(lower: Bound<IndexEntry>, after: &IndexEntry) -> Bound<IndexEntry> {
    let passed = match &lower {
        Bound::Included(x) | Bound::Excluded(x) => after >= x,
        Bound::Unbounded => true,
    };
    if passed {
        Bound::Excluded(after.clone())
    } else {
        lower
    }
}

fn narrow_upper(upper: Bound<IndexEntry>, before: &IndexEntry) -> Bound<IndexEntry> {
    let passed = match &upper {
        Bound::Included(x) | Bound::Excluded(x) => before <= x,
        Bound::Unbounded => true,
    };
    if passed {
        Bound::Excluded(before.clone())
    } else {
        upper
    }
}

// BTreeSet::range panics on inverted bounds
fn is_empty_range<T: Ord>(lower: &Bound<T>, upper: &Bound<T>) -> bool {
    match (lower, upper) {
        (Bound::Included(a), Bound::Included(b)) => a > b,
        (Bound::Included(a), Bound::Excluded(b))
        | (Bound::Excluded(a), Bound::Included(b))
        | (Bound::Excluded(a), Bound::Excluded(b)) => a >= b,
        _ => false,
    }
}

impl PropertyIndex {
    pub fn new() -> Self {
        Self {
            entries: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, value: PropertyValue, node_id: NodeId) {
        self.entries.insert((value, node_id));
    }

    pub fn remove(&mut self, value: &PropertyValue, node_id: NodeId) {
        self.entries.remove(&(value.clone(), node_id));
    }

    /// Nodes carrying exactly `value`, in reference order
    pub fn get(&self, value: &PropertyValue) -> Vec<NodeId> {
        self.entries
            .range((value.clone(), NodeId::new(0))..=(value.clone(), NodeId::NONE))
            .map(|(_, node)| *node)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> + '_ {
        self.entries.iter()
    }

    /// First entry matching `query` strictly after `after` in scan direction
    ///
    /// `skip` lets the caller hide entries (e.g. nodes changed by a
    /// transaction) without losing the position.
    pub fn seek<F>(
        &self,
        query: &IndexQuery,
        after: Option<&IndexEntry>,
        descending: bool,
        mut skip: F,
    ) -> Option<IndexEntry>
    where
        F: FnMut(&IndexEntry) -> bool,
    {
        let (low, high) = query.value_bounds();
        let mut lower = lower_entry(low);
        let mut upper = upper_entry(high);
        if let Some(after) = after {
            if descending {
                upper = narrow_upper(upper, after);
            } else {
                lower = narrow_lower(lower, after);
            }
        }
        if is_empty_range(&lower, &upper) {
            return None;
        }

        let mut accept = |entry: &&IndexEntry| query.matches(&entry.0) && !skip(*entry);
        let mut range = self.entries.range((lower, upper));
        let found = if descending {
            range.rev().find(&mut accept)
        } else {
            range.find(&mut accept)
        };
        found.cloned()
    }
}
