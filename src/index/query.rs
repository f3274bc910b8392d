//! Index predicates and result ordering

use serde::{Deserialize, Serialize};
use std::ops::Bound;

use crate::graph::{PropertyValue, ValueCategory};

/// Requested order of index results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum IndexOrder {
    /// Implementation-defined (ascending in practice)
    #[default]
    None,
    Ascending,
    Descending,
}

impl IndexOrder {
    pub fn is_descending(&self) -> bool {
        matches!(self, IndexOrder::Descending)
    }
}

/// Value predicate for an index seek
#[derive(Debug, Clone, PartialEq)]
pub enum IndexQuery {
    Exact(PropertyValue),
    /// Range within the category of the given bound(s)
    Range {
        from: Bound<PropertyValue>,
        to: Bound<PropertyValue>,
    },
    StringPrefix(String),
    /// Any value
    Exists,
}

fn next_category(category: ValueCategory) -> Option<ValueCategory> {
    match category {
        ValueCategory::Map => Some(ValueCategory::Array),
        ValueCategory::Array => Some(ValueCategory::Temporal),
        ValueCategory::Temporal => Some(ValueCategory::Text),
        ValueCategory::Text => Some(ValueCategory::Boolean),
        ValueCategory::Boolean => Some(ValueCategory::Number),
        ValueCategory::Number => Some(ValueCategory::NoValue),
        ValueCategory::NoValue => None,
    }
}

fn bound_value(bound: &Bound<PropertyValue>) -> Option<&PropertyValue> {
    match bound {
        Bound::Included(v) | Bound::Excluded(v) => Some(v),
        Bound::Unbounded => None,
    }
}

impl IndexQuery {
    pub fn range(from: Bound<PropertyValue>, to: Bound<PropertyValue>) -> Self {
        IndexQuery::Range { from, to }
    }

    /// Category the predicate is restricted to; `None` means any
    pub fn value_category(&self) -> Option<ValueCategory> {
        match self {
            IndexQuery::Exact(v) => Some(v.category()),
            IndexQuery::Range { from, to } => bound_value(from)
                .or_else(|| bound_value(to))
                .map(PropertyValue::category),
            IndexQuery::StringPrefix(_) => Some(ValueCategory::Text),
            IndexQuery::Exists => None,
        }
    }

    /// Whether an ordered index can serve this predicate in `order`
    pub fn supports_order(&self, order: IndexOrder) -> bool {
        match order {
            IndexOrder::None => true,
            _ => self.value_category().map_or(true, |c| c.is_orderable()),
        }
    }

    pub fn matches(&self, value: &PropertyValue) -> bool {
        if value.is_null() {
            return false;
        }
        match self {
            IndexQuery::Exact(v) => v == value,
            IndexQuery::Range { from, to } => {
                if Some(value.category()) != self.value_category() {
                    return false;
                }
                let above = match from {
                    Bound::Included(f) => value >= f,
                    Bound::Excluded(f) => value > f,
                    Bound::Unbounded => true,
                };
                let below = match to {
                    Bound::Included(t) => value <= t,
                    Bound::Excluded(t) => value < t,
                    Bound::Unbounded => true,
                };
                above && below
            }
            IndexQuery::StringPrefix(prefix) => value
                .as_string()
                .map_or(false, |s| s.starts_with(prefix.as_str())),
            IndexQuery::Exists => true,
        }
    }

    /// Value bounds that enclose every match, for seeking an ordered index
    pub fn value_bounds(&self) -> (Bound<PropertyValue>, Bound<PropertyValue>) {
        let category_end = |category: ValueCategory| match next_category(category) {
            Some(next) => Bound::Excluded(PropertyValue::min_of(next)),
            None => Bound::Unbounded,
        };
        match self {
            IndexQuery::Exact(v) => (Bound::Included(v.clone()), Bound::Included(v.clone())),
            IndexQuery::Range { from, to } => {
                let Some(category) = self.value_category() else {
                    return (Bound::Unbounded, Bound::Unbounded);
                };
                let lower = match from {
                    Bound::Unbounded => Bound::Included(PropertyValue::min_of(category)),
                    bound => bound.clone(),
                };
                let upper = match to {
                    Bound::Unbounded => category_end(category),
                    bound => bound.clone(),
                };
                (lower, upper)
            }
            IndexQuery::StringPrefix(prefix) => (
                Bound::Included(PropertyValue::String(prefix.clone())),
                category_end(ValueCategory::Text),
            ),
            IndexQuery::Exists => (Bound::Unbounded, Bound::Excluded(PropertyValue::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_restricted_to_category() {
        let query = IndexQuery::range(Bound::Included(PropertyValue::Integer(3)), Bound::Unbounded);
        assert!(query.matches(&PropertyValue::Integer(3)));
        assert!(query.matches(&PropertyValue::Float(1e9)));
        assert!(!query.matches(&PropertyValue::Integer(2)));
        assert!(!query.matches(&PropertyValue::String("4".into())));
        assert!(!query.matches(&PropertyValue::Null));
    }

    #[test]
    fn test_prefix() {
        let query = IndexQuery::StringPrefix("ab".into());
        assert!(query.matches(&"abc".into()));
        assert!(query.matches(&"ab".into()));
        assert!(!query.matches(&"a".into()));
        assert!(!query.matches(&PropertyValue::Integer(1)));
    }

    #[test]
    fn test_order_capability() {
        let arrays = IndexQuery::Exact(PropertyValue::Array(vec![1.into()]));
        assert!(arrays.supports_order(IndexOrder::None));
        assert!(!arrays.supports_order(IndexOrder::Ascending));
        assert!(IndexQuery::Exists.supports_order(IndexOrder::Descending));
        assert!(IndexQuery::StringPrefix("x".into()).supports_order(IndexOrder::Ascending));
    }

    #[test]
    fn test_value_bounds_enclose_matches() {
        let query = IndexQuery::range(Bound::Unbounded, Bound::Excluded(PropertyValue::Integer(10)));
        let (lower, upper) = query.value_bounds();
        assert_eq!(lower, Bound::Included(PropertyValue::Float(f64::NEG_INFINITY)));
        assert_eq!(upper, Bound::Excluded(PropertyValue::Integer(10)));
    }
}
