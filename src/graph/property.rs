//! Property value types for nodes and relationships
//!
//! Values support equality, hashing and a total order so they can key the
//! ordered property indexes. The order groups values by category first
//! (map, array, temporal, text, boolean, number, null) and compares within a
//! category by natural order. Integers and floats share the number category
//! and compare numerically.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::types::PropertyKeyId;

/// Property value type supporting multiple data types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropertyValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(i64), // Unix timestamp in milliseconds
    Array(Vec<PropertyValue>),
    Map(BTreeMap<String, PropertyValue>),
    Null,
}

/// Comparison category of a value, used for index ordering capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueCategory {
    Map,
    Array,
    Temporal,
    Text,
    Boolean,
    Number,
    NoValue,
}

impl ValueCategory {
    /// Whether an index can return values of this category in order
    pub fn is_orderable(&self) -> bool {
        !matches!(self, ValueCategory::Map | ValueCategory::Array)
    }
}

impl PropertyValue {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Same value and same representation
    ///
    /// Stricter than `==`, which treats `Integer(3)` and `Float(3.0)` as
    /// equal. Writes use this to tell a retyped value from an unchanged one.
    pub fn is_identical(&self, other: &Self) -> bool {
        use PropertyValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Array(a), Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.is_identical(y))
            }
            (Map(a), Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.is_identical(vb))
            }
            (Integer(_), Float(_)) | (Float(_), Integer(_)) => false,
            _ => self == other,
        }
    }

    pub fn category(&self) -> ValueCategory {
        match self {
            PropertyValue::Map(_) => ValueCategory::Map,
            PropertyValue::Array(_) => ValueCategory::Array,
            PropertyValue::DateTime(_) => ValueCategory::Temporal,
            PropertyValue::String(_) => ValueCategory::Text,
            PropertyValue::Boolean(_) => ValueCategory::Boolean,
            PropertyValue::Integer(_) | PropertyValue::Float(_) => ValueCategory::Number,
            PropertyValue::Null => ValueCategory::NoValue,
        }
    }

    /// Smallest value of a category, handy as a range bound
    pub fn min_of(category: ValueCategory) -> PropertyValue {
        match category {
            ValueCategory::Map => PropertyValue::Map(BTreeMap::new()),
            ValueCategory::Array => PropertyValue::Array(Vec::new()),
            ValueCategory::Temporal => PropertyValue::DateTime(i64::MIN),
            ValueCategory::Text => PropertyValue::String(String::new()),
            ValueCategory::Boolean => PropertyValue::Boolean(false),
            ValueCategory::Number => PropertyValue::Float(f64::NEG_INFINITY),
            ValueCategory::NoValue => PropertyValue::Null,
        }
    }
}

// 2^63 as f64; every finite float below it in magnitude truncates into i64
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// The integer a float is numerically equal to, if any
fn integral(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= -I64_BOUND && f < I64_BOUND {
        Some(f as i64)
    } else {
        None
    }
}

/// Exact numeric comparison; NaN sorts as `f64::total_cmp` places it
fn compare_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= I64_BOUND {
        return Ordering::Less;
    }
    if f < -I64_BOUND {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    i.cmp(&(whole as i64)).then_with(|| {
        if f > whole {
            Ordering::Less
        } else if f < whole {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    // 0.0 and -0.0 are one number
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use PropertyValue::*;

        let by_category = self.category().cmp(&other.category());
        if by_category != Ordering::Equal {
            return by_category;
        }
        match (self, other) {
            (String(a), String(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => compare_floats(*a, *b),
            (Integer(a), Float(b)) => compare_int_float(*a, *b),
            (Float(a), Integer(b)) => compare_int_float(*b, *a).reverse(),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Array(a), Array(b)) => a.cmp(b),
            (Map(a), Map(b)) => a.cmp(b),
            (Null, Null) => Ordering::Equal,
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyValue {}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Numerically equal integers and floats must hash alike
        self.category().hash(state);
        match self {
            PropertyValue::String(s) => s.hash(state),
            PropertyValue::Integer(i) => i.hash(state),
            PropertyValue::Float(f) => match integral(*f) {
                Some(i) => i.hash(state),
                None => f.to_bits().hash(state),
            },
            PropertyValue::Boolean(b) => b.hash(state),
            PropertyValue::DateTime(dt) => dt.hash(state),
            PropertyValue::Array(arr) => arr.hash(state),
            PropertyValue::Map(map) => map.hash(state),
            PropertyValue::Null => {}
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::DateTime(dt) => write!(f, "DateTime({})", dt),
            PropertyValue::Array(arr) => {
                write!(f, "[")?;
                for (i, val) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            PropertyValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, val)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(arr: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(arr)
    }
}

/// Property set of a node or relationship, ordered by key token
pub type PropertyMap = BTreeMap<PropertyKeyId, PropertyValue>;
