//! Immutable label sets
//!
//! Nodes carry few labels, so a sorted boxed slice beats a hash set both in
//! memory and in membership tests (binary search over a handful of ints).

use super::types::LabelId;
use serde::{Deserialize, Serialize};

/// Immutable, sorted, duplicate-free set of label tokens
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSet {
    labels: Box<[LabelId]>,
}

impl LabelSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_labels<I: IntoIterator<Item = LabelId>>(labels: I) -> Self {
        let mut sorted: Vec<LabelId> = labels.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        LabelSet {
            labels: sorted.into_boxed_slice(),
        }
    }

    pub fn number_of_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at `offset` in ascending token order
    pub fn label(&self, offset: usize) -> Option<LabelId> {
        self.labels.get(offset).copied()
    }

    pub fn contains(&self, label: LabelId) -> bool {
        self.labels.binary_search(&label).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = LabelId> + '_ {
        self.labels.iter().copied()
    }

    pub fn as_slice(&self) -> &[LabelId] {
        &self.labels
    }

    /// New set with `label` added; `self` is returned unchanged if present
    pub fn with(&self, label: LabelId) -> LabelSet {
        match self.labels.binary_search(&label) {
            Ok(_) => self.clone(),
            Err(pos) => {
                let mut labels = self.labels.to_vec();
                labels.insert(pos, label);
                LabelSet {
                    labels: labels.into_boxed_slice(),
                }
            }
        }
    }

    /// New set with `label` removed
    pub fn without(&self, label: LabelId) -> LabelSet {
        match self.labels.binary_search(&label) {
            Ok(pos) => {
                let mut labels = self.labels.to_vec();
                labels.remove(pos);
                LabelSet {
                    labels: labels.into_boxed_slice(),
                }
            }
            Err(_) => self.clone(),
        }
    }
}

impl FromIterator<LabelId> for LabelSet {
    fn from_iter<T: IntoIterator<Item = LabelId>>(iter: T) -> Self {
        LabelSet::from_labels(iter)
    }
}
