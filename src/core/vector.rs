// Copyright 2025 SieveDB Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Batch result vectors produced by evaluators
//!
//! A `BoolVector` is one evaluator batch: the row selection for
//! `next_batch_size()` rows. A `RowVector` is the heterogeneous container
//! the task queue carries; for filter tasks it holds one boolean child.

use crate::core::types::LogicalOp;

/// Dense boolean batch result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolVector {
    data: Vec<bool>,
}

impl BoolVector {
    /// Wrap an existing bool buffer
    pub fn new(data: Vec<bool>) -> Self {
        BoolVector { data }
    }

    /// All-false vector of the given size
    pub fn falses(len: usize) -> Self {
        BoolVector {
            data: vec![false; len],
        }
    }

    /// All-true vector of the given size
    pub fn trues(len: usize) -> Self {
        BoolVector {
            data: vec![true; len],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [bool] {
        &mut self.data
    }

    pub fn into_inner(self) -> Vec<bool> {
        self.data
    }

    /// Number of set elements
    pub fn count_true(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }

    /// True when no element is set
    pub fn all_false(&self) -> bool {
        !self.data.iter().any(|&b| b)
    }

    /// True when every element is set
    pub fn all_true(&self) -> bool {
        self.data.iter().all(|&b| b)
    }

    /// Apply `self[i] = self[i] op other[i]` element-wise
    ///
    /// Lengths must match; the caller enforces batch alignment.
    pub fn apply(&mut self, op: LogicalOp, other: &BoolVector) {
        debug_assert_eq!(self.len(), other.len());
        match op {
            LogicalOp::And => {
                for (l, r) in self.data.iter_mut().zip(other.data.iter()) {
                    *l &= r;
                }
            }
            LogicalOp::Or => {
                for (l, r) in self.data.iter_mut().zip(other.data.iter()) {
                    *l |= r;
                }
            }
            LogicalOp::Xor => {
                for (l, r) in self.data.iter_mut().zip(other.data.iter()) {
                    *l ^= r;
                }
            }
            LogicalOp::Minus => {
                for (l, r) in self.data.iter_mut().zip(other.data.iter()) {
                    *l &= !r;
                }
            }
        }
    }

    /// Negate every element in place
    pub fn negate(&mut self) {
        for b in self.data.iter_mut() {
            *b = !*b;
        }
    }
}

impl From<Vec<bool>> for BoolVector {
    fn from(data: Vec<bool>) -> Self {
        BoolVector::new(data)
    }
}

/// Heterogeneous vector of child batches; the task queue payload
#[derive(Debug, Clone)]
pub struct RowVector {
    children: Vec<BoolVector>,
}

impl RowVector {
    pub fn new(children: Vec<BoolVector>) -> Self {
        RowVector { children }
    }

    /// Wrap a single filter result
    pub fn single(child: BoolVector) -> Self {
        RowVector {
            children: vec![child],
        }
    }

    /// Row count of the first child
    pub fn len(&self) -> usize {
        self.children.first().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn children(&self) -> &[BoolVector] {
        &self.children
    }

    /// The filter-bits child of this batch
    pub fn filter_bits(&self) -> &BoolVector {
        &self.children[0]
    }

    pub fn into_filter_bits(mut self) -> BoolVector {
        self.children.swap_remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        let v = BoolVector::new(vec![true, false, true]);
        assert_eq!(v.len(), 3);
        assert_eq!(v.count_true(), 2);
        assert!(!v.all_true());
        assert!(!v.all_false());
        assert!(BoolVector::trues(4).all_true());
        assert!(BoolVector::falses(4).all_false());
        assert!(BoolVector::new(vec![]).all_true());
        assert!(BoolVector::new(vec![]).all_false());
    }

    #[test]
    fn test_apply_matches_element_wise_definition() {
        let l = vec![true, true, false, false];
        let r = vec![true, false, true, false];

        let mut v = BoolVector::new(l.clone());
        v.apply(LogicalOp::And, &BoolVector::new(r.clone()));
        assert_eq!(v.as_slice(), &[true, false, false, false]);

        let mut v = BoolVector::new(l.clone());
        v.apply(LogicalOp::Or, &BoolVector::new(r.clone()));
        assert_eq!(v.as_slice(), &[true, true, true, false]);

        let mut v = BoolVector::new(l.clone());
        v.apply(LogicalOp::Xor, &BoolVector::new(r.clone()));
        assert_eq!(v.as_slice(), &[false, true, true, false]);

        let mut v = BoolVector::new(l);
        v.apply(LogicalOp::Minus, &BoolVector::new(r));
        assert_eq!(v.as_slice(), &[false, true, false, false]);
    }

    #[test]
    fn test_negate() {
        let mut v = BoolVector::new(vec![true, false]);
        v.negate();
        assert_eq!(v.as_slice(), &[false, true]);
        v.negate();
        assert_eq!(v.as_slice(), &[true, false]);
    }

    #[test]
    fn test_row_vector() {
        let rv = RowVector::single(BoolVector::trues(5));
        assert_eq!(rv.len(), 5);
        assert_eq!(rv.filter_bits().count_true(), 5);
        assert_eq!(rv.into_filter_bits().len(), 5);
    }
}
