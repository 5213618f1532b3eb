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

//! Logical combinators over bool vectors
//!
//! `LogicalBinaryExpr` applies AND/OR/XOR/MINUS into the left child's
//! result. `ConjunctExpr` is the n-ary form: it short-circuits a batch as
//! soon as a child result decides it (all-false under AND, all-true under
//! OR) and advances the remaining children with `skip_batch` so every leaf
//! stays on the same batch boundaries.

use std::sync::Arc;

use crate::core::{BoolVector, Error, LogicalOp, Result, Timestamp};
use crate::storage::segment::Segment;

use super::Expr;

/// Physical evaluator for `left OP right`
#[derive(Debug)]
pub struct LogicalBinaryExpr {
    op: LogicalOp,
    left: Box<Expr>,
    right: Box<Expr>,
}

impl LogicalBinaryExpr {
    pub(crate) fn new(op: LogicalOp, left: Expr, right: Expr) -> Self {
        LogicalBinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        let left = self.left.eval()?;
        let right = self.right.eval()?;
        match (left, right) {
            (None, None) => Ok(None),
            (Some(mut left), Some(right)) => {
                if left.len() != right.len() {
                    return Err(Error::fatal(format!(
                        "logical children produced {} and {} rows",
                        left.len(),
                        right.len()
                    )));
                }
                left.apply(self.op, &right);
                Ok(Some(left))
            }
            _ => Err(Error::fatal("logical children finished out of step")),
        }
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        let a = self.left.skip_batch()?;
        let b = self.right.skip_batch()?;
        if a != b {
            return Err(Error::fatal(format!(
                "logical children skipped {} and {} rows",
                a, b
            )));
        }
        Ok(a)
    }
}

/// Physical evaluator for `NOT child`
#[derive(Debug)]
pub struct LogicalNotExpr {
    child: Box<Expr>,
}

impl LogicalNotExpr {
    pub(crate) fn new(child: Expr) -> Self {
        LogicalNotExpr {
            child: Box::new(child),
        }
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        match self.child.eval()? {
            Some(mut batch) => {
                batch.negate();
                Ok(Some(batch))
            }
            None => Ok(None),
        }
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        self.child.skip_batch()
    }
}

/// N-ary conjunction / disjunction with short-circuiting
#[derive(Debug)]
pub struct ConjunctExpr {
    is_and: bool,
    children: Vec<Expr>,
}

impl ConjunctExpr {
    pub(crate) fn new(is_and: bool, children: Vec<Expr>) -> Result<Self> {
        if children.is_empty() {
            return Err(Error::expr_invalid(
                "conjunct expects at least one argument",
            ));
        }
        Ok(ConjunctExpr { is_and, children })
    }

    // a decided batch makes the remaining children's work unobservable
    fn decided(is_and: bool, result: &BoolVector) -> bool {
        if is_and {
            result.all_false()
        } else {
            result.all_true()
        }
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        let op = if self.is_and {
            LogicalOp::And
        } else {
            LogicalOp::Or
        };
        let mut result: Option<BoolVector> = None;
        let mut decided = false;
        for child in self.children.iter_mut() {
            if decided {
                child.skip_batch()?;
                continue;
            }
            match child.eval()? {
                Some(batch) => match result.as_mut() {
                    None => {
                        decided = Self::decided(self.is_and, &batch);
                        result = Some(batch);
                    }
                    Some(acc) => {
                        if acc.len() != batch.len() {
                            return Err(Error::fatal(format!(
                                "conjunct children produced {} and {} rows",
                                acc.len(),
                                batch.len()
                            )));
                        }
                        acc.apply(op, &batch);
                        decided = Self::decided(self.is_and, acc);
                    }
                },
                None => {
                    if result.is_some() {
                        return Err(Error::fatal("conjunct children finished out of step"));
                    }
                }
            }
        }
        Ok(result)
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        let mut skipped = None;
        for child in self.children.iter_mut() {
            let n = child.skip_batch()?;
            match skipped {
                None => skipped = Some(n),
                Some(prev) if prev != n => {
                    return Err(Error::fatal(format!(
                        "conjunct children skipped {} and {} rows",
                        prev, n
                    )))
                }
                _ => {}
            }
        }
        Ok(skipped.unwrap_or(0))
    }
}

/// Leaf that passes every visible row
#[derive(Debug)]
pub struct AlwaysTrueExpr {
    num_rows: usize,
    pos: usize,
    batch_size: usize,
}

impl AlwaysTrueExpr {
    pub(crate) fn new(
        segment: &Arc<Segment>,
        query_timestamp: Timestamp,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::fatal("expr batch size should be greater than zero"));
        }
        Ok(AlwaysTrueExpr {
            num_rows: segment.get_active_count(query_timestamp),
            pos: 0,
            batch_size,
        })
    }

    fn next_batch_size(&self) -> usize {
        self.batch_size.min(self.num_rows - self.pos)
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        let n = self.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        self.pos += n;
        Ok(Some(BoolVector::trues(n)))
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        let n = self.next_batch_size();
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompareOp, DataType, FieldId, ScalarValue, MAX_TIMESTAMP};
    use crate::expr::unary::UnaryRangeExpr;
    use crate::expr::ColumnInfo;
    use crate::storage::column::ColumnBatch;
    use crate::storage::segment::Schema;
    use rustc_hash::FxHashMap;

    fn segment() -> Arc<Segment> {
        let schema = Schema::new().add_field(FieldId(1), "x", DataType::Int64);
        let segment = Segment::growing(schema, 8).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(1), ColumnBatch::Int64((0..20).collect()));
        let timestamps: Vec<u64> = (1..=20).collect();
        segment.insert(&timestamps, &batches).unwrap();
        segment
    }

    fn leaf(segment: &Arc<Segment>, op: CompareOp, val: i64, batch: usize) -> Expr {
        Expr::UnaryRange(
            UnaryRangeExpr::new(
                ColumnInfo::new(FieldId(1), DataType::Int64),
                op,
                ScalarValue::Int64(val),
                segment.clone(),
                MAX_TIMESTAMP,
                batch,
            )
            .unwrap(),
        )
    }

    fn drain(expr: &mut Expr) -> Vec<bool> {
        let mut all = Vec::new();
        while let Some(batch) = expr.eval().unwrap() {
            all.extend_from_slice(batch.as_slice());
        }
        all
    }

    #[test]
    fn test_and_or_xor_minus() {
        let segment = segment();
        let lt10 = |s: &Arc<Segment>| leaf(s, CompareOp::Lt, 10, 6);
        let ge5 = |s: &Arc<Segment>| leaf(s, CompareOp::Ge, 5, 6);

        let mut and = Expr::Logical(LogicalBinaryExpr::new(
            LogicalOp::And,
            lt10(&segment),
            ge5(&segment),
        ));
        let bits = drain(&mut and);
        for (i, b) in bits.iter().enumerate() {
            assert_eq!(*b, i < 10 && i >= 5, "row {}", i);
        }

        let mut xor = Expr::Logical(LogicalBinaryExpr::new(
            LogicalOp::Xor,
            lt10(&segment),
            ge5(&segment),
        ));
        let bits = drain(&mut xor);
        for (i, b) in bits.iter().enumerate() {
            assert_eq!(*b, (i < 10) ^ (i >= 5), "row {}", i);
        }

        let mut minus = Expr::Logical(LogicalBinaryExpr::new(
            LogicalOp::Minus,
            lt10(&segment),
            ge5(&segment),
        ));
        let bits = drain(&mut minus);
        for (i, b) in bits.iter().enumerate() {
            assert_eq!(*b, i < 10 && !(i >= 5), "row {}", i);
        }
    }

    #[test]
    fn test_not_roundtrip() {
        let segment = segment();
        let mut double_not = Expr::Not(LogicalNotExpr::new(Expr::Not(LogicalNotExpr::new(
            leaf(&segment, CompareOp::Lt, 7, 6),
        ))));
        let mut plain = leaf(&segment, CompareOp::Lt, 7, 6);
        assert_eq!(drain(&mut double_not), drain(&mut plain));
    }

    #[test]
    fn test_conjunct_short_circuit_keeps_alignment() {
        let segment = segment();
        // first child is all-false for every batch, so the second is skipped
        // for every batch yet both streams drain together
        let all_false = leaf(&segment, CompareOp::Lt, -1, 6);
        let rest = leaf(&segment, CompareOp::Ge, 0, 6);
        let mut conjunct =
            Expr::Conjunct(ConjunctExpr::new(true, vec![all_false, rest]).unwrap());
        let bits = drain(&mut conjunct);
        assert_eq!(bits.len(), 20);
        assert!(bits.iter().all(|b| !b));
    }

    #[test]
    fn test_disjunct_short_circuit() {
        let segment = segment();
        let all_true = leaf(&segment, CompareOp::Ge, 0, 6);
        let rest = leaf(&segment, CompareOp::Lt, 3, 6);
        let mut disjunct =
            Expr::Conjunct(ConjunctExpr::new(false, vec![all_true, rest]).unwrap());
        let bits = drain(&mut disjunct);
        assert_eq!(bits.len(), 20);
        assert!(bits.iter().all(|b| *b));
    }

    #[test]
    fn test_always_true() {
        let segment = segment();
        let mut expr = Expr::AlwaysTrue(AlwaysTrueExpr::new(&segment, MAX_TIMESTAMP, 7).unwrap());
        let bits = drain(&mut expr);
        assert_eq!(bits.len(), 20);
        assert!(bits.iter().all(|b| *b));
    }

    #[test]
    fn test_empty_conjunct_rejected() {
        assert!(matches!(
            ConjunctExpr::new(true, Vec::new()),
            Err(Error::ExprInvalid(_))
        ));
    }
}
