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

//! Column-to-column compare: `left_col OP right_col`
//!
//! Dispatched over the (left type, right type) matrix: two integral columns
//! compare in widened 64-bit arithmetic, any float side promotes both to
//! `f64`, strings compare lexicographically. Segments retain chunk data for
//! indexed fields, so both sides always read in data mode.

use std::sync::Arc;

use crate::core::{BoolVector, CompareOp, DataType, Error, Result, Timestamp};
use crate::storage::segment::Segment;

use super::segment_cursor::{walk_rows, walk_runs, FilterElement, SegmentCursor};
use super::ColumnInfo;

const FAMILY: &str = "compare";

/// Physical evaluator for `left_col OP right_col`
#[derive(Debug)]
pub struct CompareExpr {
    left: ColumnInfo,
    right: ColumnInfo,
    op: CompareOp,
    cursor: SegmentCursor,
}

impl CompareExpr {
    pub(crate) fn new(
        left: ColumnInfo,
        right: ColumnInfo,
        op: CompareOp,
        segment: Arc<Segment>,
        query_timestamp: Timestamp,
        batch_size: usize,
    ) -> Result<Self> {
        for column in [&left, &right] {
            let actual = segment.field_type(column.field_id)?;
            if actual != column.data_type {
                return Err(Error::expr_invalid(format!(
                    "column {} is {}, plan says {}",
                    column.field_id, actual, column.data_type
                )));
            }
        }
        let compatible = (left.data_type.is_numeric() && right.data_type.is_numeric())
            || (left.data_type == DataType::Varchar && right.data_type == DataType::Varchar)
            || (left.data_type == DataType::Bool && right.data_type == DataType::Bool);
        if !compatible {
            return Err(Error::type_invalid(FAMILY, left.data_type));
        }
        if op == CompareOp::PrefixMatch {
            return Err(Error::op_invalid(FAMILY, op.to_string()));
        }
        let cursor = SegmentCursor::new(segment, left.field_id, query_timestamp, batch_size, false)?;
        Ok(CompareExpr {
            left,
            right,
            op,
            cursor,
        })
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        match (self.left.data_type, self.right.data_type) {
            (DataType::Bool, DataType::Bool) => {
                self.eval_promoted::<bool, bool, bool>(std::convert::identity, std::convert::identity)
            }
            (DataType::Varchar, DataType::Varchar) => self.eval_varchar(),
            (l, r) if l.is_integral() && r.is_integral() => self.int_left(),
            (l, r) if l.is_numeric() && r.is_numeric() => self.f64_left(),
            (l, _) => Err(Error::type_invalid(FAMILY, l)),
        }
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        self.cursor.skip_batch()
    }

    fn int_left(&mut self) -> Result<Option<BoolVector>> {
        match self.left.data_type {
            DataType::Int8 => self.int_right::<i8>(),
            DataType::Int16 => self.int_right::<i16>(),
            DataType::Int32 => self.int_right::<i32>(),
            DataType::Int64 => self.int_right::<i64>(),
            other => Err(Error::type_invalid(FAMILY, other)),
        }
    }

    fn int_right<L>(&mut self) -> Result<Option<BoolVector>>
    where
        L: FilterElement + ToI64,
    {
        match self.right.data_type {
            DataType::Int8 => self.eval_promoted::<L, i8, i64>(ToI64::to_i64, ToI64::to_i64),
            DataType::Int16 => self.eval_promoted::<L, i16, i64>(ToI64::to_i64, ToI64::to_i64),
            DataType::Int32 => self.eval_promoted::<L, i32, i64>(ToI64::to_i64, ToI64::to_i64),
            DataType::Int64 => self.eval_promoted::<L, i64, i64>(ToI64::to_i64, ToI64::to_i64),
            other => Err(Error::type_invalid(FAMILY, other)),
        }
    }

    fn f64_left(&mut self) -> Result<Option<BoolVector>> {
        match self.left.data_type {
            DataType::Int8 => self.f64_right::<i8>(),
            DataType::Int16 => self.f64_right::<i16>(),
            DataType::Int32 => self.f64_right::<i32>(),
            DataType::Int64 => self.f64_right::<i64>(),
            DataType::Float => self.f64_right::<f32>(),
            DataType::Double => self.f64_right::<f64>(),
            other => Err(Error::type_invalid(FAMILY, other)),
        }
    }

    fn f64_right<L>(&mut self) -> Result<Option<BoolVector>>
    where
        L: FilterElement + ToF64,
    {
        match self.right.data_type {
            DataType::Int8 => self.eval_promoted::<L, i8, f64>(ToF64::to_f64, ToF64::to_f64),
            DataType::Int16 => self.eval_promoted::<L, i16, f64>(ToF64::to_f64, ToF64::to_f64),
            DataType::Int32 => self.eval_promoted::<L, i32, f64>(ToF64::to_f64, ToF64::to_f64),
            DataType::Int64 => self.eval_promoted::<L, i64, f64>(ToF64::to_f64, ToF64::to_f64),
            DataType::Float => self.eval_promoted::<L, f32, f64>(ToF64::to_f64, ToF64::to_f64),
            DataType::Double => self.eval_promoted::<L, f64, f64>(ToF64::to_f64, ToF64::to_f64),
            other => Err(Error::type_invalid(FAMILY, other)),
        }
    }

    // walk the left column in runs and the right column row-aligned inside
    // each run; chunk boundaries of the two columns need not line up
    fn eval_promoted<L, R, P>(
        &mut self,
        lp: fn(L) -> P,
        rp: fn(R) -> P,
    ) -> Result<Option<BoolVector>>
    where
        L: FilterElement,
        R: FilterElement,
        P: PartialOrd + Copy,
    {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let op = self.op;
        let pos = self.cursor.pos();
        let segment = self.cursor.segment().clone();
        let left_column = segment.column(self.left.field_id)?;
        let right_column = segment.column(self.right.field_id)?;
        let lcol = L::typed_column(&left_column)?;
        let rcol = R::typed_column(&right_column)?;
        let mut out = vec![false; n];
        walk_runs(lcol, pos, n, |lrun, off| {
            walk_rows(rcol, pos + off, lrun.len(), |k, rv| {
                out[off + k] = op.compare(&lp(lrun[k]), &rp(*rv));
                Ok(())
            })
        })?;
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }

    fn eval_varchar(&mut self) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let op = self.op;
        let pos = self.cursor.pos();
        let segment = self.cursor.segment().clone();
        let left_column = segment.column(self.left.field_id)?;
        let right_column = segment.column(self.right.field_id)?;
        let lcol = left_column.as_varchar()?;
        let rcol = right_column.as_varchar()?;
        let mut out = vec![false; n];
        walk_runs(lcol, pos, n, |lrun, off| {
            walk_rows(rcol, pos + off, lrun.len(), |k, rv| {
                out[off + k] = op.compare(&lrun[k].as_str(), &rv.as_str());
                Ok(())
            })
        })?;
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }
}

// promotions applied outside the kernel, per the widened-literal rule
pub(crate) trait ToI64: Copy {
    fn to_i64(self) -> i64;
}

pub(crate) trait ToF64: Copy {
    fn to_f64(self) -> f64;
}

macro_rules! impl_promotions {
    ($($t:ty),*) => {
        $(
            impl ToI64 for $t {
                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }
            }
            impl ToF64 for $t {
                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_promotions!(i8, i16, i32, i64);

impl ToF64 for f32 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl ToF64 for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldId, MAX_TIMESTAMP};
    use crate::storage::column::ColumnBatch;
    use crate::storage::segment::Schema;
    use rustc_hash::FxHashMap;

    fn two_column_segment() -> Arc<Segment> {
        let schema = Schema::new()
            .add_field(FieldId(1), "a", DataType::Int32)
            .add_field(FieldId(2), "b", DataType::Int64)
            .add_field(FieldId(3), "f", DataType::Double);
        // mismatched chunk walks come from a small chunk size
        let segment = Segment::growing(schema, 3).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(1), ColumnBatch::Int32(vec![1, 5, 3, 7, 2]));
        batches.insert(FieldId(2), ColumnBatch::Int64(vec![2, 5, 1, 9, 2]));
        batches.insert(
            FieldId(3),
            ColumnBatch::Double(vec![1.5, 4.0, 3.0, 6.5, 2.0]),
        );
        segment.insert(&[1, 2, 3, 4, 5], &batches).unwrap();
        segment
    }

    fn run(segment: Arc<Segment>, l: (i64, DataType), r: (i64, DataType), op: CompareOp) -> Vec<bool> {
        let mut expr = CompareExpr::new(
            ColumnInfo::new(FieldId(l.0), l.1),
            ColumnInfo::new(FieldId(r.0), r.1),
            op,
            segment,
            MAX_TIMESTAMP,
            2,
        )
        .unwrap();
        let mut all = Vec::new();
        while let Some(batch) = expr.eval().unwrap() {
            all.extend_from_slice(batch.as_slice());
        }
        all
    }

    #[test]
    fn test_int_pair() {
        let segment = two_column_segment();
        // a < b: 1<2, 5<5, 3<1, 7<9, 2<2
        assert_eq!(
            run(segment.clone(), (1, DataType::Int32), (2, DataType::Int64), CompareOp::Lt),
            vec![true, false, false, true, false]
        );
        assert_eq!(
            run(segment, (1, DataType::Int32), (2, DataType::Int64), CompareOp::Eq),
            vec![false, true, false, false, true]
        );
    }

    #[test]
    fn test_mixed_int_float_promotes_to_f64() {
        let segment = two_column_segment();
        // a >= f: 1>=1.5, 5>=4.0, 3>=3.0, 7>=6.5, 2>=2.0
        assert_eq!(
            run(segment, (1, DataType::Int32), (3, DataType::Double), CompareOp::Ge),
            vec![false, true, true, true, true]
        );
    }

    #[test]
    fn test_varchar_pair() {
        let schema = Schema::new()
            .add_field(FieldId(1), "a", DataType::Varchar)
            .add_field(FieldId(2), "b", DataType::Varchar);
        let segment = Segment::growing(schema, 2).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(
            FieldId(1),
            ColumnBatch::Varchar(vec!["apple".into(), "pear".into(), "fig".into()]),
        );
        batches.insert(
            FieldId(2),
            ColumnBatch::Varchar(vec!["banana".into(), "pear".into(), "date".into()]),
        );
        segment.insert(&[1, 2, 3], &batches).unwrap();

        assert_eq!(
            run(segment, (1, DataType::Varchar), (2, DataType::Varchar), CompareOp::Lt),
            vec![true, false, false]
        );
    }

    #[test]
    fn test_incompatible_types_rejected() {
        let schema = Schema::new()
            .add_field(FieldId(1), "a", DataType::Int32)
            .add_field(FieldId(2), "s", DataType::Varchar);
        let segment = Segment::growing(schema, 2).unwrap();
        assert!(matches!(
            CompareExpr::new(
                ColumnInfo::new(FieldId(1), DataType::Int32),
                ColumnInfo::new(FieldId(2), DataType::Varchar),
                CompareOp::Eq,
                segment,
                MAX_TIMESTAMP,
                10,
            ),
            Err(Error::TypeInvalid { .. })
        ));
    }
}
