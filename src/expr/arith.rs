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

//! Arithmetic-on-range filter: `(col ARITH operand) OP value`
//!
//! OP is restricted to `==` and `!=`. Integer columns compute in widened
//! 64-bit two's-complement arithmetic; a zero operand for `/` or `%` makes
//! the row false rather than erroring, for floats as well. The scalar index
//! carries no arithmetic capability, so this family always reads chunk
//! data.

use std::sync::Arc;

use crate::core::{
    ArithOp, BoolVector, CompareOp, DataType, Error, Result, ScalarValue, Timestamp,
};
use crate::storage::segment::Segment;

use super::segment_cursor::{walk_rows, FilterElement, SegmentCursor};
use super::ColumnInfo;

const FAMILY: &str = "arith range";

/// Physical evaluator for `(col ARITH operand) OP value`
#[derive(Debug)]
pub struct ArithRangeExpr {
    column: ColumnInfo,
    arith_op: ArithOp,
    right_operand: ScalarValue,
    op: CompareOp,
    value: ScalarValue,
    cursor: SegmentCursor,
}

impl ArithRangeExpr {
    pub(crate) fn new(
        column: ColumnInfo,
        arith_op: ArithOp,
        right_operand: ScalarValue,
        op: CompareOp,
        value: ScalarValue,
        segment: Arc<Segment>,
        query_timestamp: Timestamp,
        batch_size: usize,
    ) -> Result<Self> {
        let actual = segment.field_type(column.field_id)?;
        if actual != column.data_type {
            return Err(Error::expr_invalid(format!(
                "column {} is {}, plan says {}",
                column.field_id, actual, column.data_type
            )));
        }
        if !column.data_type.is_numeric() {
            return Err(Error::type_invalid(FAMILY, column.data_type));
        }
        if !matches!(op, CompareOp::Eq | CompareOp::Ne) {
            return Err(Error::op_invalid(FAMILY, op.to_string()));
        }
        let cursor = SegmentCursor::new(segment, column.field_id, query_timestamp, batch_size, false)?;
        Ok(ArithRangeExpr {
            column,
            arith_op,
            right_operand,
            op,
            value,
            cursor,
        })
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        match self.column.data_type {
            DataType::Int8 => self.eval_int::<i8>(),
            DataType::Int16 => self.eval_int::<i16>(),
            DataType::Int32 => self.eval_int::<i32>(),
            DataType::Int64 => self.eval_int::<i64>(),
            DataType::Float => {
                let operand = self.right_operand.as_f64()? as f32;
                let target = self.value.as_f64()? as f32;
                let arith_op = self.arith_op;
                self.eval_with(move |x: &f32| float_arith(*x, arith_op, operand), target)
            }
            DataType::Double => {
                let operand = self.right_operand.as_f64()?;
                let target = self.value.as_f64()?;
                let arith_op = self.arith_op;
                self.eval_with(move |x: &f64| float_arith(*x, arith_op, operand), target)
            }
            other => Err(Error::type_invalid(FAMILY, other)),
        }
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        self.cursor.skip_batch()
    }

    fn eval_int<T>(&mut self) -> Result<Option<BoolVector>>
    where
        T: FilterElement + Into<i64>,
    {
        let operand = self.right_operand.as_i64()?;
        let target = self.value.as_i64()?;
        let arith_op = self.arith_op;
        self.eval_with(move |x: &T| int_arith((*x).into(), arith_op, operand), target)
    }

    fn eval_with<T, P, F>(&mut self, compute: F, target: P) -> Result<Option<BoolVector>>
    where
        T: FilterElement,
        P: PartialEq + Copy,
        F: Fn(&T) -> Option<P>,
    {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let negate = self.op == CompareOp::Ne;
        let segment = self.cursor.segment().clone();
        let column = segment.column(self.cursor.field_id())?;
        let col = T::typed_column(&column)?;
        let mut out = vec![false; n];
        walk_rows(col, self.cursor.pos(), n, |k, x| {
            out[k] = match compute(x) {
                Some(computed) => (computed == target) != negate,
                None => false,
            };
            Ok(())
        })?;
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }
}

// widened 64-bit arithmetic; None marks a divide/modulo by zero
#[inline]
fn int_arith(x: i64, op: ArithOp, operand: i64) -> Option<i64> {
    match op {
        ArithOp::Add => Some(x.wrapping_add(operand)),
        ArithOp::Sub => Some(x.wrapping_sub(operand)),
        ArithOp::Mul => Some(x.wrapping_mul(operand)),
        ArithOp::Div => (operand != 0).then(|| x.wrapping_div(operand)),
        ArithOp::Mod => (operand != 0).then(|| x.wrapping_rem(operand)),
    }
}

#[inline]
fn float_arith<T>(x: T, op: ArithOp, operand: T) -> Option<T>
where
    T: Copy
        + PartialEq
        + Default
        + std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + std::ops::Div<Output = T>
        + std::ops::Rem<Output = T>,
{
    let zero = T::default();
    match op {
        ArithOp::Add => Some(x + operand),
        ArithOp::Sub => Some(x - operand),
        ArithOp::Mul => Some(x * operand),
        ArithOp::Div => (operand != zero).then(|| x / operand),
        ArithOp::Mod => (operand != zero).then(|| x % operand),
    }
}
