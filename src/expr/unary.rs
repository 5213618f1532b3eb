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

//! Unary range filter: `col OP const`
//!
//! Integer literals arrive widened to `i64`; a literal outside the column's
//! domain collapses the predicate instead of erroring: above the domain,
//! `>`/`>=` and `==` become all-false while `<`/`<=` and `!=` become
//! all-true, symmetric below the domain. Strings support `PrefixMatch`.
//! JSON resolves the nested pointer per row and attempts typed extraction;
//! an integer predicate also matches a JSON double with zero fraction.

use std::sync::Arc;

use crate::core::{
    check_int_domain, BoolVector, CompareOp, DataType, DomainCheck, Error, Result, ScalarValue,
    Timestamp,
};
use crate::storage::segment::Segment;

use super::json;
use super::segment_cursor::{walk_runs, walk_rows, FilterElement, SegmentCursor};
use super::ColumnInfo;

const FAMILY: &str = "unary range";

/// Physical evaluator for `col OP const`
#[derive(Debug)]
pub struct UnaryRangeExpr {
    column: ColumnInfo,
    op: CompareOp,
    value: ScalarValue,
    cursor: SegmentCursor,
}

impl UnaryRangeExpr {
    pub(crate) fn new(
        column: ColumnInfo,
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
        if !column.data_type.is_filterable() {
            return Err(Error::type_invalid(FAMILY, column.data_type));
        }
        if op == CompareOp::PrefixMatch
            && !matches!(column.data_type, DataType::Varchar | DataType::Json)
        {
            return Err(Error::op_invalid(FAMILY, op.to_string()));
        }
        let index_mode = segment.has_index(column.field_id);
        let cursor = SegmentCursor::new(
            segment,
            column.field_id,
            query_timestamp,
            batch_size,
            index_mode,
        )?;
        Ok(UnaryRangeExpr {
            column,
            op,
            value,
            cursor,
        })
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        match self.column.data_type {
            DataType::Bool => {
                let val = self.value.as_bool()?;
                self.eval_scalar(val)
            }
            DataType::Int8 => self.eval_int::<i8>(),
            DataType::Int16 => self.eval_int::<i16>(),
            DataType::Int32 => self.eval_int::<i32>(),
            DataType::Int64 => self.eval_int::<i64>(),
            DataType::Float => {
                let val = self.value.as_f64()? as f32;
                self.eval_scalar(val)
            }
            DataType::Double => {
                let val = self.value.as_f64()?;
                self.eval_scalar(val)
            }
            DataType::Varchar => self.eval_varchar(),
            DataType::Json => self.eval_json(),
            other => Err(Error::type_invalid(FAMILY, other)),
        }
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        self.cursor.skip_batch()
    }

    fn eval_int<T>(&mut self) -> Result<Option<BoolVector>>
    where
        T: FilterElement + TryFrom<i64>,
    {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let widened = self.value.as_i64()?;
        match check_int_domain(widened, self.column.data_type) {
            DomainCheck::InRange => {
                let val = T::try_from(widened)
                    .map_err(|_| Error::fatal("literal escaped its domain check"))?;
                self.eval_scalar(val)
            }
            DomainCheck::AboveMax => {
                let pass = matches!(self.op, CompareOp::Lt | CompareOp::Le | CompareOp::Ne);
                self.collapsed(pass, n)
            }
            DomainCheck::BelowMin => {
                let pass = matches!(self.op, CompareOp::Gt | CompareOp::Ge | CompareOp::Ne);
                self.collapsed(pass, n)
            }
        }
    }

    // the whole batch has one answer; the cursor still advances normally
    fn collapsed(&mut self, pass: bool, n: usize) -> Result<Option<BoolVector>> {
        self.cursor.advance(n)?;
        Ok(Some(if pass {
            BoolVector::trues(n)
        } else {
            BoolVector::falses(n)
        }))
    }

    fn eval_scalar<T: FilterElement>(&mut self, val: T) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        if self.cursor.index_mode() {
            let op = self.op;
            self.cursor.index_batch(move |idx| {
                let typed = T::typed_index(idx)?;
                match op {
                    CompareOp::Eq => Ok(typed.of_in(std::slice::from_ref(&val))),
                    CompareOp::Ne => Ok(typed.not_in(std::slice::from_ref(&val))),
                    CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                        typed.range_op(&val, op)
                    }
                    CompareOp::PrefixMatch => Err(Error::op_invalid(FAMILY, op.to_string())),
                }
            })
        } else {
            let op = self.op;
            let segment = self.cursor.segment().clone();
            let column = segment.column(self.cursor.field_id())?;
            let col = T::typed_column(&column)?;
            let mut out = vec![false; n];
            walk_runs(col, self.cursor.pos(), n, |run, off| {
                T::compare_val(op, run, val, &mut out[off..off + run.len()]);
                Ok(())
            })?;
            self.cursor.advance(n)?;
            Ok(Some(BoolVector::new(out)))
        }
    }

    fn eval_varchar(&mut self) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let val = self.value.as_str()?.to_string();
        let op = self.op;
        if self.cursor.index_mode() {
            self.cursor.index_batch(move |idx| {
                let typed = idx.as_varchar()?;
                match op {
                    CompareOp::Eq => Ok(typed.of_in(std::slice::from_ref(&val))),
                    CompareOp::Ne => Ok(typed.not_in(std::slice::from_ref(&val))),
                    CompareOp::PrefixMatch => Ok(typed.prefix_query(&val)),
                    CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                        typed.range_op(&val, op)
                    }
                }
            })
        } else {
            let segment = self.cursor.segment().clone();
            let column = segment.column(self.cursor.field_id())?;
            let col = column.as_varchar()?;
            let mut out = vec![false; n];
            walk_rows(col, self.cursor.pos(), n, |k, s| {
                out[k] = match op {
                    CompareOp::PrefixMatch => s.starts_with(val.as_str()),
                    _ => op.compare(&s.as_str(), &val.as_str()),
                };
                Ok(())
            })?;
            self.cursor.advance(n)?;
            Ok(Some(BoolVector::new(out)))
        }
    }

    fn eval_json(&mut self) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let pointer = json::pointer(&self.column.nested_path);
        let op = self.op;
        let segment = self.cursor.segment().clone();
        let column = segment.column(self.cursor.field_id())?;
        let col = column.as_json()?;
        let mut out = vec![false; n];
        match &self.value {
            ScalarValue::Bool(val) => {
                let val = *val;
                walk_rows(col, self.cursor.pos(), n, |k, doc| {
                    out[k] = json::compare_bool(doc, &pointer, op, val);
                    Ok(())
                })?;
            }
            ScalarValue::Int64(val) => {
                let val = *val;
                walk_rows(col, self.cursor.pos(), n, |k, doc| {
                    out[k] = json::compare_i64(doc, &pointer, op, val);
                    Ok(())
                })?;
            }
            ScalarValue::Float64(val) => {
                let val = *val;
                walk_rows(col, self.cursor.pos(), n, |k, doc| {
                    out[k] = json::compare_f64(doc, &pointer, op, val);
                    Ok(())
                })?;
            }
            ScalarValue::String(val) => {
                walk_rows(col, self.cursor.pos(), n, |k, doc| {
                    out[k] = json::compare_str(doc, &pointer, op, val);
                    Ok(())
                })?;
            }
        }
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }
}
