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

//! Binary range filter: `lower (<|<=) col (<|<=) upper`
//!
//! Widened integer bounds clamp to the column domain: a lower bound below
//! the domain becomes `T::MIN` inclusive, an upper bound above the domain
//! becomes `T::MAX` inclusive; a lower bound above the domain or an upper
//! bound below it collapses the whole predicate to all-false. Strings
//! compare lexicographically.

use std::sync::Arc;

use crate::core::{
    check_int_domain, BoolVector, DataType, DomainCheck, Error, Result, ScalarValue, Timestamp,
};
use crate::storage::segment::Segment;

use super::json;
use super::segment_cursor::{walk_rows, FilterElement, SegmentCursor};
use super::ColumnInfo;

const FAMILY: &str = "binary range";

/// Physical evaluator for `lower (<|<=) col (<|<=) upper`
#[derive(Debug)]
pub struct BinaryRangeExpr {
    column: ColumnInfo,
    lower: ScalarValue,
    upper: ScalarValue,
    lower_inclusive: bool,
    upper_inclusive: bool,
    cursor: SegmentCursor,
}

impl BinaryRangeExpr {
    pub(crate) fn new(
        column: ColumnInfo,
        lower: ScalarValue,
        upper: ScalarValue,
        lower_inclusive: bool,
        upper_inclusive: bool,
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
        let index_mode = segment.has_index(column.field_id);
        let cursor = SegmentCursor::new(
            segment,
            column.field_id,
            query_timestamp,
            batch_size,
            index_mode,
        )?;
        Ok(BinaryRangeExpr {
            column,
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
            cursor,
        })
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        match self.column.data_type {
            DataType::Bool => {
                let lo = self.lower.as_bool()?;
                let hi = self.upper.as_bool()?;
                self.eval_range(lo, hi, self.lower_inclusive, self.upper_inclusive)
            }
            DataType::Int8 => self.eval_int::<i8>(),
            DataType::Int16 => self.eval_int::<i16>(),
            DataType::Int32 => self.eval_int::<i32>(),
            DataType::Int64 => self.eval_int::<i64>(),
            DataType::Float => {
                let lo = self.lower.as_f64()? as f32;
                let hi = self.upper.as_f64()? as f32;
                self.eval_range(lo, hi, self.lower_inclusive, self.upper_inclusive)
            }
            DataType::Double => {
                let lo = self.lower.as_f64()?;
                let hi = self.upper.as_f64()?;
                self.eval_range(lo, hi, self.lower_inclusive, self.upper_inclusive)
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
        T: FilterElement + TryFrom<i64> + Bounded,
    {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let dt = self.column.data_type;
        let mut lower_inclusive = self.lower_inclusive;
        let mut upper_inclusive = self.upper_inclusive;

        let lo64 = self.lower.as_i64()?;
        let lo = match check_int_domain(lo64, dt) {
            DomainCheck::AboveMax => return self.all_false(n),
            DomainCheck::BelowMin => {
                lower_inclusive = true;
                T::MIN
            }
            DomainCheck::InRange => T::try_from(lo64)
                .map_err(|_| Error::fatal("lower bound escaped its domain check"))?,
        };

        let hi64 = self.upper.as_i64()?;
        let hi = match check_int_domain(hi64, dt) {
            DomainCheck::BelowMin => return self.all_false(n),
            DomainCheck::AboveMax => {
                upper_inclusive = true;
                T::MAX
            }
            DomainCheck::InRange => T::try_from(hi64)
                .map_err(|_| Error::fatal("upper bound escaped its domain check"))?,
        };

        self.eval_range(lo, hi, lower_inclusive, upper_inclusive)
    }

    fn all_false(&mut self, n: usize) -> Result<Option<BoolVector>> {
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::falses(n)))
    }

    fn eval_range<T: FilterElement>(
        &mut self,
        lo: T,
        hi: T,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        if self.cursor.index_mode() {
            self.cursor.index_batch(move |idx| {
                let typed = T::typed_index(idx)?;
                Ok(typed.range(&lo, lower_inclusive, &hi, upper_inclusive))
            })
        } else {
            let segment = self.cursor.segment().clone();
            let column = segment.column(self.cursor.field_id())?;
            let col = T::typed_column(&column)?;
            let mut out = vec![false; n];
            let test = range_test(lower_inclusive, upper_inclusive);
            walk_rows(col, self.cursor.pos(), n, |k, x| {
                out[k] = test(x, &lo, &hi);
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
        let lo = self.lower.as_str()?.to_string();
        let hi = self.upper.as_str()?.to_string();
        let lower_inclusive = self.lower_inclusive;
        let upper_inclusive = self.upper_inclusive;
        if self.cursor.index_mode() {
            self.cursor.index_batch(move |idx| {
                let typed = idx.as_varchar()?;
                Ok(typed.range(&lo, lower_inclusive, &hi, upper_inclusive))
            })
        } else {
            let segment = self.cursor.segment().clone();
            let column = segment.column(self.cursor.field_id())?;
            let col = column.as_varchar()?;
            let mut out = vec![false; n];
            let test = range_test::<str>(lower_inclusive, upper_inclusive);
            walk_rows(col, self.cursor.pos(), n, |k, s| {
                out[k] = test(s.as_str(), lo.as_str(), hi.as_str());
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
        let ptr = json::pointer(&self.column.nested_path);
        let lower_inclusive = self.lower_inclusive;
        let upper_inclusive = self.upper_inclusive;
        let segment = self.cursor.segment().clone();
        let column = segment.column(self.cursor.field_id())?;
        let col = column.as_json()?;
        let mut out = vec![false; n];
        match (&self.lower, &self.upper) {
            (ScalarValue::String(lo), ScalarValue::String(hi)) => {
                let test = range_test::<str>(lower_inclusive, upper_inclusive);
                walk_rows(col, self.cursor.pos(), n, |k, doc| {
                    if let Some(serde_json::Value::String(s)) = json::lookup(doc, &ptr) {
                        out[k] = test(s.as_str(), lo.as_str(), hi.as_str());
                    }
                    Ok(())
                })?;
            }
            (lo, hi) if lo.is_numeric() && hi.is_numeric() => {
                let test = range_test::<f64>(lower_inclusive, upper_inclusive);
                let lo = lo.as_f64()?;
                let hi = hi.as_f64()?;
                walk_rows(col, self.cursor.pos(), n, |k, doc| {
                    if let Some(x) = json::lookup(doc, &ptr).and_then(|v| v.as_f64()) {
                        out[k] = test(&x, &lo, &hi);
                    }
                    Ok(())
                })?;
            }
            _ => {
                return Err(Error::expr_invalid(
                    "binary range over JSON needs two numeric or two string bounds",
                ))
            }
        }
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }
}

// one branch per inclusivity variant, chosen outside the element loop
fn range_test<T: PartialOrd + ?Sized>(
    lower_inclusive: bool,
    upper_inclusive: bool,
) -> fn(&T, &T, &T) -> bool {
    match (lower_inclusive, upper_inclusive) {
        (true, true) => |x, lo, hi| lo <= x && x <= hi,
        (true, false) => |x, lo, hi| lo <= x && x < hi,
        (false, true) => |x, lo, hi| lo < x && x <= hi,
        (false, false) => |x, lo, hi| lo < x && x < hi,
    }
}

/// Domain endpoints for the clamping rules
pub(crate) trait Bounded {
    const MIN: Self;
    const MAX: Self;
}

macro_rules! impl_bounded {
    ($($t:ty),*) => {
        $(impl Bounded for $t {
            const MIN: Self = <$t>::MIN;
            const MAX: Self = <$t>::MAX;
        })*
    };
}

impl_bounded!(i8, i16, i32, i64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldId, MAX_TIMESTAMP};
    use crate::storage::column::ColumnBatch;
    use crate::storage::segment::Schema;
    use rustc_hash::FxHashMap;

    fn int16_segment(values: Vec<i16>) -> Arc<Segment> {
        let schema = Schema::new().add_field(FieldId(1), "x", DataType::Int16);
        let segment = Segment::growing(schema, 8).unwrap();
        let timestamps: Vec<u64> = (1..=values.len() as u64).collect();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(1), ColumnBatch::Int16(values));
        segment.insert(&timestamps, &batches).unwrap();
        segment
    }

    fn run(
        segment: Arc<Segment>,
        lower: i64,
        upper: i64,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Vec<bool> {
        let col = ColumnInfo::new(FieldId(1), DataType::Int16);
        let mut expr = BinaryRangeExpr::new(
            col,
            ScalarValue::Int64(lower),
            ScalarValue::Int64(upper),
            lower_inclusive,
            upper_inclusive,
            segment,
            MAX_TIMESTAMP,
            100,
        )
        .unwrap();
        let mut all = Vec::new();
        while let Some(batch) = expr.eval().unwrap() {
            all.extend_from_slice(batch.as_slice());
        }
        all
    }

    #[test]
    fn test_inclusivity_variants() {
        let segment = int16_segment(vec![1, 2, 3, 4, 5]);
        assert_eq!(
            run(segment.clone(), 2, 4, true, true),
            vec![false, true, true, true, false]
        );
        assert_eq!(
            run(segment.clone(), 2, 4, true, false),
            vec![false, true, true, false, false]
        );
        assert_eq!(
            run(segment.clone(), 2, 4, false, true),
            vec![false, false, true, true, false]
        );
        assert_eq!(
            run(segment, 2, 4, false, false),
            vec![false, false, true, false, false]
        );
    }

    #[test]
    fn test_bound_clamping() {
        let segment = int16_segment(vec![i16::MIN, -5, 0, 5, i16::MAX]);

        // lower bound below the domain clamps to MIN inclusive
        let bits = run(segment.clone(), i64::from(i16::MIN) - 10, 0, false, true);
        assert_eq!(bits, vec![true, true, true, false, false]);

        // upper bound above the domain clamps to MAX inclusive
        let bits = run(segment.clone(), 0, i64::from(i16::MAX) + 10, false, false);
        assert_eq!(bits, vec![false, false, false, true, true]);

        // lower bound above the domain collapses to all-false
        let bits = run(segment.clone(), i64::from(i16::MAX) + 1, i64::MAX, true, true);
        assert!(bits.iter().all(|b| !b));

        // upper bound below the domain collapses to all-false
        let bits = run(segment, i64::MIN, i64::from(i16::MIN) - 1, true, true);
        assert!(bits.iter().all(|b| !b));
    }

    #[test]
    fn test_varchar_lexicographic() {
        let schema = Schema::new().add_field(FieldId(1), "s", DataType::Varchar);
        let segment = Segment::growing(schema, 4).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(
            FieldId(1),
            ColumnBatch::Varchar(vec!["apple".into(), "banana".into(), "cherry".into()]),
        );
        segment.insert(&[1, 2, 3], &batches).unwrap();

        let col = ColumnInfo::new(FieldId(1), DataType::Varchar);
        let mut expr = BinaryRangeExpr::new(
            col,
            ScalarValue::string("b"),
            ScalarValue::string("c"),
            true,
            false,
            segment,
            MAX_TIMESTAMP,
            10,
        )
        .unwrap();
        let batch = expr.eval().unwrap().unwrap();
        assert_eq!(batch.as_slice(), &[false, true, false]);
    }
}
