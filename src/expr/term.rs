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

//! Term filter: `col IN (values)`
//!
//! Data mode probes a hash set (`FxHashSet` for integer keys, `AHashSet`
//! for strings and mixed JSON literals), a sorted probe list (floats), or
//! precomputed flags (bool); index mode routes through the scalar index's
//! `In` capability. The JSON `is_in_field` form inverts the membership:
//! the single literal is searched inside the JSON array at the column's
//! nested path, with `find_term` doing the scan for numeric arrays.

use std::sync::Arc;

use ahash::AHashSet;
use rustc_hash::FxHashSet;
use serde_json::Value as JsonValue;

use crate::core::{BoolVector, DataType, Error, Result, ScalarValue, Timestamp};
use crate::simd::SimdElement;
use crate::storage::segment::Segment;

use super::json;
use super::segment_cursor::{walk_rows, FilterElement, SegmentCursor};
use super::ColumnInfo;

const FAMILY: &str = "term";

/// Physical evaluator for `col IN (values)`
#[derive(Debug)]
pub struct TermExpr {
    column: ColumnInfo,
    values: Vec<ScalarValue>,
    is_in_field: bool,
    cursor: SegmentCursor,
}

impl TermExpr {
    pub(crate) fn new(
        column: ColumnInfo,
        values: Vec<ScalarValue>,
        is_in_field: bool,
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
        if is_in_field {
            if column.data_type != DataType::Json {
                return Err(Error::type_invalid("term in_field", column.data_type));
            }
            if values.len() != 1 {
                return Err(Error::expr_invalid(
                    "in_field term takes exactly one element",
                ));
            }
        }
        let index_mode = segment.has_index(column.field_id);
        let cursor = SegmentCursor::new(
            segment,
            column.field_id,
            query_timestamp,
            batch_size,
            index_mode,
        )?;
        Ok(TermExpr {
            column,
            values,
            is_in_field,
            cursor,
        })
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        match self.column.data_type {
            DataType::Bool => self.eval_bool(),
            DataType::Int8 => self.eval_int::<i8>(),
            DataType::Int16 => self.eval_int::<i16>(),
            DataType::Int32 => self.eval_int::<i32>(),
            DataType::Int64 => self.eval_int::<i64>(),
            DataType::Float => self.eval_float::<f32>(),
            DataType::Double => self.eval_float::<f64>(),
            DataType::Varchar => self.eval_varchar(),
            DataType::Json => {
                if self.is_in_field {
                    self.eval_json_in_field()
                } else {
                    self.eval_json_term()
                }
            }
            other => Err(Error::type_invalid(FAMILY, other)),
        }
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        self.cursor.skip_batch()
    }

    fn eval_bool(&mut self) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let mut probe = Vec::with_capacity(self.values.len());
        for v in &self.values {
            probe.push(v.as_bool()?);
        }
        if self.cursor.index_mode() {
            self.cursor.index_batch(move |idx| {
                let typed = idx.as_bool()?;
                Ok(typed.of_in(&probe))
            })
        } else {
            let has_true = probe.contains(&true);
            let has_false = probe.contains(&false);
            self.data_membership(n, move |&x: &bool| if x { has_true } else { has_false })
        }
    }

    fn eval_int<T>(&mut self) -> Result<Option<BoolVector>>
    where
        T: FilterElement + TryFrom<i64> + Into<i64>,
    {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        if self.cursor.index_mode() {
            // values outside the column domain can never match
            let mut probe: Vec<T> = Vec::with_capacity(self.values.len());
            for v in &self.values {
                if let Ok(x) = T::try_from(v.as_i64()?) {
                    probe.push(x);
                }
            }
            self.cursor.index_batch(move |idx| {
                let typed = T::typed_index(idx)?;
                Ok(typed.of_in(&probe))
            })
        } else {
            let mut set: FxHashSet<i64> = FxHashSet::default();
            for v in &self.values {
                set.insert(v.as_i64()?);
            }
            self.data_membership(n, move |x: &T| set.contains(&(*x).into()))
        }
    }

    fn eval_float<T>(&mut self) -> Result<Option<BoolVector>>
    where
        T: FilterElement + FromF64,
    {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        // NaN never equals anything; drop it from the probe list
        let mut probe: Vec<T> = Vec::with_capacity(self.values.len());
        for v in &self.values {
            let f = v.as_f64()?;
            if !f.is_nan() {
                probe.push(T::from_f64(f));
            }
        }
        probe.sort_by(|a, b| a.key_cmp(b));
        if self.cursor.index_mode() {
            self.cursor.index_batch(move |idx| {
                let typed = T::typed_index(idx)?;
                Ok(typed.of_in(&probe))
            })
        } else {
            self.data_membership(n, move |x: &T| {
                probe.binary_search_by(|p| p.key_cmp(x)).is_ok()
            })
        }
    }

    fn eval_varchar(&mut self) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let mut probe = Vec::with_capacity(self.values.len());
        for v in &self.values {
            probe.push(v.as_str()?.to_string());
        }
        if self.cursor.index_mode() {
            self.cursor.index_batch(move |idx| {
                let typed = idx.as_varchar()?;
                Ok(typed.of_in(&probe))
            })
        } else {
            let set: AHashSet<String> = probe.into_iter().collect();
            let segment = self.cursor.segment().clone();
            let column = segment.column(self.cursor.field_id())?;
            let col = column.as_varchar()?;
            let mut out = vec![false; n];
            walk_rows(col, self.cursor.pos(), n, |k, s| {
                out[k] = set.contains(s.as_str());
                Ok(())
            })?;
            self.cursor.advance(n)?;
            Ok(Some(BoolVector::new(out)))
        }
    }

    // shared data-mode walk over the typed column
    fn data_membership<T, F>(&mut self, n: usize, test: F) -> Result<Option<BoolVector>>
    where
        T: FilterElement,
        F: Fn(&T) -> bool,
    {
        let segment = self.cursor.segment().clone();
        let column = segment.column(self.cursor.field_id())?;
        let col = T::typed_column(&column)?;
        let mut out = vec![false; n];
        walk_rows(col, self.cursor.pos(), n, |k, x| {
            out[k] = test(x);
            Ok(())
        })?;
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }

    // `col IN (values)` where col is a JSON path; the mixed-value literal
    // set probes through one hash set instead of a per-row linear scan
    fn eval_json_term(&mut self) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let ptr = json::pointer(&self.column.nested_path);
        let set = json::literal_set(&self.values);
        let segment = self.cursor.segment().clone();
        let column = segment.column(self.cursor.field_id())?;
        let col = column.as_json()?;
        let mut out = vec![false; n];
        walk_rows(col, self.cursor.pos(), n, |k, doc| {
            if let Some(value) = json::lookup(doc, &ptr) {
                out[k] = json::set_matches(&set, value);
            }
            Ok(())
        })?;
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }

    // `value IN col` over the JSON array at the nested path
    fn eval_json_in_field(&mut self) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let ptr = json::pointer(&self.column.nested_path);
        let value = self.values[0].clone();
        let segment = self.cursor.segment().clone();
        let column = segment.column(self.cursor.field_id())?;
        let col = column.as_json()?;
        let mut out = vec![false; n];
        // reused decode buffers for the numeric fast paths
        let mut ints: Vec<i64> = Vec::new();
        let mut floats: Vec<f64> = Vec::new();
        walk_rows(col, self.cursor.pos(), n, |k, doc| {
            let arr = match json::lookup(doc, &ptr).and_then(JsonValue::as_array) {
                Some(arr) => arr,
                None => return Ok(()),
            };
            out[k] = match &value {
                ScalarValue::Int64(v) => {
                    ints.clear();
                    ints.extend(arr.iter().filter_map(JsonValue::as_i64));
                    i64::find_term(&ints, *v)
                }
                ScalarValue::Float64(v) => {
                    floats.clear();
                    floats.extend(arr.iter().filter_map(JsonValue::as_f64));
                    f64::find_term(&floats, *v)
                }
                lit => arr.iter().any(|elem| json::literal_matches(lit, elem)),
            };
            Ok(())
        })?;
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }
}

/// Literal narrowing for float probe lists
pub(crate) trait FromF64: Copy + PartialEq {
    fn from_f64(v: f64) -> Self;
}

impl FromF64 for f32 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl FromF64 for f64 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldId, MAX_TIMESTAMP};
    use crate::storage::column::ColumnBatch;
    use crate::storage::segment::Schema;
    use rustc_hash::FxHashMap;
    use serde_json::json;

    fn drain(expr: &mut TermExpr) -> Vec<bool> {
        let mut all = Vec::new();
        while let Some(batch) = expr.eval().unwrap() {
            all.extend_from_slice(batch.as_slice());
        }
        all
    }

    #[test]
    fn test_int_term_membership() {
        let schema = Schema::new().add_field(FieldId(1), "x", DataType::Int8);
        let segment = Segment::growing(schema, 4).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(1), ColumnBatch::Int8(vec![1, 2, 3, 4, 5, 6]));
        segment.insert(&[1, 2, 3, 4, 5, 6], &batches).unwrap();

        let col = ColumnInfo::new(FieldId(1), DataType::Int8);
        // 300 is outside INT8 and can never match
        let mut expr = TermExpr::new(
            col,
            vec![
                ScalarValue::Int64(2),
                ScalarValue::Int64(5),
                ScalarValue::Int64(300),
            ],
            false,
            segment,
            MAX_TIMESTAMP,
            4,
        )
        .unwrap();
        assert_eq!(drain(&mut expr), vec![false, true, false, false, true, false]);
    }

    #[test]
    fn test_varchar_term() {
        let schema = Schema::new().add_field(FieldId(1), "s", DataType::Varchar);
        let segment = Segment::growing(schema, 4).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(
            FieldId(1),
            ColumnBatch::Varchar(vec!["a".into(), "b".into(), "c".into()]),
        );
        segment.insert(&[1, 2, 3], &batches).unwrap();

        let col = ColumnInfo::new(FieldId(1), DataType::Varchar);
        let mut expr = TermExpr::new(
            col,
            vec![ScalarValue::string("a"), ScalarValue::string("c")],
            false,
            segment,
            MAX_TIMESTAMP,
            10,
        )
        .unwrap();
        assert_eq!(drain(&mut expr), vec![true, false, true]);
    }

    #[test]
    fn test_json_in_field() {
        let schema = Schema::new().add_field(FieldId(1), "j", DataType::Json);
        let segment = Segment::growing(schema, 4).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(
            FieldId(1),
            ColumnBatch::Json(vec![
                json!({"a": [1, 2, 3]}),
                json!({"a": [4]}),
                json!({"a": "not an array"}),
                json!({}),
            ]),
        );
        segment.insert(&[1, 2, 3, 4], &batches).unwrap();

        let col = ColumnInfo::new(FieldId(1), DataType::Json).with_nested_path(["a"]);
        let mut expr = TermExpr::new(
            col,
            vec![ScalarValue::Int64(2)],
            true,
            segment,
            MAX_TIMESTAMP,
            10,
        )
        .unwrap();
        assert_eq!(drain(&mut expr), vec![true, false, false, false]);
    }

    #[test]
    fn test_in_field_requires_single_value() {
        let schema = Schema::new().add_field(FieldId(1), "j", DataType::Json);
        let segment = Segment::growing(schema, 4).unwrap();
        let col = ColumnInfo::new(FieldId(1), DataType::Json);
        assert!(matches!(
            TermExpr::new(
                col,
                vec![ScalarValue::Int64(1), ScalarValue::Int64(2)],
                true,
                segment,
                MAX_TIMESTAMP,
                10,
            ),
            Err(Error::ExprInvalid(_))
        ));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let schema = Schema::new().add_field(FieldId(1), "x", DataType::Int64);
        let segment = Segment::growing(schema, 4).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(1), ColumnBatch::Int64(vec![1, 2]));
        segment.insert(&[1, 2], &batches).unwrap();

        let col = ColumnInfo::new(FieldId(1), DataType::Int64);
        let mut expr = TermExpr::new(
            col,
            Vec::new(),
            false,
            segment,
            MAX_TIMESTAMP,
            10,
        )
        .unwrap();
        assert_eq!(drain(&mut expr), vec![false, false]);
    }
}
