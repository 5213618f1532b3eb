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

//! JSON path predicates: `exists` and `json_contains{_any,_all}`
//!
//! Pointer resolution is single-shot per row; nothing about the document
//! structure is cached across rows. A missing pointer or a type mismatch
//! makes the row fail, except `!=` which passes (the row provably does not
//! hold the compared value).

use std::sync::Arc;

use ahash::AHashSet;
use serde_json::Value as JsonValue;

use crate::core::{BoolVector, CompareOp, DataType, Error, Result, ScalarValue, Timestamp};
use crate::storage::segment::Segment;

use super::segment_cursor::{walk_rows, SegmentCursor};
use super::{ColumnInfo, ContainsMode};

/// RFC 6901 pointer for a nested path, outermost key first
pub(crate) fn pointer(path: &[String]) -> String {
    let mut out = String::new();
    for part in path {
        out.push('/');
        for c in part.chars() {
            match c {
                '~' => out.push_str("~0"),
                '/' => out.push_str("~1"),
                _ => out.push(c),
            }
        }
    }
    out
}

#[inline]
pub(crate) fn lookup<'a>(doc: &'a JsonValue, ptr: &str) -> Option<&'a JsonValue> {
    if ptr.is_empty() {
        Some(doc)
    } else {
        doc.pointer(ptr)
    }
}

// a row whose pointer is missing or wrongly typed fails every predicate
// except `!=`
#[inline]
fn missing(op: CompareOp) -> bool {
    op == CompareOp::Ne
}

pub(crate) fn compare_bool(doc: &JsonValue, ptr: &str, op: CompareOp, val: bool) -> bool {
    match lookup(doc, ptr) {
        Some(JsonValue::Bool(b)) => op.compare(b, &val),
        _ => missing(op),
    }
}

pub(crate) fn compare_i64(doc: &JsonValue, ptr: &str, op: CompareOp, val: i64) -> bool {
    match lookup(doc, ptr) {
        Some(value) => {
            if let Some(x) = value.as_i64() {
                op.compare(&x, &val)
            } else if let Some(x) = value.as_f64() {
                // integer predicates also match doubles, fraction included
                // only when the comparison itself holds
                op.compare(&x, &(val as f64))
            } else {
                missing(op)
            }
        }
        None => missing(op),
    }
}

pub(crate) fn compare_f64(doc: &JsonValue, ptr: &str, op: CompareOp, val: f64) -> bool {
    match lookup(doc, ptr) {
        Some(value) => match value.as_f64() {
            Some(x) => op.compare(&x, &val),
            None => missing(op),
        },
        None => missing(op),
    }
}

pub(crate) fn compare_str(doc: &JsonValue, ptr: &str, op: CompareOp, val: &str) -> bool {
    match lookup(doc, ptr) {
        Some(JsonValue::String(s)) => match op {
            CompareOp::PrefixMatch => s.starts_with(val),
            _ => op.compare(&s.as_str(), &val),
        },
        _ => missing(op),
    }
}

/// Whether a literal equals one JSON value
///
/// Integer literals also match doubles with zero fraction.
pub(crate) fn literal_matches(lit: &ScalarValue, value: &JsonValue) -> bool {
    match lit {
        ScalarValue::Bool(v) => value.as_bool() == Some(*v),
        ScalarValue::Int64(v) => match value.as_i64() {
            Some(x) => x == *v,
            None => value.as_f64().is_some_and(|x| x == *v as f64),
        },
        ScalarValue::Float64(v) => value.as_f64() == Some(*v),
        ScalarValue::String(v) => value.as_str() == Some(v.as_str()),
    }
}

// ScalarValue hashes floats by bit pattern; fold the two zero encodings
// together so set probes agree with `==`
#[inline]
fn normalize_zero(f: f64) -> f64 {
    if f == 0.0 {
        0.0
    } else {
        f
    }
}

/// Build a probe set from mixed-type literals
///
/// A NaN literal never equals anything and is dropped.
pub(crate) fn literal_set(values: &[ScalarValue]) -> AHashSet<ScalarValue> {
    let mut set = AHashSet::with_capacity(values.len());
    for value in values {
        match value {
            ScalarValue::Float64(f) if f.is_nan() => {}
            ScalarValue::Float64(f) => {
                set.insert(ScalarValue::Float64(normalize_zero(*f)));
            }
            other => {
                set.insert(other.clone());
            }
        }
    }
    set
}

/// Whether any literal in the set equals one JSON value
///
/// Agrees with `literal_matches` over every literal in the set: a JSON
/// integer also probes as a double and an integral double also probes as
/// an integer.
pub(crate) fn set_matches(set: &AHashSet<ScalarValue>, value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => set.contains(&ScalarValue::Bool(*b)),
        JsonValue::String(s) => set.contains(&ScalarValue::String(s.clone())),
        JsonValue::Number(_) => {
            if let Some(i) = value.as_i64() {
                set.contains(&ScalarValue::Int64(i))
                    || set.contains(&ScalarValue::Float64(normalize_zero(i as f64)))
            } else if let Some(f) = value.as_f64() {
                set.contains(&ScalarValue::Float64(normalize_zero(f)))
                    || (f.fract() == 0.0
                        && f >= i64::MIN as f64
                        && f <= i64::MAX as f64
                        && set.contains(&ScalarValue::Int64(f as i64)))
            } else {
                false
            }
        }
        _ => false,
    }
}

/// Physical evaluator for `exists(json_col[path])`
#[derive(Debug)]
pub struct ExistsExpr {
    column: ColumnInfo,
    cursor: SegmentCursor,
}

impl ExistsExpr {
    pub(crate) fn new(
        column: ColumnInfo,
        segment: Arc<Segment>,
        query_timestamp: Timestamp,
        batch_size: usize,
    ) -> Result<Self> {
        if column.data_type != DataType::Json {
            return Err(Error::type_invalid("exists", column.data_type));
        }
        if segment.field_type(column.field_id)? != DataType::Json {
            return Err(Error::expr_invalid(format!(
                "column {} is not JSON",
                column.field_id
            )));
        }
        let cursor = SegmentCursor::new(segment, column.field_id, query_timestamp, batch_size, false)?;
        Ok(ExistsExpr { column, cursor })
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let ptr = pointer(&self.column.nested_path);
        let segment = self.cursor.segment().clone();
        let column = segment.column(self.cursor.field_id())?;
        let col = column.as_json()?;
        let mut out = vec![false; n];
        walk_rows(col, self.cursor.pos(), n, |k, doc| {
            out[k] = lookup(doc, &ptr).is_some();
            Ok(())
        })?;
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        self.cursor.skip_batch()
    }
}

/// Physical evaluator for `json_contains{_any,_all}(json_col[path], values)`
#[derive(Debug)]
pub struct JsonContainsExpr {
    column: ColumnInfo,
    mode: ContainsMode,
    values: Vec<ScalarValue>,
    cursor: SegmentCursor,
}

impl JsonContainsExpr {
    pub(crate) fn new(
        column: ColumnInfo,
        mode: ContainsMode,
        values: Vec<ScalarValue>,
        segment: Arc<Segment>,
        query_timestamp: Timestamp,
        batch_size: usize,
    ) -> Result<Self> {
        if column.data_type != DataType::Json {
            return Err(Error::type_invalid("json contains", column.data_type));
        }
        if values.is_empty() {
            return Err(Error::expr_invalid("json contains needs at least one value"));
        }
        let cursor = SegmentCursor::new(segment, column.field_id, query_timestamp, batch_size, false)?;
        Ok(JsonContainsExpr {
            column,
            mode,
            values,
            cursor,
        })
    }

    pub fn eval(&mut self) -> Result<Option<BoolVector>> {
        let n = self.cursor.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        let ptr = pointer(&self.column.nested_path);
        let mode = self.mode;
        let values = &self.values;
        let segment = self.cursor.segment().clone();
        let column = segment.column(self.cursor.field_id())?;
        let col = column.as_json()?;
        let mut out = vec![false; n];
        walk_rows(col, self.cursor.pos(), n, |k, doc| {
            let arr = match lookup(doc, &ptr).and_then(JsonValue::as_array) {
                Some(arr) => arr,
                None => return Ok(()),
            };
            out[k] = match mode {
                ContainsMode::Any => values
                    .iter()
                    .any(|lit| arr.iter().any(|elem| literal_matches(lit, elem))),
                ContainsMode::All => values
                    .iter()
                    .all(|lit| arr.iter().any(|elem| literal_matches(lit, elem))),
            };
            Ok(())
        })?;
        self.cursor.advance(n)?;
        Ok(Some(BoolVector::new(out)))
    }

    pub fn skip_batch(&mut self) -> Result<usize> {
        self.cursor.skip_batch()
    }
}
