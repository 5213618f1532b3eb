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

//! Per-field scalar index
//!
//! A sorted-key index over one index chunk, immutable after build, exposing
//! the capability set the evaluators consult in index mode: `In`, `NotIn`,
//! one- and two-sided `Range`, and `PrefixQuery` for strings. Every
//! capability returns a bool vector in row order over that chunk.

use std::cmp::Ordering;

use super::column::ColumnData;
use crate::core::{BoolVector, CompareOp, DataType, Error, Result};

/// Total order used for index keys
///
/// Integers and strings use their native order; floats order NaN greater
/// than every number and equal to itself, and `-0.0 == 0.0` so equality
/// probes agree with the data-mode compare kernels.
pub trait IndexKey: Clone {
    fn key_cmp(&self, other: &Self) -> Ordering;

    fn key_eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

macro_rules! impl_index_key_ord {
    ($($t:ty),*) => {
        $(impl IndexKey for $t {
            #[inline]
            fn key_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }
        })*
    };
}

impl_index_key_ord!(bool, i8, i16, i32, i64, String);

macro_rules! impl_index_key_float {
    ($($t:ty),*) => {
        $(impl IndexKey for $t {
            #[inline]
            fn key_cmp(&self, other: &Self) -> Ordering {
                match self.partial_cmp(other) {
                    Some(ord) => ord,
                    None => match (self.is_nan(), other.is_nan()) {
                        (true, true) => Ordering::Equal,
                        (true, false) => Ordering::Greater,
                        (false, true) => Ordering::Less,
                        (false, false) => unreachable!(),
                    },
                }
            }
        })*
    };
}

impl_index_key_float!(f32, f64);

/// Sorted-key scalar index over one chunk
#[derive(Debug, Clone)]
pub struct ScalarIndex<T> {
    keys: Vec<T>,
    rows: Vec<u32>,
}

impl<T: IndexKey> ScalarIndex<T> {
    /// Build from chunk data; key order is stable on row id
    pub fn build(data: &[T]) -> Self {
        let mut order: Vec<u32> = (0..data.len() as u32).collect();
        order.sort_by(|&a, &b| data[a as usize].key_cmp(&data[b as usize]).then(a.cmp(&b)));
        let keys = order.iter().map(|&r| data[r as usize].clone()).collect();
        ScalarIndex { keys, rows: order }
    }

    /// Indexed row count
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    // first position whose key is not less than val
    fn lower_bound(&self, val: &T) -> usize {
        self.keys
            .partition_point(|k| k.key_cmp(val) == Ordering::Less)
    }

    // first position whose key is greater than val
    fn upper_bound(&self, val: &T) -> usize {
        self.keys
            .partition_point(|k| k.key_cmp(val) != Ordering::Greater)
    }

    fn mark(&self, out: &mut BoolVector, lo: usize, hi: usize) {
        let bits = out.as_mut_slice();
        for &row in &self.rows[lo..hi] {
            bits[row as usize] = true;
        }
    }

    /// `In(values)`: rows whose key equals any of the values
    pub fn of_in(&self, values: &[T]) -> BoolVector {
        let mut out = BoolVector::falses(self.len());
        for val in values {
            let lo = self.lower_bound(val);
            let hi = self.upper_bound(val);
            self.mark(&mut out, lo, hi);
        }
        out
    }

    /// `NotIn(values)`: complement of `In`
    pub fn not_in(&self, values: &[T]) -> BoolVector {
        let mut out = self.of_in(values);
        out.negate();
        out
    }

    /// One-sided `Range(val, op)` for the four ordering operators
    pub fn range_op(&self, val: &T, op: CompareOp) -> Result<BoolVector> {
        let mut out = BoolVector::falses(self.len());
        let (lo, hi) = match op {
            CompareOp::Lt => (0, self.lower_bound(val)),
            CompareOp::Le => (0, self.upper_bound(val)),
            CompareOp::Gt => (self.upper_bound(val), self.len()),
            CompareOp::Ge => (self.lower_bound(val), self.len()),
            other => return Err(Error::op_invalid("scalar index range", other.to_string())),
        };
        self.mark(&mut out, lo, hi);
        Ok(out)
    }

    /// Two-sided `Range(lo, lo_incl, hi, hi_incl)`
    pub fn range(&self, lower: &T, lower_inclusive: bool, upper: &T, upper_inclusive: bool) -> BoolVector {
        let lo = if lower_inclusive {
            self.lower_bound(lower)
        } else {
            self.upper_bound(lower)
        };
        let hi = if upper_inclusive {
            self.upper_bound(upper)
        } else {
            self.lower_bound(upper)
        };
        let mut out = BoolVector::falses(self.len());
        if lo < hi {
            self.mark(&mut out, lo, hi);
        }
        out
    }
}

impl ScalarIndex<String> {
    /// `Query(prefix)`: rows whose key starts with the prefix
    pub fn prefix_query(&self, prefix: &str) -> BoolVector {
        let mut out = BoolVector::falses(self.len());
        let start = self
            .keys
            .partition_point(|k| k.as_str() < prefix);
        let mut end = start;
        while end < self.keys.len() && self.keys[end].starts_with(prefix) {
            end += 1;
        }
        self.mark(&mut out, start, end);
        out
    }
}

/// Closed set of index element types
///
/// JSON fields carry no scalar index; requesting one is a recognised but
/// unsupported combination.
#[derive(Debug, Clone)]
pub enum ScalarIndexData {
    Bool(ScalarIndex<bool>),
    Int8(ScalarIndex<i8>),
    Int16(ScalarIndex<i16>),
    Int32(ScalarIndex<i32>),
    Int64(ScalarIndex<i64>),
    Float(ScalarIndex<f32>),
    Double(ScalarIndex<f64>),
    Varchar(ScalarIndex<String>),
}

impl ScalarIndexData {
    /// Build an index over a whole column (one sealed index chunk)
    pub fn build(column: &ColumnData) -> Result<Self> {
        fn gather<T: Clone>(col: &super::chunked::ChunkedVec<T>) -> Vec<T> {
            let mut all = Vec::with_capacity(col.len());
            for i in 0..col.num_chunks() {
                let chunk = col.chunk(i).expect("published chunk");
                all.extend_from_slice(&chunk[..col.chunk_len(i)]);
            }
            all
        }

        Ok(match column {
            ColumnData::Bool(c) => ScalarIndexData::Bool(ScalarIndex::build(&gather(c))),
            ColumnData::Int8(c) => ScalarIndexData::Int8(ScalarIndex::build(&gather(c))),
            ColumnData::Int16(c) => ScalarIndexData::Int16(ScalarIndex::build(&gather(c))),
            ColumnData::Int32(c) => ScalarIndexData::Int32(ScalarIndex::build(&gather(c))),
            ColumnData::Int64(c) => ScalarIndexData::Int64(ScalarIndex::build(&gather(c))),
            ColumnData::Float(c) => ScalarIndexData::Float(ScalarIndex::build(&gather(c))),
            ColumnData::Double(c) => ScalarIndexData::Double(ScalarIndex::build(&gather(c))),
            ColumnData::Varchar(c) => ScalarIndexData::Varchar(ScalarIndex::build(&gather(c))),
            ColumnData::Json(_) => {
                return Err(Error::not_implemented("JSON with scalar index"))
            }
        })
    }

    /// Element type this index covers
    pub fn data_type(&self) -> DataType {
        match self {
            ScalarIndexData::Bool(_) => DataType::Bool,
            ScalarIndexData::Int8(_) => DataType::Int8,
            ScalarIndexData::Int16(_) => DataType::Int16,
            ScalarIndexData::Int32(_) => DataType::Int32,
            ScalarIndexData::Int64(_) => DataType::Int64,
            ScalarIndexData::Float(_) => DataType::Float,
            ScalarIndexData::Double(_) => DataType::Double,
            ScalarIndexData::Varchar(_) => DataType::Varchar,
        }
    }

    /// Indexed row count
    pub fn len(&self) -> usize {
        match self {
            ScalarIndexData::Bool(i) => i.len(),
            ScalarIndexData::Int8(i) => i.len(),
            ScalarIndexData::Int16(i) => i.len(),
            ScalarIndexData::Int32(i) => i.len(),
            ScalarIndexData::Int64(i) => i.len(),
            ScalarIndexData::Float(i) => i.len(),
            ScalarIndexData::Double(i) => i.len(),
            ScalarIndexData::Varchar(i) => i.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

macro_rules! typed_index_accessor {
    ($fn_name:ident, $variant:ident, $t:ty) => {
        impl ScalarIndexData {
            /// Typed view; errors when the index holds another type
            pub fn $fn_name(&self) -> Result<&ScalarIndex<$t>> {
                match self {
                    ScalarIndexData::$variant(i) => Ok(i),
                    other => Err(Error::type_invalid(
                        stringify!($fn_name),
                        other.data_type(),
                    )),
                }
            }
        }
    };
}

typed_index_accessor!(as_bool, Bool, bool);
typed_index_accessor!(as_int8, Int8, i8);
typed_index_accessor!(as_int16, Int16, i16);
typed_index_accessor!(as_int32, Int32, i32);
typed_index_accessor!(as_int64, Int64, i64);
typed_index_accessor!(as_float, Float, f32);
typed_index_accessor!(as_double, Double, f64);
typed_index_accessor!(as_varchar, Varchar, String);

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> ScalarIndex<i64> {
        ScalarIndex::build(&[30, 10, 20, 10, 40])
    }

    #[test]
    fn test_in_and_not_in() {
        let idx = index();
        let hits = idx.of_in(&[10, 40]);
        assert_eq!(hits.as_slice(), &[false, true, false, true, true]);

        let misses = idx.not_in(&[10, 40]);
        assert_eq!(misses.as_slice(), &[true, false, true, false, false]);
    }

    #[test]
    fn test_one_sided_range() {
        let idx = index();
        assert_eq!(
            idx.range_op(&20, CompareOp::Lt).unwrap().as_slice(),
            &[false, true, false, true, false]
        );
        assert_eq!(
            idx.range_op(&20, CompareOp::Le).unwrap().as_slice(),
            &[false, true, true, true, false]
        );
        assert_eq!(
            idx.range_op(&20, CompareOp::Gt).unwrap().as_slice(),
            &[true, false, false, false, true]
        );
        assert_eq!(
            idx.range_op(&20, CompareOp::Ge).unwrap().as_slice(),
            &[true, false, true, false, true]
        );
        assert!(idx.range_op(&20, CompareOp::Eq).is_err());
    }

    #[test]
    fn test_two_sided_range() {
        let idx = index();
        // 10 < x <= 30
        let hits = idx.range(&10, false, &30, true);
        assert_eq!(hits.as_slice(), &[true, false, true, false, false]);
        // 10 <= x < 30
        let hits = idx.range(&10, true, &30, false);
        assert_eq!(hits.as_slice(), &[false, true, true, true, false]);
        // empty interval
        let hits = idx.range(&25, true, &15, true);
        assert!(hits.all_false());
    }

    #[test]
    fn test_prefix_query() {
        let idx = ScalarIndex::build(&[
            "apple".to_string(),
            "banana".to_string(),
            "apricot".to_string(),
            "cherry".to_string(),
            "ap".to_string(),
        ]);
        let hits = idx.prefix_query("ap");
        assert_eq!(hits.as_slice(), &[true, false, true, false, true]);
        assert!(idx.prefix_query("z").all_false());
        assert!(idx.prefix_query("").all_true());
    }

    #[test]
    fn test_float_index_orders_nan_greatest() {
        let idx = ScalarIndex::build(&[1.0f64, f64::NAN, -1.0]);
        let hits = idx.range_op(&0.0, CompareOp::Gt).unwrap();
        // NaN sorts above every number in the index key order
        assert!(hits.as_slice()[0]);
        assert!(hits.as_slice()[1]);
        assert!(!hits.as_slice()[2]);
    }

    #[test]
    fn test_build_from_column_rejects_json() {
        let col = ColumnData::new(DataType::Json, 4).unwrap();
        assert!(matches!(
            ScalarIndexData::build(&col),
            Err(Error::NotImplemented(_))
        ));
    }
}
