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

//! Typed column storage
//!
//! `ColumnData` is the closed set of storable element types, each wrapping a
//! `ChunkedVec`. The evaluators dispatch on the variant once per batch and
//! run monomorphic loops inside.

use serde_json::Value as JsonValue;

use super::chunked::ChunkedVec;
use crate::core::{DataType, Error, Result};

/// One field's chunked storage
#[derive(Debug)]
pub enum ColumnData {
    Bool(ChunkedVec<bool>),
    Int8(ChunkedVec<i8>),
    Int16(ChunkedVec<i16>),
    Int32(ChunkedVec<i32>),
    Int64(ChunkedVec<i64>),
    Float(ChunkedVec<f32>),
    Double(ChunkedVec<f64>),
    Varchar(ChunkedVec<String>),
    Json(ChunkedVec<JsonValue>),
}

/// One field's slice of an insert batch
#[derive(Debug, Clone)]
pub enum ColumnBatch {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Varchar(Vec<String>),
    Json(Vec<JsonValue>),
}

impl ColumnData {
    /// Create empty storage for a field type
    pub fn new(data_type: DataType, size_per_chunk: usize) -> Result<Self> {
        Ok(match data_type {
            DataType::Bool => ColumnData::Bool(ChunkedVec::new(size_per_chunk)),
            DataType::Int8 => ColumnData::Int8(ChunkedVec::new(size_per_chunk)),
            DataType::Int16 => ColumnData::Int16(ChunkedVec::new(size_per_chunk)),
            DataType::Int32 => ColumnData::Int32(ChunkedVec::new(size_per_chunk)),
            DataType::Int64 => ColumnData::Int64(ChunkedVec::new(size_per_chunk)),
            DataType::Float => ColumnData::Float(ChunkedVec::new(size_per_chunk)),
            DataType::Double => ColumnData::Double(ChunkedVec::new(size_per_chunk)),
            DataType::Varchar => ColumnData::Varchar(ChunkedVec::new(size_per_chunk)),
            DataType::Json => ColumnData::Json(ChunkedVec::new(size_per_chunk)),
            other => return Err(Error::type_invalid("column storage", other)),
        })
    }

    /// Element type of this column
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Bool(_) => DataType::Bool,
            ColumnData::Int8(_) => DataType::Int8,
            ColumnData::Int16(_) => DataType::Int16,
            ColumnData::Int32(_) => DataType::Int32,
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::Float(_) => DataType::Float,
            ColumnData::Double(_) => DataType::Double,
            ColumnData::Varchar(_) => DataType::Varchar,
            ColumnData::Json(_) => DataType::Json,
        }
    }

    /// Published row count
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(c) => c.len(),
            ColumnData::Int8(c) => c.len(),
            ColumnData::Int16(c) => c.len(),
            ColumnData::Int32(c) => c.len(),
            ColumnData::Int64(c) => c.len(),
            ColumnData::Float(c) => c.len(),
            ColumnData::Double(c) => c.len(),
            ColumnData::Varchar(c) => c.len(),
            ColumnData::Json(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of chunks covering the published rows
    pub fn num_chunks(&self) -> usize {
        match self {
            ColumnData::Bool(c) => c.num_chunks(),
            ColumnData::Int8(c) => c.num_chunks(),
            ColumnData::Int16(c) => c.num_chunks(),
            ColumnData::Int32(c) => c.num_chunks(),
            ColumnData::Int64(c) => c.num_chunks(),
            ColumnData::Float(c) => c.num_chunks(),
            ColumnData::Double(c) => c.num_chunks(),
            ColumnData::Varchar(c) => c.num_chunks(),
            ColumnData::Json(c) => c.num_chunks(),
        }
    }

    /// Append one batch; the batch variant must match the column type
    pub fn append(&self, batch: &ColumnBatch) -> Result<()> {
        match (self, batch) {
            (ColumnData::Bool(c), ColumnBatch::Bool(v)) => c.append(v),
            (ColumnData::Int8(c), ColumnBatch::Int8(v)) => c.append(v),
            (ColumnData::Int16(c), ColumnBatch::Int16(v)) => c.append(v),
            (ColumnData::Int32(c), ColumnBatch::Int32(v)) => c.append(v),
            (ColumnData::Int64(c), ColumnBatch::Int64(v)) => c.append(v),
            (ColumnData::Float(c), ColumnBatch::Float(v)) => c.append(v),
            (ColumnData::Double(c), ColumnBatch::Double(v)) => c.append(v),
            (ColumnData::Varchar(c), ColumnBatch::Varchar(v)) => c.append(v),
            (ColumnData::Json(c), ColumnBatch::Json(v)) => c.append(v),
            (col, batch) => {
                return Err(Error::InsertMismatch(format!(
                    "column is {}, batch is {}",
                    col.data_type(),
                    batch.data_type()
                )))
            }
        }
        Ok(())
    }
}

macro_rules! typed_accessor {
    ($fn_name:ident, $variant:ident, $t:ty) => {
        impl ColumnData {
            /// Typed view; errors when the column holds another type
            pub fn $fn_name(&self) -> Result<&ChunkedVec<$t>> {
                match self {
                    ColumnData::$variant(c) => Ok(c),
                    other => Err(Error::type_invalid(
                        stringify!($fn_name),
                        other.data_type(),
                    )),
                }
            }
        }
    };
}

typed_accessor!(as_bool, Bool, bool);
typed_accessor!(as_int8, Int8, i8);
typed_accessor!(as_int16, Int16, i16);
typed_accessor!(as_int32, Int32, i32);
typed_accessor!(as_int64, Int64, i64);
typed_accessor!(as_float, Float, f32);
typed_accessor!(as_double, Double, f64);
typed_accessor!(as_varchar, Varchar, String);
typed_accessor!(as_json, Json, JsonValue);

impl ColumnBatch {
    /// Element type of this batch
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnBatch::Bool(_) => DataType::Bool,
            ColumnBatch::Int8(_) => DataType::Int8,
            ColumnBatch::Int16(_) => DataType::Int16,
            ColumnBatch::Int32(_) => DataType::Int32,
            ColumnBatch::Int64(_) => DataType::Int64,
            ColumnBatch::Float(_) => DataType::Float,
            ColumnBatch::Double(_) => DataType::Double,
            ColumnBatch::Varchar(_) => DataType::Varchar,
            ColumnBatch::Json(_) => DataType::Json,
        }
    }

    /// Row count of this batch
    pub fn len(&self) -> usize {
        match self {
            ColumnBatch::Bool(v) => v.len(),
            ColumnBatch::Int8(v) => v.len(),
            ColumnBatch::Int16(v) => v.len(),
            ColumnBatch::Int32(v) => v.len(),
            ColumnBatch::Int64(v) => v.len(),
            ColumnBatch::Float(v) => v.len(),
            ColumnBatch::Double(v) => v.len(),
            ColumnBatch::Varchar(v) => v.len(),
            ColumnBatch::Json(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_unstorable_types() {
        assert!(ColumnData::new(DataType::Int64, 8).is_ok());
        assert!(ColumnData::new(DataType::Json, 8).is_ok());
        assert!(matches!(
            ColumnData::new(DataType::VectorFloat, 8),
            Err(Error::TypeInvalid { .. })
        ));
        assert!(ColumnData::new(DataType::Row, 8).is_err());
    }

    #[test]
    fn test_append_type_check() {
        let col = ColumnData::new(DataType::Int32, 8).unwrap();
        col.append(&ColumnBatch::Int32(vec![1, 2, 3])).unwrap();
        assert_eq!(col.len(), 3);
        assert!(matches!(
            col.append(&ColumnBatch::Int64(vec![4])),
            Err(Error::InsertMismatch(_))
        ));
    }

    #[test]
    fn test_typed_accessors() {
        let col = ColumnData::new(DataType::Varchar, 4).unwrap();
        col.append(&ColumnBatch::Varchar(vec!["a".into(), "b".into()]))
            .unwrap();
        let chunked = col.as_varchar().unwrap();
        assert_eq!(chunked.get(1).as_deref(), Some("b"));
        assert!(col.as_int64().is_err());
    }
}
