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

//! Segment: a contiguous set of rows with shared schema
//!
//! A growing segment takes whole-row insert batches tagged with monotone
//! timestamps and stores each field in fixed-size chunks. A sealed segment
//! is filled once, holds a single logical chunk per field, and may carry a
//! scalar index per field. Row visibility at a query timestamp is the
//! prefix of rows whose insert timestamp is not greater than it, minus the
//! rows deleted at or before it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;

use super::column::{ColumnBatch, ColumnData};
use super::scalar_index::ScalarIndexData;
use crate::common::Bitset;
use crate::core::{DataType, Error, FieldId, Result, SegmentKind, Timestamp};
use crate::storage::chunked::ChunkedVec;

/// Field description within a schema
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub name: String,
    pub data_type: DataType,
}

/// Ordered set of fields shared by every row of a segment
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(FieldId, FieldMeta)>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    /// Builder-style field registration
    pub fn add_field(mut self, field_id: FieldId, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push((
            field_id,
            FieldMeta {
                name: name.into(),
                data_type,
            },
        ));
        self
    }

    pub fn field(&self, field_id: FieldId) -> Option<&FieldMeta> {
        self.fields
            .iter()
            .find(|(fid, _)| *fid == field_id)
            .map(|(_, meta)| meta)
    }

    pub fn fields(&self) -> impl Iterator<Item = (FieldId, &FieldMeta)> {
        self.fields.iter().map(|(fid, meta)| (*fid, meta))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A segment of rows, growing or sealed
#[derive(Debug)]
pub struct Segment {
    kind: SegmentKind,
    schema: Schema,
    size_per_chunk: usize,
    columns: RwLock<FxHashMap<FieldId, Arc<ColumnData>>>,
    indexes: RwLock<FxHashMap<FieldId, Arc<ScalarIndexData>>>,
    timestamps: ChunkedVec<Timestamp>,
    deletes: RwLock<Vec<(u32, Timestamp)>>,
    filled: AtomicBool,
}

impl Segment {
    /// Create an empty growing segment
    pub fn growing(schema: Schema, size_per_chunk: usize) -> Result<Arc<Self>> {
        Self::create(SegmentKind::Growing, schema, size_per_chunk)
    }

    /// Create a sealed segment holding `num_rows` rows in one logical chunk;
    /// the rows arrive through a single `fill` call
    pub fn sealed(schema: Schema, num_rows: usize) -> Result<Arc<Self>> {
        Self::create(SegmentKind::Sealed, schema, num_rows.max(1))
    }

    fn create(kind: SegmentKind, schema: Schema, size_per_chunk: usize) -> Result<Arc<Self>> {
        if size_per_chunk == 0 {
            return Err(Error::fatal("size_per_chunk must be positive"));
        }
        let mut columns = FxHashMap::default();
        for (fid, meta) in schema.fields() {
            if meta.data_type.is_filterable() {
                columns.insert(fid, Arc::new(ColumnData::new(meta.data_type, size_per_chunk)?));
            }
        }
        Ok(Arc::new(Segment {
            kind,
            schema,
            size_per_chunk,
            columns: RwLock::new(columns),
            indexes: RwLock::new(FxHashMap::default()),
            timestamps: ChunkedVec::new(size_per_chunk),
            deletes: RwLock::new(Vec::new()),
            filled: AtomicBool::new(false),
        }))
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn size_per_chunk(&self) -> usize {
        self.size_per_chunk
    }

    /// Published row count
    pub fn num_rows(&self) -> usize {
        self.timestamps.len()
    }

    /// Declared element type of a field
    pub fn field_type(&self, field_id: FieldId) -> Result<DataType> {
        self.schema
            .field(field_id)
            .map(|meta| meta.data_type)
            .ok_or(Error::FieldNotFound(field_id.get()))
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Append rows to a growing segment
    ///
    /// `timestamps` must be monotone and not precede the segment's last
    /// timestamp; every stored field must receive a batch of equal length.
    /// Column data lands before the timestamp column publishes the rows.
    pub fn insert(
        &self,
        timestamps: &[Timestamp],
        batches: &FxHashMap<FieldId, ColumnBatch>,
    ) -> Result<()> {
        if self.kind == SegmentKind::Sealed {
            return Err(Error::SegmentSealed);
        }
        self.ingest(timestamps, batches)
    }

    /// One-shot fill of a sealed segment
    pub fn fill(
        &self,
        timestamps: &[Timestamp],
        batches: &FxHashMap<FieldId, ColumnBatch>,
    ) -> Result<()> {
        if self.kind != SegmentKind::Sealed {
            return Err(Error::expr_invalid("fill applies to sealed segments"));
        }
        if self.filled.swap(true, Ordering::AcqRel) {
            return Err(Error::SegmentSealed);
        }
        if timestamps.len() > self.size_per_chunk {
            return Err(Error::InsertMismatch(format!(
                "sealed segment sized for {} rows, got {}",
                self.size_per_chunk,
                timestamps.len()
            )));
        }
        self.ingest(timestamps, batches)
    }

    fn ingest(
        &self,
        timestamps: &[Timestamp],
        batches: &FxHashMap<FieldId, ColumnBatch>,
    ) -> Result<()> {
        if timestamps.is_empty() {
            return Ok(());
        }
        if !timestamps.windows(2).all(|w| w[0] <= w[1]) {
            return Err(Error::InsertMismatch(
                "insert timestamps must be monotone".to_string(),
            ));
        }
        if let Some(last) = self.last_timestamp() {
            if timestamps[0] < last {
                return Err(Error::InsertMismatch(
                    "insert timestamps precede the segment's last row".to_string(),
                ));
            }
        }

        let columns = self.columns.read();
        for (&fid, batch) in batches.iter() {
            let column = columns
                .get(&fid)
                .ok_or(Error::FieldNotFound(fid.get()))?;
            if batch.len() != timestamps.len() {
                return Err(Error::InsertMismatch(format!(
                    "field {} batch has {} rows, expected {}",
                    fid,
                    batch.len(),
                    timestamps.len()
                )));
            }
            column.append(batch)?;
        }
        for (&fid, column) in columns.iter() {
            if !batches.contains_key(&fid) {
                return Err(Error::InsertMismatch(format!(
                    "missing batch for field {} ({})",
                    fid,
                    column.data_type()
                )));
            }
        }
        drop(columns);

        // publish the rows
        self.timestamps.append(timestamps);
        Ok(())
    }

    /// Record a point delete of `row` effective at `ts`
    pub fn delete(&self, row: u32, ts: Timestamp) -> Result<()> {
        if (row as usize) >= self.num_rows() {
            return Err(Error::InsertMismatch(format!(
                "delete of row {} past {} rows",
                row,
                self.num_rows()
            )));
        }
        self.deletes.write().push((row, ts));
        Ok(())
    }

    fn last_timestamp(&self) -> Option<Timestamp> {
        let n = self.timestamps.len();
        if n == 0 {
            None
        } else {
            self.timestamps.get(n - 1)
        }
    }

    // =========================================================================
    // Scalar index
    // =========================================================================

    /// Build the per-field scalar index; sealed segments only
    pub fn build_scalar_index(&self, field_id: FieldId) -> Result<()> {
        if self.kind != SegmentKind::Sealed {
            return Err(Error::not_implemented(
                "scalar index on a growing segment",
            ));
        }
        let column = self.column(field_id)?;
        let index = ScalarIndexData::build(&column)?;
        self.indexes.write().insert(field_id, Arc::new(index));
        Ok(())
    }

    /// Whether the field's reads route to a scalar index
    pub fn has_index(&self, field_id: FieldId) -> bool {
        self.indexes.read().contains_key(&field_id)
    }

    /// The field's scalar index
    pub fn scalar_index(&self, field_id: FieldId) -> Result<Arc<ScalarIndexData>> {
        self.indexes
            .read()
            .get(&field_id)
            .cloned()
            .ok_or(Error::IndexNotBuilt(field_id.get()))
    }

    /// Number of index chunks for the field (one once built)
    pub fn num_chunk_index(&self, field_id: FieldId) -> usize {
        if self.has_index(field_id) {
            1
        } else {
            0
        }
    }

    // =========================================================================
    // Data access
    // =========================================================================

    /// The field's chunked column
    pub fn column(&self, field_id: FieldId) -> Result<Arc<ColumnData>> {
        self.columns
            .read()
            .get(&field_id)
            .cloned()
            .ok_or(Error::FieldNotFound(field_id.get()))
    }

    /// Number of data chunks for the field
    pub fn num_chunk_data(&self, field_id: FieldId) -> Result<usize> {
        Ok(self.column(field_id)?.num_chunks())
    }

    // =========================================================================
    // Visibility
    // =========================================================================

    /// Rows visible as of `ts`: the prefix with insert timestamp `<= ts`
    pub fn get_active_count(&self, ts: Timestamp) -> usize {
        self.timestamps.partition_point(|&t| t <= ts)
    }

    /// Clear bits of rows inserted after `ts`
    pub fn mask_with_timestamps(&self, bitset: &mut Bitset, ts: Timestamp) {
        let visible = self.get_active_count(ts);
        for i in visible..bitset.len() {
            bitset.clear(i);
        }
    }

    /// Clear bits of rows deleted at or before `ts`, within the first
    /// `active` rows
    pub fn mask_with_delete(&self, bitset: &mut Bitset, active: usize, ts: Timestamp) {
        let deletes = self.deletes.read();
        if deletes.is_empty() {
            return;
        }
        let mut deleted = RoaringBitmap::new();
        for &(row, dts) in deletes.iter() {
            if dts <= ts && (row as usize) < active {
                deleted.insert(row);
            }
        }
        drop(deletes);
        for row in deleted.iter() {
            if (row as usize) < bitset.len() {
                bitset.clear(row as usize);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MAX_TIMESTAMP;

    fn int_schema() -> Schema {
        Schema::new().add_field(FieldId(100), "id", DataType::Int64)
    }

    fn insert_rows(segment: &Segment, start: i64, n: i64, ts0: Timestamp) {
        let mut batches = FxHashMap::default();
        batches.insert(
            FieldId(100),
            ColumnBatch::Int64((start..start + n).collect()),
        );
        let timestamps: Vec<Timestamp> = (0..n as u64).map(|i| ts0 + i).collect();
        segment.insert(&timestamps, &batches).unwrap();
    }

    #[test]
    fn test_growing_insert_and_chunks() {
        let segment = Segment::growing(int_schema(), 16).unwrap();
        insert_rows(&segment, 0, 40, 1);
        assert_eq!(segment.num_rows(), 40);
        assert_eq!(segment.num_chunk_data(FieldId(100)).unwrap(), 3);
        assert!(!segment.has_index(FieldId(100)));
        assert_eq!(segment.field_type(FieldId(100)).unwrap(), DataType::Int64);
    }

    #[test]
    fn test_sealed_fill_once() {
        let segment = Segment::sealed(int_schema(), 8).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(100), ColumnBatch::Int64((0..8).collect()));
        let timestamps: Vec<Timestamp> = (1..=8).collect();
        segment.fill(&timestamps, &batches).unwrap();
        assert_eq!(segment.num_rows(), 8);
        assert_eq!(segment.num_chunk_data(FieldId(100)).unwrap(), 1);

        assert!(matches!(
            segment.fill(&timestamps, &batches),
            Err(Error::SegmentSealed)
        ));
        assert!(matches!(
            segment.insert(&timestamps, &batches),
            Err(Error::SegmentSealed)
        ));
    }

    #[test]
    fn test_insert_validation() {
        let segment = Segment::growing(int_schema(), 8).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(100), ColumnBatch::Int64(vec![1, 2]));

        // timestamp count mismatch
        assert!(segment.insert(&[1], &batches).is_err());
        // non-monotone timestamps
        assert!(segment.insert(&[5, 3], &batches).is_err());
        // missing field batch
        assert!(segment.insert(&[1, 2], &FxHashMap::default()).is_err());

        segment.insert(&[5, 6], &batches).unwrap();
        // going backwards relative to the last row
        assert!(segment.insert(&[4, 7], &batches).is_err());
    }

    #[test]
    fn test_active_count() {
        let segment = Segment::growing(int_schema(), 16).unwrap();
        insert_rows(&segment, 0, 10, 100); // timestamps 100..109
        assert_eq!(segment.get_active_count(MAX_TIMESTAMP), 10);
        assert_eq!(segment.get_active_count(104), 5);
        assert_eq!(segment.get_active_count(99), 0);
        assert_eq!(segment.get_active_count(109), 10);
    }

    #[test]
    fn test_mask_with_timestamps() {
        let segment = Segment::growing(int_schema(), 16).unwrap();
        insert_rows(&segment, 0, 10, 100);
        let mut bits = Bitset::ones(10);
        segment.mask_with_timestamps(&mut bits, 104);
        assert_eq!(bits.count_ones(), 5);
        assert!(bits.get(4));
        assert!(!bits.get(5));
    }

    #[test]
    fn test_mask_with_delete() {
        let segment = Segment::growing(int_schema(), 16).unwrap();
        insert_rows(&segment, 0, 10, 100);
        segment.delete(2, 200).unwrap();
        segment.delete(7, 300).unwrap();

        // at ts 250 only the first delete is visible
        let mut bits = Bitset::ones(10);
        segment.mask_with_delete(&mut bits, 10, 250);
        assert!(!bits.get(2));
        assert!(bits.get(7));

        let mut bits = Bitset::ones(10);
        segment.mask_with_delete(&mut bits, 10, MAX_TIMESTAMP);
        assert_eq!(bits.count_ones(), 8);

        assert!(segment.delete(99, 1).is_err());
    }

    #[test]
    fn test_scalar_index_sealed_only() {
        let growing = Segment::growing(int_schema(), 8).unwrap();
        insert_rows(&growing, 0, 4, 1);
        assert!(matches!(
            growing.build_scalar_index(FieldId(100)),
            Err(Error::NotImplemented(_))
        ));

        let sealed = Segment::sealed(int_schema(), 4).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(100), ColumnBatch::Int64(vec![3, 1, 2, 1]));
        sealed.fill(&[1, 2, 3, 4], &batches).unwrap();
        sealed.build_scalar_index(FieldId(100)).unwrap();
        assert!(sealed.has_index(FieldId(100)));
        assert_eq!(sealed.num_chunk_index(FieldId(100)), 1);
        assert_eq!(sealed.scalar_index(FieldId(100)).unwrap().len(), 4);
        assert!(matches!(
            sealed.scalar_index(FieldId(999)),
            Err(Error::IndexNotBuilt(999))
        ));
    }
}
