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

//! Per-leaf evaluation cursor
//!
//! Each leaf evaluator owns one `SegmentCursor`: the segment handle, the
//! active row count frozen at the query timestamp, and the position already
//! consumed. `next_batch_size()` is `min(batch_size, rows_remaining)`; a
//! batch may straddle chunk boundaries, so data-mode evaluators walk the
//! covered chunks run by run.
//!
//! In index mode the scalar-index capability produces one bool vector per
//! index chunk; the cursor caches it and serves batch-sized slices so index
//! and data mode share identical batch boundaries.

use std::sync::Arc;

use crate::core::{BoolVector, Error, FieldId, Result, Timestamp};
use crate::storage::chunked::ChunkedVec;
use crate::storage::scalar_index::ScalarIndexData;
use crate::storage::segment::Segment;

/// Cursor state shared by every leaf evaluator
#[derive(Debug)]
pub struct SegmentCursor {
    segment: Arc<Segment>,
    field_id: FieldId,
    batch_size: usize,
    num_rows: usize,
    pos: usize,
    index_mode: bool,
    cached_index_result: Option<BoolVector>,
}

impl SegmentCursor {
    /// Freeze the active row count at the query timestamp
    pub fn new(
        segment: Arc<Segment>,
        field_id: FieldId,
        query_timestamp: Timestamp,
        batch_size: usize,
        index_mode: bool,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::fatal("expr batch size should be greater than zero"));
        }
        let num_rows = segment.get_active_count(query_timestamp);
        Ok(SegmentCursor {
            segment,
            field_id,
            batch_size,
            num_rows,
            pos: 0,
            index_mode,
            cached_index_result: None,
        })
    }

    pub fn segment(&self) -> &Arc<Segment> {
        &self.segment
    }

    pub fn field_id(&self) -> FieldId {
        self.field_id
    }

    /// Active rows as of the query timestamp
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Rows already consumed
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Whether reads route to the scalar index
    pub fn index_mode(&self) -> bool {
        self.index_mode
    }

    /// `min(batch_size, rows_remaining)`
    pub fn next_batch_size(&self) -> usize {
        self.batch_size.min(self.num_rows - self.pos)
    }

    /// True once every active row has been consumed
    pub fn done(&self) -> bool {
        self.pos >= self.num_rows
    }

    /// Consume `n` rows
    pub fn advance(&mut self, n: usize) -> Result<()> {
        if self.pos + n > self.num_rows {
            return Err(Error::fatal(format!(
                "cursor advanced past active rows: {} + {} > {}",
                self.pos, n, self.num_rows
            )));
        }
        self.pos += n;
        Ok(())
    }

    /// Advance one batch without producing it; returns the rows skipped
    pub fn skip_batch(&mut self) -> Result<usize> {
        let n = self.next_batch_size();
        self.advance(n)?;
        Ok(n)
    }

    /// Serve one batch from the cached index-chunk result, computing the
    /// capability once on first use
    pub fn index_batch<F>(&mut self, compute: F) -> Result<Option<BoolVector>>
    where
        F: FnOnce(&ScalarIndexData) -> Result<BoolVector>,
    {
        let n = self.next_batch_size();
        if n == 0 {
            return Ok(None);
        }
        if self.cached_index_result.is_none() {
            let index = self.segment.scalar_index(self.field_id)?;
            let full = compute(index.as_ref())?;
            if full.len() < self.num_rows {
                return Err(Error::fatal(format!(
                    "index result covers {} rows, segment has {} active",
                    full.len(),
                    self.num_rows
                )));
            }
            self.cached_index_result = Some(full);
        }
        let cached = self.cached_index_result.as_ref().unwrap();
        let out = BoolVector::new(cached.as_slice()[self.pos..self.pos + n].to_vec());
        self.advance(n)?;
        Ok(Some(out))
    }
}

/// Element types a leaf evaluator can dispatch over
///
/// Ties together the SIMD kernel cells, the typed column accessor and the
/// typed index accessor, so family evaluators stay generic while every
/// element loop is monomorphic.
pub trait FilterElement: crate::simd::SimdElement + crate::storage::scalar_index::IndexKey {
    fn typed_column(col: &crate::storage::column::ColumnData) -> Result<&ChunkedVec<Self>>;
    fn typed_index(idx: &ScalarIndexData) -> Result<&crate::storage::scalar_index::ScalarIndex<Self>>;
}

macro_rules! impl_filter_element {
    ($t:ty, $col_accessor:ident, $idx_accessor:ident) => {
        impl FilterElement for $t {
            #[inline]
            fn typed_column(
                col: &crate::storage::column::ColumnData,
            ) -> Result<&ChunkedVec<Self>> {
                col.$col_accessor()
            }

            #[inline]
            fn typed_index(
                idx: &ScalarIndexData,
            ) -> Result<&crate::storage::scalar_index::ScalarIndex<Self>> {
                idx.$idx_accessor()
            }
        }
    };
}

impl_filter_element!(bool, as_bool, as_bool);
impl_filter_element!(i8, as_int8, as_int8);
impl_filter_element!(i16, as_int16, as_int16);
impl_filter_element!(i32, as_int32, as_int32);
impl_filter_element!(i64, as_int64, as_int64);
impl_filter_element!(f32, as_float, as_float);
impl_filter_element!(f64, as_double, as_double);

/// Visit the contiguous runs of `col` covering rows `[start, start + len)`
///
/// The callback receives each run and its offset within the batch.
pub fn walk_runs<T, F>(col: &ChunkedVec<T>, start: usize, len: usize, mut f: F) -> Result<()>
where
    T: Clone,
    F: FnMut(&[T], usize) -> Result<()>,
{
    let mut row = start;
    let mut produced = 0;
    while produced < len {
        let (chunk_id, offset) = col.chunk_of(row);
        let chunk = col.chunk(chunk_id)?;
        let avail = col.chunk_len(chunk_id).saturating_sub(offset);
        if avail == 0 {
            return Err(Error::fatal(format!(
                "batch walk ran past column data at row {}",
                row
            )));
        }
        let take = avail.min(len - produced);
        f(&chunk[offset..offset + take], produced)?;
        row += take;
        produced += take;
    }
    Ok(())
}

/// Visit each element of `col` over rows `[start, start + len)`
///
/// The callback receives the offset within the batch and the element.
pub fn walk_rows<T, F>(col: &ChunkedVec<T>, start: usize, len: usize, mut f: F) -> Result<()>
where
    T: Clone,
    F: FnMut(usize, &T) -> Result<()>,
{
    walk_runs(col, start, len, |run, out| {
        for (k, item) in run.iter().enumerate() {
            f(out + k, item)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, MAX_TIMESTAMP};
    use crate::storage::column::ColumnBatch;
    use crate::storage::segment::Schema;
    use rustc_hash::FxHashMap;

    fn segment_with_rows(n: i64, size_per_chunk: usize) -> Arc<Segment> {
        let schema = Schema::new().add_field(FieldId(1), "v", DataType::Int64);
        let segment = Segment::growing(schema, size_per_chunk).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(1), ColumnBatch::Int64((0..n).collect()));
        let timestamps: Vec<u64> = (1..=n as u64).collect();
        segment.insert(&timestamps, &batches).unwrap();
        segment
    }

    #[test]
    fn test_batch_sizes_sum_to_active_count() {
        let segment = segment_with_rows(25, 4);
        let mut cursor =
            SegmentCursor::new(segment, FieldId(1), MAX_TIMESTAMP, 7, false).unwrap();
        let mut total = 0;
        let mut sizes = Vec::new();
        while !cursor.done() {
            let n = cursor.next_batch_size();
            sizes.push(n);
            cursor.advance(n).unwrap();
            total += n;
        }
        assert_eq!(total, 25);
        assert_eq!(sizes, vec![7, 7, 7, 4]);
        assert_eq!(cursor.next_batch_size(), 0);
    }

    #[test]
    fn test_zero_batch_size_is_fatal() {
        let segment = segment_with_rows(4, 4);
        assert!(matches!(
            SegmentCursor::new(segment, FieldId(1), MAX_TIMESTAMP, 0, false),
            Err(Error::Fatal(_))
        ));
    }

    #[test]
    fn test_advance_past_end_is_fatal() {
        let segment = segment_with_rows(4, 4);
        let mut cursor =
            SegmentCursor::new(segment, FieldId(1), MAX_TIMESTAMP, 10, false).unwrap();
        assert!(cursor.advance(5).is_err());
    }

    #[test]
    fn test_cursor_respects_query_timestamp() {
        let segment = segment_with_rows(10, 4);
        // timestamps are 1..=10, so ts 6 sees six rows
        let cursor = SegmentCursor::new(segment, FieldId(1), 6, 100, false).unwrap();
        assert_eq!(cursor.num_rows(), 6);
        assert_eq!(cursor.next_batch_size(), 6);
    }

    #[test]
    fn test_walk_runs_straddles_chunks() {
        let segment = segment_with_rows(20, 6);
        let col = segment.column(FieldId(1)).unwrap();
        let col = col.as_int64().unwrap();

        // rows 4..15 cross two chunk boundaries
        let mut runs = Vec::new();
        walk_runs(col, 4, 11, |run, out| {
            runs.push((out, run.to_vec()));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            runs,
            vec![
                (0, vec![4, 5]),
                (2, vec![6, 7, 8, 9, 10, 11]),
                (8, vec![12, 13, 14]),
            ]
        );

        let mut seen = Vec::new();
        walk_rows(col, 4, 11, |k, &v| {
            seen.push((k, v));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen.len(), 11);
        assert_eq!(seen[0], (0, 4));
        assert_eq!(seen[10], (10, 14));
    }
}
