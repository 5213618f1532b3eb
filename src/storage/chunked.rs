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

//! Append-only chunked column
//!
//! A lazy sequence of fixed-size chunks for one field. Every chunk except
//! the last holds exactly `size_per_chunk` elements; chunk `i` starts at
//! logical offset `i * size_per_chunk`. Many readers, single writer: the
//! writer appends under the exclusive latch and publishes the new length
//! with a release store; readers only dereference rows below the published
//! length, so they never observe a partially written suffix.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::{Error, Result};

/// Fixed-size-chunk column of `T`
#[derive(Debug)]
pub struct ChunkedVec<T> {
    size_per_chunk: usize,
    chunks: RwLock<Vec<Arc<Vec<T>>>>,
    len: AtomicUsize,
}

impl<T: Clone> ChunkedVec<T> {
    /// Create an empty column; `size_per_chunk` must be positive
    pub fn new(size_per_chunk: usize) -> Self {
        assert!(size_per_chunk > 0, "size_per_chunk must be positive");
        ChunkedVec {
            size_per_chunk,
            chunks: RwLock::new(Vec::new()),
            len: AtomicUsize::new(0),
        }
    }

    /// Published element count
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_per_chunk(&self) -> usize {
        self.size_per_chunk
    }

    /// Number of chunks covering the published length
    pub fn num_chunks(&self) -> usize {
        self.len().div_ceil(self.size_per_chunk)
    }

    /// Length of chunk `i` under the published length
    pub fn chunk_len(&self, i: usize) -> usize {
        let len = self.len();
        let start = i * self.size_per_chunk;
        if start >= len {
            0
        } else {
            (len - start).min(self.size_per_chunk)
        }
    }

    /// Append new elements, splitting writes at chunk boundaries
    ///
    /// Single-writer: concurrent appends are not supported. A reader that
    /// still holds the previous `Arc` of a partial chunk keeps observing its
    /// old prefix; the new length is published last.
    pub fn append(&self, data: &[T]) {
        if data.is_empty() {
            return;
        }
        let mut chunks = self.chunks.write();
        let mut remaining = data;
        loop {
            let fill = chunks.last().map_or(0, |c| c.len());
            if fill > 0 && fill < self.size_per_chunk {
                let take = remaining.len().min(self.size_per_chunk - fill);
                let last = chunks.last_mut().unwrap();
                Arc::make_mut(last).extend_from_slice(&remaining[..take]);
                remaining = &remaining[take..];
            } else if !remaining.is_empty() {
                let take = remaining.len().min(self.size_per_chunk);
                let mut chunk = Vec::with_capacity(self.size_per_chunk);
                chunk.extend_from_slice(&remaining[..take]);
                chunks.push(Arc::new(chunk));
                remaining = &remaining[take..];
            }
            if remaining.is_empty() {
                break;
            }
        }
        drop(chunks);
        self.len.fetch_add(data.len(), Ordering::Release);
    }

    /// Read-only handle to chunk `i`
    ///
    /// The returned `Arc` stays valid after the latch is released; only the
    /// first `chunk_len(i)` elements are published rows.
    pub fn chunk(&self, i: usize) -> Result<Arc<Vec<T>>> {
        let chunks = self.chunks.read();
        chunks.get(i).cloned().ok_or(Error::ChunkOutOfRange {
            chunk: i,
            num_chunks: chunks.len(),
        })
    }

    /// Logical position of a row: (chunk index, offset in chunk)
    #[inline]
    pub fn chunk_of(&self, row: usize) -> (usize, usize) {
        (row / self.size_per_chunk, row % self.size_per_chunk)
    }

    /// Clone out a single element
    pub fn get(&self, row: usize) -> Option<T> {
        if row >= self.len() {
            return None;
        }
        let (ci, off) = self.chunk_of(row);
        let chunk = self.chunks.read().get(ci).cloned()?;
        chunk.get(off).cloned()
    }

    /// First index in `[0, len)` where `pred` is false, assuming `pred` is
    /// monotone (true prefix, false suffix)
    pub fn partition_point<F>(&self, mut pred: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut lo = 0;
        let mut hi = self.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            // published rows below len always exist
            let v = self.get(mid).expect("published row missing");
            if pred(&v) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }
}
