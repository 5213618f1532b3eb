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

//! # SieveDB - Segment filter-execution core
//!
//! SieveDB is the vectorized filter engine at the heart of a vector
//! database's segment query path: it evaluates a predicate tree over a
//! segment's chunked columnar data and produces a packed bitset selecting
//! the rows that survive, masked by deletes and a query timestamp.
//!
//! ## Key pieces
//!
//! - **Expression trees** - logical [`TypedExpr`] compiled per invocation
//!   into physical evaluators with index-aware routing
//! - **Chunked column store** - fixed-size chunks, many readers, single
//!   writer, optional per-field scalar index on sealed segments
//! - **Task runtime** - pull-based batches through a bounded queue with
//!   backpressure and cooperative cancellation
//! - **SIMD kernels** - element-wise compare, term search and bitset
//!   compaction, dispatched by ISA tier at first use
//!
//! ## Quick Start
//!
//! ```rust
//! use sievedb::{execute_filter, ColumnBatch, ColumnInfo, CompareOp, DataType,
//!     EvalConfig, FieldId, Schema, ScalarValue, Segment, TypedExpr, MAX_TIMESTAMP};
//! use rustc_hash::FxHashMap;
//!
//! // One int64 field, a thousand rows
//! let schema = Schema::new().add_field(FieldId(100), "id", DataType::Int64);
//! let segment = Segment::growing(schema, 1024).unwrap();
//! let mut batches = FxHashMap::default();
//! batches.insert(FieldId(100), ColumnBatch::Int64((0..1000i64).collect()));
//! let timestamps: Vec<u64> = (1..=1000).collect();
//! segment.insert(&timestamps, &batches).unwrap();
//!
//! // id < 10
//! let plan = TypedExpr::unary_range(
//!     ColumnInfo::new(FieldId(100), DataType::Int64),
//!     CompareOp::Lt,
//!     ScalarValue::Int64(10),
//! );
//! let bits = execute_filter(&segment, &plan, MAX_TIMESTAMP, &EvalConfig::new(), None).unwrap();
//! assert_eq!(bits.count_ones(), 10);
//! ```
//!
//! ## Modules
//!
//! - [`core`] - `DataType`, operators, literals, batch vectors, errors
//! - [`common`] - packed [`Bitset`] and shared utilities
//! - [`storage`] - chunked columns, scalar indexes, segments, config
//! - [`expr`] - logical tree, compilation, physical evaluators
//! - [`exec`] - task, bounded queue, cursor, `FilterBits`, entry point
//! - [`simd`] - kernel tiers and the process-wide dispatch table

// Use mimalloc as global allocator when the feature is enabled
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod common;
pub mod core;
pub mod exec;
pub mod expr;
pub mod simd;
pub mod storage;

// Re-export main types for convenience
pub use crate::core::{
    ArithOp, BoolVector, CompareOp, DataType, Error, FieldId, LogicalOp, Result, RowVector,
    ScalarValue, SegmentKind, Timestamp, MAX_TIMESTAMP,
};

// Re-export common utilities
pub use common::{version, Bitset};

// Re-export storage types
pub use storage::{ChunkedVec, ColumnBatch, ColumnData, EvalConfig, FieldMeta, Schema, Segment};

// Re-export expression types
pub use expr::{ColumnInfo, ContainsMode, Expr, TypedExpr};

// Re-export runtime types
pub use exec::{execute_filter, CancelHandle, FilterBits, Task, TaskCursor, TaskQueue, TaskState};

// Re-export SIMD introspection
pub use simd::{installed_tier, SimdTier};
