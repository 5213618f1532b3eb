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

//! Storage layer: chunked columns, scalar indexes and segments

pub mod chunked;
pub mod column;
pub mod config;
pub mod scalar_index;
pub mod segment;

pub use chunked::ChunkedVec;
pub use column::{ColumnBatch, ColumnData};
pub use config::EvalConfig;
pub use scalar_index::{IndexKey, ScalarIndex, ScalarIndexData};
pub use segment::{FieldMeta, Schema, Segment};
