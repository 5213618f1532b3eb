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

//! Core types for SieveDB
//!
//! Fundamental types shared by every layer: data types, operators, literal
//! values, batch vectors and the error taxonomy.

pub mod error;
pub mod types;
pub mod value;
pub mod vector;

pub use error::{Error, Result};
pub use types::{
    ArithOp, CompareOp, DataType, FieldId, LogicalOp, SegmentKind, Timestamp, MAX_TIMESTAMP,
};
pub use value::{check_int_domain, int_domain, DomainCheck, ScalarValue};
pub use vector::{BoolVector, RowVector};
