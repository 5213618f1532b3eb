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

//! Error types for SieveDB
//!
//! Evaluator errors are fatal to the task that raised them: the task stores
//! the error, closes its result queue, and the consumer re-raises it when
//! the cursor drains.

use thiserror::Error;

use super::types::DataType;

/// Result type alias for SieveDB operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for segment filter execution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // =========================================================================
    // Expression errors
    // =========================================================================
    /// Data type not supported by the operator family
    #[error("data type {data_type} not supported by {family}")]
    TypeInvalid {
        family: &'static str,
        data_type: DataType,
    },

    /// Operator code not supported for this family/type
    #[error("operator {op} not supported by {family}")]
    OpTypeInvalid { family: &'static str, op: String },

    /// Structural problem in the expression tree
    #[error("invalid expression: {0}")]
    ExprInvalid(String),

    /// Recognised but unsupported combination
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Violated internal assertion
    #[error("fatal: {0}")]
    Fatal(String),

    // =========================================================================
    // Storage errors
    // =========================================================================
    /// Chunk index past the published chunk list
    #[error("chunk {chunk} out of range, {num_chunks} chunks")]
    ChunkOutOfRange { chunk: usize, num_chunks: usize },

    /// Field id not present in the segment schema
    #[error("field {0} not found")]
    FieldNotFound(i64),

    /// Scalar index requested for a field that has none
    #[error("scalar index not built for field {0}")]
    IndexNotBuilt(i64),

    /// Write attempted on a sealed segment
    #[error("segment is sealed")]
    SegmentSealed,

    /// Row batch shape does not match the schema
    #[error("insert batch mismatch: {0}")]
    InsertMismatch(String),

    // =========================================================================
    // Task errors
    // =========================================================================
    /// Task observed a cancellation request at a batch boundary
    #[error("task cancelled")]
    TaskCancelled,

    /// Task failed; carries the producer's stored error message
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// Enqueue attempted on a closed queue
    #[error("task queue closed")]
    QueueClosed,
}

impl Error {
    /// Create a TypeInvalid error
    pub fn type_invalid(family: &'static str, data_type: DataType) -> Self {
        Error::TypeInvalid { family, data_type }
    }

    /// Create an OpTypeInvalid error
    pub fn op_invalid(family: &'static str, op: impl Into<String>) -> Self {
        Error::OpTypeInvalid {
            family,
            op: op.into(),
        }
    }

    /// Create an ExprInvalid error
    pub fn expr_invalid(message: impl Into<String>) -> Self {
        Error::ExprInvalid(message.into())
    }

    /// Create a NotImplemented error
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Error::NotImplemented(message.into())
    }

    /// Create a Fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        Error::Fatal(message.into())
    }

    /// Check if this error came from the expression layer
    pub fn is_expression_error(&self) -> bool {
        matches!(
            self,
            Error::TypeInvalid { .. }
                | Error::OpTypeInvalid { .. }
                | Error::ExprInvalid(_)
                | Error::NotImplemented(_)
        )
    }

    /// Check if this error terminates a task
    pub fn is_task_error(&self) -> bool {
        matches!(
            self,
            Error::TaskCancelled | Error::TaskFailed(_) | Error::QueueClosed
        )
    }
}
