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

//! Filter evaluation configuration
//!

/// Configuration for filter evaluation
///
/// Mirrors the `expression.*` configuration keys:
/// - `expression.eval_batch_size`
/// - `expression.eval_simplified`
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Maximum rows per produced vector
    /// Default: 10000
    pub eval_batch_size: usize,

    /// Permit evaluator simplification passes (n-ary AND/OR flattening)
    /// Default: false
    pub eval_simplified: bool,

    /// Soft capacity of a task's result queue
    /// Default: 8
    pub task_queue_capacity: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            eval_batch_size: 10_000,
            eval_simplified: false,
            task_queue_capacity: 8,
        }
    }
}

impl EvalConfig {
    /// Creates a new EvalConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the batch size
    pub fn with_batch_size(mut self, rows: usize) -> Self {
        self.eval_batch_size = rows;
        self
    }

    /// Builder method to enable simplification passes
    pub fn with_simplified(mut self, enabled: bool) -> Self {
        self.eval_simplified = enabled;
        self
    }

    /// Builder method to set the queue capacity
    pub fn with_queue_capacity(mut self, depth: usize) -> Self {
        self.task_queue_capacity = depth;
        self
    }
}
