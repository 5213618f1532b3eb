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

//! FilterBits operator
//!
//! Drives the compiled expression tree batch by batch and accounts for the
//! rows processed; the row total must land exactly on the active count
//! frozen at the query timestamp.

use std::sync::Arc;

use crate::core::{Error, Result, RowVector, Timestamp};
use crate::expr::{compile, Expr, TypedExpr};
use crate::storage::config::EvalConfig;
use crate::storage::segment::Segment;

/// Pull-based operator producing one bool vector per batch
#[derive(Debug)]
pub struct FilterBits {
    root: Expr,
    need_process_rows: usize,
    num_processed_rows: usize,
}

impl FilterBits {
    pub fn new(
        segment: &Arc<Segment>,
        plan: &TypedExpr,
        query_timestamp: Timestamp,
        config: &EvalConfig,
    ) -> Result<Self> {
        let root = compile(plan, segment, query_timestamp, config)?;
        Ok(FilterBits {
            root,
            need_process_rows: segment.get_active_count(query_timestamp),
            num_processed_rows: 0,
        })
    }

    /// Whether every active row has been pushed through the tree
    pub fn all_input_processed(&self) -> bool {
        self.num_processed_rows == self.need_process_rows
    }

    /// Rows emitted so far
    pub fn num_processed_rows(&self) -> usize {
        self.num_processed_rows
    }

    /// Produce the next batch, or `None` at end of stream
    pub fn get_output(&mut self) -> Result<Option<RowVector>> {
        if self.all_input_processed() {
            return Ok(None);
        }
        match self.root.eval()? {
            Some(batch) => {
                self.num_processed_rows += batch.len();
                if self.num_processed_rows > self.need_process_rows {
                    return Err(Error::fatal(format!(
                        "processed {} rows of {}",
                        self.num_processed_rows, self.need_process_rows
                    )));
                }
                Ok(Some(RowVector::single(batch)))
            }
            None => Err(Error::fatal(
                "expression drained before the active rows were processed",
            )),
        }
    }
}
