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

//! Task runtime and the filter entry point
//!
//! `execute_filter` drives a task end-to-end: compile, stream batches
//! through the bounded queue, pack them into the bitset, then AND in the
//! timestamp and delete masks. A caller that needs the batch stream itself
//! uses `Task::spawn` plus `TaskCursor` directly.

pub mod operator;
pub mod queue;
pub mod task;

use std::sync::Arc;

use crate::common::Bitset;
use crate::core::{Error, Result, Timestamp};
use crate::expr::TypedExpr;
use crate::storage::config::EvalConfig;
use crate::storage::segment::Segment;

pub use operator::FilterBits;
pub use queue::TaskQueue;
pub use task::{CancelHandle, Task, TaskCursor, TaskState};

/// Evaluate a filter plan over a segment snapshot
///
/// Returns a packed bitset of length `active_count(ts)`; a set bit marks a
/// matching, visible row. A zero cardinality lets the caller skip vector
/// search entirely.
pub fn execute_filter(
    segment: &Arc<Segment>,
    plan: &TypedExpr,
    query_timestamp: Timestamp,
    config: &EvalConfig,
    cancel: Option<CancelHandle>,
) -> Result<Bitset> {
    let active = segment.get_active_count(query_timestamp);
    let task = Task::spawn(
        segment.clone(),
        plan.clone(),
        query_timestamp,
        config,
        cancel,
    );
    let mut cursor = TaskCursor::new(task);

    let mut bitset = Bitset::with_capacity(active);
    while cursor.move_next()? {
        let batch = cursor
            .current()
            .ok_or_else(|| Error::fatal("cursor advanced without a batch"))?;
        bitset.append_bools(batch.filter_bits().as_slice());
    }

    if bitset.len() != active {
        if cursor.task().state() == TaskState::Cancelled {
            return Err(Error::TaskCancelled);
        }
        return Err(Error::fatal(format!(
            "filter produced {} of {} rows",
            bitset.len(),
            active
        )));
    }

    segment.mask_with_timestamps(&mut bitset, query_timestamp);
    segment.mask_with_delete(&mut bitset, active, query_timestamp);
    Ok(bitset)
}
