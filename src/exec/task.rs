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

//! Filter task: one running evaluation bound to a plan and a segment
//!
//! The producer runs on the rayon pool, evaluating one batch per step and
//! enqueuing it; cancellation is cooperative and observed between batches.
//! `Created → Running → (Done | Cancelled | Failed)`. A failed task stores
//! its error and closes the queue; the cursor re-raises the error at drain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{Error, Result, Timestamp};
use crate::expr::TypedExpr;
use crate::storage::config::EvalConfig;
use crate::storage::segment::Segment;

use super::operator::FilterBits;
use super::queue::TaskQueue;

/// Task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Done,
    Cancelled,
    Failed,
}

/// Shared cancellation flag, polled at batch boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A running filter evaluation and its bounded result queue
#[derive(Debug)]
pub struct Task {
    state: Mutex<TaskState>,
    error: Mutex<Option<Error>>,
    cancel: CancelHandle,
    queue: Arc<TaskQueue>,
}

impl Task {
    /// Start a filter task; the producer is scheduled onto the rayon pool
    pub fn spawn(
        segment: Arc<Segment>,
        plan: TypedExpr,
        query_timestamp: Timestamp,
        config: &EvalConfig,
        cancel: Option<CancelHandle>,
    ) -> Arc<Task> {
        let queue = Arc::new(TaskQueue::new(config.task_queue_capacity));
        queue.set_num_producers(1);
        let task = Arc::new(Task {
            state: Mutex::new(TaskState::Created),
            error: Mutex::new(None),
            cancel: cancel.unwrap_or_default(),
            queue,
        });
        let producer = Arc::clone(&task);
        let config = config.clone();
        rayon::spawn(move || producer.run_producer(segment, plan, query_timestamp, config));
        task
    }

    fn run_producer(
        self: Arc<Self>,
        segment: Arc<Segment>,
        plan: TypedExpr,
        query_timestamp: Timestamp,
        config: EvalConfig,
    ) {
        *self.state.lock() = TaskState::Running;
        let mut operator = match FilterBits::new(&segment, &plan, query_timestamp, &config) {
            Ok(operator) => operator,
            Err(err) => {
                self.fail(err);
                return;
            }
        };
        loop {
            if self.cancel.is_cancelled() {
                self.finish(TaskState::Cancelled);
                return;
            }
            match operator.get_output() {
                Ok(Some(batch)) => {
                    if self.queue.enqueue(Some(batch)).is_err() {
                        // consumer went away; nothing left to deliver to
                        self.finish(TaskState::Cancelled);
                        return;
                    }
                }
                Ok(None) => {
                    *self.state.lock() = TaskState::Done;
                    let _ = self.queue.enqueue(None);
                    return;
                }
                Err(err) => {
                    self.fail(err);
                    return;
                }
            }
        }
    }

    fn fail(&self, err: Error) {
        *self.error.lock() = Some(err);
        *self.state.lock() = TaskState::Failed;
        self.queue.close();
    }

    fn finish(&self, state: TaskState) {
        *self.state.lock() = state;
        self.queue.close();
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock()
    }

    /// The stored failure, if the task failed
    pub fn error(&self) -> Option<Error> {
        self.error.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state(),
            TaskState::Done | TaskState::Cancelled | TaskState::Failed
        )
    }

    /// Ask the producer to stop at its next batch boundary
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }
}

/// Consumer-side cursor over a task's result stream
///
/// `move_next` pulls the next boolean batch; the task's stored error is
/// re-raised once the stream drains. Dropping the cursor before the drain
/// requests cancellation of the task.
#[derive(Debug)]
pub struct TaskCursor {
    task: Arc<Task>,
    current: Option<crate::core::RowVector>,
    at_end: bool,
}

impl TaskCursor {
    pub fn new(task: Arc<Task>) -> Self {
        TaskCursor {
            task,
            current: None,
            at_end: false,
        }
    }

    /// Advance to the next batch; false at end of stream
    pub fn move_next(&mut self) -> Result<bool> {
        if self.at_end {
            return Ok(false);
        }
        match self.task.queue().dequeue() {
            Some(batch) => {
                self.current = Some(batch);
                Ok(true)
            }
            None => {
                self.at_end = true;
                self.current = None;
                if let Some(err) = self.task.error() {
                    return Err(err);
                }
                Ok(false)
            }
        }
    }

    /// The batch `move_next` last returned
    pub fn current(&self) -> Option<&crate::core::RowVector> {
        self.current.as_ref()
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }
}

impl Drop for TaskCursor {
    fn drop(&mut self) {
        if !self.at_end {
            self.task.request_cancel();
            self.task.queue().close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CompareOp, DataType, FieldId, ScalarValue, MAX_TIMESTAMP};
    use crate::expr::ColumnInfo;
    use crate::storage::column::ColumnBatch;
    use crate::storage::segment::Schema;
    use rustc_hash::FxHashMap;
    use std::time::Duration;

    fn segment(n: i64) -> Arc<Segment> {
        let schema = Schema::new().add_field(FieldId(1), "x", DataType::Int64);
        let segment = Segment::growing(schema, 64).unwrap();
        let mut batches = FxHashMap::default();
        batches.insert(FieldId(1), ColumnBatch::Int64((0..n).collect()));
        let timestamps: Vec<u64> = (1..=n as u64).collect();
        segment.insert(&timestamps, &batches).unwrap();
        segment
    }

    fn lt_plan(v: i64) -> TypedExpr {
        TypedExpr::unary_range(
            ColumnInfo::new(FieldId(1), DataType::Int64),
            CompareOp::Lt,
            ScalarValue::Int64(v),
        )
    }

    #[test]
    fn test_task_runs_to_done() {
        let segment = segment(100);
        let config = EvalConfig::new().with_batch_size(16);
        let task = Task::spawn(segment, lt_plan(10), MAX_TIMESTAMP, &config, None);

        let mut cursor = TaskCursor::new(Arc::clone(&task));
        let mut rows = 0;
        let mut hits = 0;
        while cursor.move_next().unwrap() {
            let batch = cursor.current().unwrap();
            rows += batch.len();
            hits += batch.filter_bits().count_true();
        }
        assert_eq!(rows, 100);
        assert_eq!(hits, 10);
        assert_eq!(task.state(), TaskState::Done);
    }

    #[test]
    fn test_failed_task_surfaces_error_at_drain() {
        let segment = segment(10);
        // declared type mismatches the stored column
        let plan = TypedExpr::unary_range(
            ColumnInfo::new(FieldId(1), DataType::Int32),
            CompareOp::Lt,
            ScalarValue::Int64(5),
        );
        let task = Task::spawn(segment, plan, MAX_TIMESTAMP, &EvalConfig::new(), None);
        let mut cursor = TaskCursor::new(Arc::clone(&task));

        let mut result = Ok(true);
        while let Ok(true) = result {
            result = cursor.move_next();
        }
        assert!(matches!(result, Err(Error::ExprInvalid(_))));
        assert_eq!(task.state(), TaskState::Failed);
    }

    #[test]
    fn test_cancellation_observed_at_batch_boundary() {
        let segment = segment(10_000);
        // tiny queue and batches keep the producer parked mid-stream
        let config = EvalConfig::new().with_batch_size(64).with_queue_capacity(1);
        let cancel = CancelHandle::new();
        let task = Task::spawn(
            segment,
            lt_plan(100),
            MAX_TIMESTAMP,
            &config,
            Some(cancel.clone()),
        );

        let mut cursor = TaskCursor::new(Arc::clone(&task));
        assert!(cursor.move_next().unwrap());
        cancel.cancel();

        // drain whatever was already queued; the stream then ends
        while cursor.move_next().unwrap() {}
        for _ in 0..200 {
            if task.is_finished() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(task.state(), TaskState::Cancelled);
    }

    #[test]
    fn test_dropping_cursor_cancels_task() {
        let segment = segment(10_000);
        let config = EvalConfig::new().with_batch_size(64).with_queue_capacity(1);
        let task = Task::spawn(segment, lt_plan(100), MAX_TIMESTAMP, &config, None);

        {
            let mut cursor = TaskCursor::new(Arc::clone(&task));
            assert!(cursor.move_next().unwrap());
        }

        for _ in 0..200 {
            if task.is_finished() {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(
            task.state(),
            TaskState::Cancelled | TaskState::Done
        ));
    }
}
