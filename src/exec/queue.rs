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

//! Bounded result queue between a task's producer and its consumer
//!
//! FIFO of boolean `RowVector` batches. Producers park while the queue is
//! at capacity; the consumer parks while it is empty and producers remain.
//! End-of-stream is an explicit sentinel (`enqueue(None)`) that decrements
//! the outstanding-producer count without occupying capacity. `close()` is
//! sticky: blocked producers observe it on wake and fail their enqueue;
//! batches already queued stay drainable.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::core::{Error, Result, RowVector};

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<RowVector>,
    num_producers: Option<usize>,
    producers_finished: usize,
    closed: bool,
}

impl QueueState {
    fn all_producers_finished(&self) -> bool {
        match self.num_producers {
            Some(n) => self.producers_finished >= n,
            None => false,
        }
    }
}

/// Bounded FIFO of filter batches
#[derive(Debug)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    producer_cv: Condvar,
    consumer_cv: Condvar,
    capacity: usize,
}

impl TaskQueue {
    /// Queue with the given soft capacity (at least one slot)
    pub fn new(capacity: usize) -> Self {
        TaskQueue {
            state: Mutex::new(QueueState::default()),
            producer_cv: Condvar::new(),
            consumer_cv: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Register how many producers will signal end-of-stream
    pub fn set_num_producers(&self, n: usize) {
        let mut state = self.state.lock();
        state.num_producers = Some(n);
        drop(state);
        self.consumer_cv.notify_all();
    }

    /// Push one batch, blocking while the queue is full
    ///
    /// `None` is the end-of-stream sentinel: it decrements the outstanding
    /// producer count and never blocks. Returns `QueueClosed` once the
    /// queue is closed.
    pub fn enqueue(&self, batch: Option<RowVector>) -> Result<()> {
        let mut state = self.state.lock();
        match batch {
            None => {
                state.producers_finished += 1;
                drop(state);
                self.consumer_cv.notify_all();
                Ok(())
            }
            Some(batch) => {
                while state.queue.len() >= self.capacity && !state.closed {
                    self.producer_cv.wait(&mut state);
                }
                if state.closed {
                    return Err(Error::QueueClosed);
                }
                state.queue.push_back(batch);
                drop(state);
                self.consumer_cv.notify_one();
                Ok(())
            }
        }
    }

    /// Pop the next batch, blocking while producers may still deliver
    ///
    /// Returns `None` once the queue is drained and either every producer
    /// signalled end-of-stream or the queue was closed.
    pub fn dequeue(&self) -> Option<RowVector> {
        let mut state = self.state.lock();
        loop {
            if let Some(batch) = state.queue.pop_front() {
                drop(state);
                self.producer_cv.notify_one();
                return Some(batch);
            }
            if state.closed || state.all_producers_finished() {
                return None;
            }
            self.consumer_cv.wait(&mut state);
        }
    }

    /// Sticky close; wakes every parked producer and the consumer
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.producer_cv.notify_all();
        self.consumer_cv.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Whether a `dequeue` could still return a batch
    pub fn has_next(&self) -> bool {
        let state = self.state.lock();
        !state.queue.is_empty() || !(state.closed || state.all_producers_finished())
    }
}
