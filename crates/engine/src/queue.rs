// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The shared task queue: priority-ordered, FIFO within a priority, with a
//! side heap for delayed redelivery (retries, paused-job requeues,
//! throttled re-checks).
//!
//! One mutex plus one condvar. Delays are wall-clock `Instant`s: retry
//! backoff is real time regardless of the runtime's logical clock.

use crate::task::{Priority, Task};
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::time::{Duration, Instant};

/// Outcome of a blocking pop.
#[derive(Debug)]
pub enum Pop {
    Task(Task),
    /// Nothing became ready within the timeout.
    Timeout,
    /// Queue closed and fully drained.
    Closed,
}

struct Delayed {
    due: Instant,
    seq: u64,
    task: Task,
}

// Min-heap on (due, seq): BinaryHeap is a max-heap, so order is reversed.
impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Delayed {}

struct Inner {
    ready: [VecDeque<Task>; Priority::COUNT],
    delayed: BinaryHeap<Delayed>,
    closed: bool,
    seq: u64,
}

/// Shared priority queue feeding the worker pool.
pub struct TaskQueue {
    inner: Mutex<Inner>,
    available: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                ready: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
                delayed: BinaryHeap::new(),
                closed: false,
                seq: 0,
            }),
            available: Condvar::new(),
        }
    }

    /// Enqueue for immediate dispatch. Accepted even after close so
    /// draining workers can finish routing; new work should be gated by the
    /// runtime state instead.
    pub fn push(&self, task: Task) {
        let lane = task.priority.lane();
        let mut inner = self.inner.lock();
        inner.ready[lane].push_back(task);
        drop(inner);
        self.available.notify_one();
    }

    /// Enqueue for dispatch no earlier than `delay` from now.
    pub fn push_delayed(&self, task: Task, delay: Duration) {
        let mut inner = self.inner.lock();
        let seq = inner.seq;
        inner.seq += 1;
        inner.delayed.push(Delayed { due: Instant::now() + delay, seq, task });
        drop(inner);
        // Wake a waiter so it can tighten its wait deadline.
        self.available.notify_one();
    }

    /// Blocking pop with a timeout. Returns [`Pop::Closed`] only once the
    /// queue is closed *and* drained (delayed tasks included).
    pub fn pop(&self, timeout: Duration) -> Pop {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            Self::promote_due(&mut inner);

            for lane in &mut inner.ready {
                if let Some(task) = lane.pop_front() {
                    return Pop::Task(task);
                }
            }

            if inner.closed && inner.delayed.is_empty() {
                return Pop::Closed;
            }

            let now = Instant::now();
            if now >= deadline {
                return Pop::Timeout;
            }
            let wait_until = match inner.delayed.peek() {
                Some(next) => deadline.min(next.due),
                None => deadline,
            };
            let _ = self.available.wait_until(&mut inner, wait_until);
        }
    }

    fn promote_due(inner: &mut Inner) {
        let now = Instant::now();
        while inner.delayed.peek().is_some_and(|d| d.due <= now) {
            if let Some(delayed) = inner.delayed.pop() {
                let lane = delayed.task.priority.lane();
                inner.ready[lane].push_back(delayed.task);
            }
        }
    }

    /// Tasks currently queued (ready + delayed).
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.ready.iter().map(VecDeque::len).sum::<usize>() + inner.delayed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ready tasks per priority lane (High, Normal, Low).
    pub fn depths(&self) -> [usize; Priority::COUNT] {
        let inner = self.inner.lock();
        [inner.ready[0].len(), inner.ready[1].len(), inner.ready[2].len()]
    }

    /// Stop dispatch once drained; wakes every blocked worker.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Remove and return everything still queued (forced shutdown).
    pub fn drain(&self) -> Vec<Task> {
        let mut inner = self.inner.lock();
        let mut drained = Vec::new();
        for lane in &mut inner.ready {
            drained.extend(lane.drain(..));
        }
        let delayed = std::mem::take(&mut inner.delayed);
        drained.extend(delayed.into_sorted_vec().into_iter().rev().map(|d| d.task));
        drained
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
