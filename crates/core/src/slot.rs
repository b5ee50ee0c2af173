// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded FIFO input buffer on a routine.
//!
//! Records are tagged `new` on enqueue and flipped to `consumed` by the
//! consume operations. The consumed prefix is kept as short history and
//! dropped once it crosses the watermark fraction of capacity.

use crate::error::CoreError;
use crate::payload::Payload;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::VecDeque;

/// Recommended default capacity for a slot queue.
pub const DEFAULT_MAX_QUEUE_LENGTH: usize = 1000;

/// Default watermark fraction for compaction of consumed history.
pub const DEFAULT_WATERMARK: f64 = 0.8;

/// One queued payload with its provenance tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    pub payload: Payload,
    /// Routine id the payload was emitted from ("" for external posts).
    pub emitted_from: SmolStr,
    pub emitted_at_ms: u64,
    pub consumed: bool,
}

/// Point-in-time counters for a slot queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    pub name: SmolStr,
    pub unconsumed: usize,
    pub total: usize,
    pub capacity: usize,
}

/// A named, bounded FIFO input buffer. Thread-safe; one lock per slot.
#[derive(Debug)]
pub struct Slot {
    name: SmolStr,
    /// Owning routine id, set when the routine joins a flow. Used to tag
    /// capacity errors with their origin.
    owner: SmolStr,
    max_queue_length: usize,
    watermark: f64,
    queue: Mutex<VecDeque<SlotRecord>>,
}

impl Slot {
    /// Create a slot with default capacity and watermark.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self::with_limits(name, DEFAULT_MAX_QUEUE_LENGTH, DEFAULT_WATERMARK)
    }

    /// Create a slot with explicit capacity and watermark.
    ///
    /// `watermark` is clamped into `(0, 1]`; `max_queue_length` must be ≥ 1.
    pub fn with_limits(name: impl Into<SmolStr>, max_queue_length: usize, watermark: f64) -> Self {
        Self {
            name: name.into(),
            owner: SmolStr::default(),
            max_queue_length: max_queue_length.max(1),
            watermark: if watermark > 0.0 { watermark.min(1.0) } else { DEFAULT_WATERMARK },
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn max_queue_length(&self) -> usize {
        self.max_queue_length
    }

    pub fn watermark(&self) -> f64 {
        self.watermark
    }

    pub(crate) fn set_owner(&mut self, owner: SmolStr) {
        self.owner = owner;
    }

    /// Append a payload tagged `new`.
    ///
    /// Fails with `queue_full` when the unconsumed count is already at
    /// capacity; consumed history does not count against the bound.
    pub fn enqueue(
        &self,
        payload: Payload,
        emitted_from: impl Into<SmolStr>,
        emitted_at_ms: u64,
    ) -> Result<(), CoreError> {
        let mut queue = self.queue.lock();
        let unconsumed = queue.iter().filter(|r| !r.consumed).count();
        if unconsumed >= self.max_queue_length {
            return Err(CoreError::QueueFull {
                routine: self.owner.clone(),
                slot: self.name.clone(),
                capacity: self.max_queue_length,
            });
        }
        queue.push_back(SlotRecord {
            payload,
            emitted_from: emitted_from.into(),
            emitted_at_ms,
            consumed: false,
        });
        Self::compact(&mut queue, self.max_queue_length, self.watermark);
        Ok(())
    }

    /// Read all `new` payloads, oldest first, without consuming.
    pub fn peek_new_all(&self) -> Vec<Payload> {
        let queue = self.queue.lock();
        queue.iter().filter(|r| !r.consumed).map(|r| r.payload.clone()).collect()
    }

    /// Read the oldest `new` payload without consuming.
    pub fn peek_new_one(&self) -> Option<Payload> {
        let queue = self.queue.lock();
        queue.iter().find(|r| !r.consumed).map(|r| r.payload.clone())
    }

    /// Read the newest `new` payload without consuming.
    pub fn peek_latest(&self) -> Option<Payload> {
        let queue = self.queue.lock();
        queue.iter().rev().find(|r| !r.consumed).map(|r| r.payload.clone())
    }

    /// Consume all `new` payloads, oldest first.
    pub fn consume_new_all(&self) -> Vec<Payload> {
        let mut queue = self.queue.lock();
        let mut out = Vec::new();
        for record in queue.iter_mut() {
            if !record.consumed {
                record.consumed = true;
                out.push(record.payload.clone());
            }
        }
        Self::compact(&mut queue, self.max_queue_length, self.watermark);
        out
    }

    /// Consume the oldest `new` payload.
    pub fn consume_one_new(&self) -> Option<Payload> {
        let mut queue = self.queue.lock();
        let payload = queue.iter_mut().find(|r| !r.consumed).map(|record| {
            record.consumed = true;
            record.payload.clone()
        });
        Self::compact(&mut queue, self.max_queue_length, self.watermark);
        payload
    }

    /// Consume the newest `new` payload and mark every older `new` record
    /// consumed without returning it.
    pub fn consume_latest_and_mark_rest(&self) -> Option<Payload> {
        let mut queue = self.queue.lock();
        let mut latest = None;
        for record in queue.iter_mut().rev() {
            if !record.consumed {
                record.consumed = true;
                if latest.is_none() {
                    latest = Some(record.payload.clone());
                }
            }
        }
        Self::compact(&mut queue, self.max_queue_length, self.watermark);
        latest
    }

    /// Count of `new` records.
    pub fn unconsumed_count(&self) -> usize {
        self.queue.lock().iter().filter(|r| !r.consumed).count()
    }

    /// Count of all records currently held, consumed history included.
    pub fn total_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Snapshot of the queue counters.
    pub fn queue_state(&self) -> QueueState {
        let queue = self.queue.lock();
        QueueState {
            name: self.name.clone(),
            unconsumed: queue.iter().filter(|r| !r.consumed).count(),
            total: queue.len(),
            capacity: self.max_queue_length,
        }
    }

    /// Drop the consumed prefix once it exceeds `watermark` of capacity.
    fn compact(queue: &mut VecDeque<SlotRecord>, capacity: usize, watermark: f64) {
        let prefix = queue.iter().take_while(|r| r.consumed).count();
        if prefix > 0 && (prefix as f64 / capacity as f64) > watermark {
            queue.drain(..prefix);
        }
    }
}

#[cfg(test)]
#[path = "slot_tests.rs"]
mod tests;
