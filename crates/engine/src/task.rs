// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler-internal task records.

use smol_str::SmolStr;
use weft_core::{DataSlice, JobId, WorkerId};

/// Dispatch priority. The queue serves High before Normal before Low and
/// is FIFO within a priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Control work (reserved for host-driven interventions).
    High,
    /// Data-driven activation checks.
    Normal,
    /// Retries and deferred re-checks.
    Low,
}

impl Priority {
    /// Number of priority lanes.
    pub const COUNT: usize = 3;

    pub(crate) fn lane(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

weft_core::simple_display! {
    Priority {
        High => "high",
        Normal => "normal",
        Low => "low",
    }
}

/// What a dequeued task does.
#[derive(Debug, Clone)]
pub enum TaskKind {
    /// Check the routine's activation policy; the triggering payload is
    /// already in the slot.
    Activate,
    /// Replay a consumed data slice into the routine's slots, then check
    /// activation. `attempt` is 1-based (1 = initial execution).
    Replay { slice: DataSlice, attempt: u32 },
}

impl TaskKind {
    pub fn attempt(&self) -> u32 {
        match self {
            TaskKind::Activate => 1,
            TaskKind::Replay { attempt, .. } => *attempt,
        }
    }
}

/// "Check routine R of flow F under job J, triggered via slot S."
#[derive(Debug, Clone)]
pub struct Task {
    pub priority: Priority,
    pub flow_id: String,
    pub routine_id: SmolStr,
    /// Slot that triggered this task (provenance for traces; the activation
    /// policy looks at every slot).
    pub slot_name: SmolStr,
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub kind: TaskKind,
    pub enqueued_at_ms: u64,
}

weft_core::builder! {
    pub struct TaskBuilder => Task {
        into {
            flow_id: String = "flow-test",
            routine_id: SmolStr = "r1",
            slot_name: SmolStr = "in",
        }
        set {
            priority: Priority = Priority::Normal,
            kind: TaskKind = TaskKind::Activate,
            enqueued_at_ms: u64 = 0,
        }
        computed {
            job_id: JobId = JobId::new(),
            worker_id: WorkerId = WorkerId::new(),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
