// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error-handling state machine applied when logic fails.

use super::dispatch::RunPlan;
use super::EngineCore;
use crate::stats::RuntimeStats;
use crate::task::{Priority, Task, TaskKind};
use std::sync::Arc;
use weft_core::{Clock, ErrorPolicy, JobContext, WorkerState};

impl<C: Clock> EngineCore<C> {
    /// Apply the effective error strategy for a failed invocation.
    ///
    /// Resolution order: routine-level → flow-level → stop. Retry
    /// exhaustion falls through to the flow-level policy unless that is
    /// also `retry`, in which case it stops.
    pub(crate) fn handle_failure(
        &self,
        task: &Task,
        job: &Arc<JobContext>,
        worker: &Arc<WorkerState>,
        plan: &RunPlan,
        error: String,
    ) {
        let routine_id = task.routine_id.as_str();
        let now = self.now_ms();
        let (primary, primary_is_routine) = match (&plan.routine_policy, &plan.flow_policy) {
            (Some(policy), _) => (policy.clone(), true),
            (None, Some(policy)) => (policy.clone(), false),
            (None, None) => (ErrorPolicy::Stop, false),
        };

        match primary {
            ErrorPolicy::Stop => self.fail_job(job, worker, &error),

            ErrorPolicy::Continue => {
                job.trace(
                    routine_id,
                    "continued_after_error",
                    serde_json::json!({ "message": error }),
                    now,
                );
            }

            ErrorPolicy::Skip => {
                job.mark_skipped(task.routine_id.clone());
                job.trace(
                    routine_id,
                    "skipped",
                    serde_json::json!({ "message": error }),
                    now,
                );
            }

            ref retry @ ErrorPolicy::Retry { .. } => {
                let attempt = task.kind.attempt();
                let retries_done = attempt.saturating_sub(1);
                if retry.retries_left(retries_done) > 0 {
                    let delay = retry.retry_delay(retries_done + 1).unwrap_or_default();
                    tracing::debug!(
                        job = %job.job_id(),
                        routine = routine_id,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retry scheduled"
                    );
                    job.trace(
                        routine_id,
                        "retry_scheduled",
                        serde_json::json!({
                            "attempt": attempt + 1,
                            "delay_ms": delay.as_millis() as u64,
                        }),
                        now,
                    );
                    RuntimeStats::bump(&self.stats.retries_scheduled);
                    job.task_enqueued();
                    self.queue.push_delayed(
                        Task {
                            priority: Priority::Low,
                            flow_id: task.flow_id.clone(),
                            routine_id: task.routine_id.clone(),
                            slot_name: task.slot_name.clone(),
                            job_id: task.job_id,
                            worker_id: task.worker_id,
                            kind: TaskKind::Replay {
                                slice: plan.activation.slice.clone(),
                                attempt: attempt + 1,
                            },
                            enqueued_at_ms: now,
                        },
                        delay,
                    );
                } else {
                    // Exhausted: fall through to the next-outer policy.
                    let outer = if primary_is_routine { plan.flow_policy.as_ref() } else { None };
                    match outer {
                        Some(ErrorPolicy::Continue) => {
                            job.trace(
                                routine_id,
                                "continued_after_error",
                                serde_json::json!({ "message": error, "retries": retries_done }),
                                now,
                            );
                        }
                        Some(ErrorPolicy::Skip) => {
                            job.mark_skipped(task.routine_id.clone());
                            job.trace(
                                routine_id,
                                "skipped",
                                serde_json::json!({ "message": error, "retries": retries_done }),
                                now,
                            );
                        }
                        // Stop, absent, or a second retry tier: stop.
                        _ => self.fail_job(job, worker, &error),
                    }
                }
            }
        }
    }
}
