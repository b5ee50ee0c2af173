// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker dispatch loop: dequeue, activate, run logic.

use super::{EngineCore, PAUSE_REDELIVERY, POP_TIMEOUT};
use crate::queue::Pop;
use crate::stats::RuntimeStats;
use crate::task::{Priority, Task, TaskKind};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use weft_core::policy::LAST_FIRED_KEY;
use weft_core::{
    enter_scope, Activation, Clock, ErrorPolicy, EventRouter, ExecutionScope, JobContext,
    JobStatus, Logic, LogicArgs, PolicyInput, RoutineOutcome, WorkerState, WorkerStatus,
};

/// What a fired activation needs once the flow lock is released.
pub(crate) struct RunPlan {
    pub(crate) logic: Option<Arc<dyn Logic>>,
    pub(crate) routine_policy: Option<ErrorPolicy>,
    pub(crate) flow_policy: Option<ErrorPolicy>,
    pub(crate) activation: Activation,
}

/// Body of each pool thread.
pub(crate) fn worker_loop<C: Clock>(core: Arc<EngineCore<C>>) {
    loop {
        match core.queue.pop(POP_TIMEOUT) {
            Pop::Closed => break,
            Pop::Timeout => continue,
            Pop::Task(task) => {
                // User panics are caught around the logic call itself; this
                // outer catch keeps the dispatch loop alive if bookkeeping
                // ever panics.
                let outcome = catch_unwind(AssertUnwindSafe(|| process_task(&core, task)));
                if outcome.is_err() {
                    tracing::error!("task dispatch panicked; worker thread continues");
                }
            }
        }
    }
}

fn process_task<C: Clock>(core: &Arc<EngineCore<C>>, task: Task) {
    let Some(job) = core.get_job(task.job_id) else {
        tracing::warn!(job = %task.job_id, "dropping task for unknown job");
        return;
    };
    let Some(worker) = core.workers.get(task.worker_id) else {
        // Worker torn down while the task was queued.
        core.finish_task(&job);
        return;
    };

    if job.is_terminal() {
        tracing::debug!(job = %job.job_id(), status = %job.status(), "dropping task for finished job");
        core.finish_task(&job);
        return;
    }
    if job.status() == JobStatus::Paused || worker.status() == WorkerStatus::Paused {
        core.queue.push_delayed(task, PAUSE_REDELIVERY);
        return;
    }

    if job.mark_running() {
        core.hooks().on_job_start(&job, &worker);
    }

    let Some(plan) = prepare_activation(core, &task, &job, &worker) else {
        return;
    };
    run_logic(core, &task, &job, &worker, plan);
    core.finish_task(&job);
}

/// Resolve the routine, replay retried data if any, and evaluate the
/// activation policy under the routine's latch.
///
/// Returns `None` when the task is finished here (held, re-queued, or
/// failed); the flow lock is released before logic runs.
fn prepare_activation<C: Clock>(
    core: &EngineCore<C>,
    task: &Task,
    job: &Arc<JobContext>,
    worker: &Arc<WorkerState>,
) -> Option<RunPlan> {
    let Some(flow_arc) = core.flows.get(&task.flow_id) else {
        core.fail_job(job, worker, &format!("flow '{}' unregistered mid-job", task.flow_id));
        core.finish_task(job);
        return None;
    };
    let flow = flow_arc.read();
    let Some(routine) = flow.get_routine(&task.routine_id) else {
        core.fail_job(job, worker, &format!("routine '{}' missing", task.routine_id));
        core.finish_task(job);
        return None;
    };

    if let TaskKind::Replay { slice, attempt } = &task.kind {
        tracing::debug!(job = %job.job_id(), routine = %task.routine_id, attempt = *attempt, "replaying slice");
        let now = core.now_ms();
        for (slot_name, payloads) in slice {
            let Some(slot) = routine.slot(slot_name) else { continue };
            for payload in payloads {
                if let Err(err) = slot.enqueue(payload.clone(), task.routine_id.clone(), now) {
                    core.fail_job(job, worker, &err.to_string());
                    core.finish_task(job);
                    return None;
                }
            }
        }
    }

    let Some(policy) = routine.activation_policy() else {
        // Validation guarantees a policy; hold defensively if absent.
        core.finish_task(job);
        return None;
    };

    let latch = core.latch(&task.flow_id, &task.routine_id);
    let activation = {
        let _serialized = latch.lock();
        let input = PolicyInput {
            routine_id: &task.routine_id,
            slots: routine.slots(),
            worker,
            now_ms: core.now_ms(),
        };
        match policy.evaluate(&input) {
            Ok(activation) => activation,
            Err(err) => {
                core.fail_job(job, worker, &err.to_string());
                core.finish_task(job);
                return None;
            }
        }
    };

    if !activation.fired {
        match activation.recheck_after {
            Some(delay) => {
                // Throttled with data pending: keep the task alive.
                let mut recheck = task.clone();
                recheck.priority = Priority::Low;
                core.queue.push_delayed(recheck, delay);
            }
            None => core.finish_task(job),
        }
        return None;
    }

    worker.set_routine_state_key(
        task.routine_id.clone(),
        LAST_FIRED_KEY,
        serde_json::json!(core.now_ms()),
    );

    Some(RunPlan {
        logic: routine.logic(),
        routine_policy: routine.error_policy().cloned(),
        flow_policy: flow.error_policy().cloned(),
        activation,
    })
}

/// Run the routine's logic with the execution scope installed.
fn run_logic<C: Clock>(
    core: &Arc<EngineCore<C>>,
    task: &Task,
    job: &Arc<JobContext>,
    worker: &Arc<WorkerState>,
    plan: RunPlan,
) {
    let hooks = core.hooks();
    let routine_id = task.routine_id.as_str();
    let job_ctx: &JobContext = job;
    let worker_state: &WorkerState = worker;
    let now = core.now_ms();

    if !hooks.on_routine_start(routine_id, worker_state, Some(job_ctx)) {
        job.trace(routine_id, "logic_skipped", serde_json::Value::Null, now);
        hooks.on_routine_end(routine_id, worker_state, Some(job_ctx), RoutineOutcome::Ok, None);
        return;
    }

    let consumed: Vec<&str> = plan.activation.slice.keys().map(|k| k.as_str()).collect();
    job.trace(routine_id, "fired", serde_json::json!({ "slots": consumed }), now);
    RuntimeStats::bump(&core.stats.tasks_executed);

    let result: Result<(), String> = match &plan.logic {
        None => Ok(()),
        Some(logic) => {
            let scope = ExecutionScope {
                job: Arc::clone(job),
                worker: Arc::clone(worker),
                routine_id: task.routine_id.clone(),
                router: Arc::clone(core) as Arc<dyn EventRouter>,
            };
            let scope_guard = enter_scope(scope);
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                let mut args = LogicArgs {
                    routine_id,
                    slice: &plan.activation.slice,
                    message: plan.activation.message.as_deref(),
                    worker: worker_state,
                };
                logic.call(&mut args)
            }));
            drop(scope_guard);
            match outcome {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(err.message().to_string()),
                Err(panic) => Err(format!("panic: {}", panic_text(panic.as_ref()))),
            }
        }
    };

    match result {
        Ok(()) => {
            if job.is_cancelled() {
                // No ok-end may fire after cancellation.
                hooks.on_routine_end(
                    routine_id,
                    worker_state,
                    Some(job_ctx),
                    RoutineOutcome::Failed,
                    Some("job cancelled"),
                );
            } else {
                hooks.on_routine_end(
                    routine_id,
                    worker_state,
                    Some(job_ctx),
                    RoutineOutcome::Ok,
                    None,
                );
            }
        }
        Err(error) => {
            tracing::error!(job = %job.job_id(), routine = routine_id, error = %error, "logic failed");
            hooks.on_routine_end(
                routine_id,
                worker_state,
                Some(job_ctx),
                RoutineOutcome::Failed,
                Some(&error),
            );
            job.trace(routine_id, "error", serde_json::json!({ "message": error }), now);
            core.handle_failure(task, job, worker, &plan, error);
        }
    }
}

fn panic_text(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
