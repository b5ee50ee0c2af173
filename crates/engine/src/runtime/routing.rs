// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event routing: emits fan out across connections into target slots, each
//! delivery producing an activation task.

use super::EngineCore;
use crate::stats::RuntimeStats;
use crate::task::{Priority, Task, TaskKind};
use weft_core::{
    Clock, Connection, CoreError, EnqueueDecision, EventRouter, ExecutionScope, Flow, JobContext,
    Payload,
};

impl<C: Clock> EngineCore<C> {
    /// Run the before-enqueue hook, push the payload into the target slot,
    /// and queue an activation task.
    ///
    /// Returns false when the hook vetoed the delivery. `queue_full`
    /// propagates to the caller (the emitter, or `post`).
    pub(crate) fn enqueue_and_activate(
        &self,
        flow: &Flow,
        job: &std::sync::Arc<JobContext>,
        target_routine: &str,
        target_slot: &str,
        payload: Payload,
        emitted_from: &str,
    ) -> Result<bool, CoreError> {
        let now = self.now_ms();
        let job_ctx: &JobContext = job;
        match self.hooks().on_slot_before_enqueue(
            target_slot,
            target_routine,
            Some(job_ctx),
            &payload,
            flow.flow_id(),
        ) {
            EnqueueDecision::Allow => {}
            EnqueueDecision::Skip { reason } => {
                tracing::warn!(
                    flow = flow.flow_id(),
                    routine = target_routine,
                    slot = target_slot,
                    reason = %reason,
                    "enqueue skipped by hook"
                );
                RuntimeStats::bump(&self.stats.enqueues_skipped);
                job.trace(
                    target_routine,
                    "enqueue_skipped",
                    serde_json::json!({ "slot": target_slot, "reason": reason }),
                    now,
                );
                return Ok(false);
            }
        }

        let routine = flow
            .get_routine(target_routine)
            .ok_or_else(|| CoreError::RoutineNotFound(target_routine.to_string()))?;
        let slot = routine.slot(target_slot).ok_or_else(|| CoreError::SlotNotFound {
            routine: target_routine.into(),
            slot: target_slot.into(),
        })?;
        slot.enqueue(payload, emitted_from, now)?;

        job.task_enqueued();
        self.queue.push(Task {
            priority: Priority::Normal,
            flow_id: flow.flow_id().to_string(),
            routine_id: target_routine.into(),
            slot_name: target_slot.into(),
            job_id: job.job_id(),
            worker_id: job.worker_id(),
            kind: TaskKind::Activate,
            enqueued_at_ms: now,
        });
        Ok(true)
    }
}

impl<C: Clock> EventRouter for EngineCore<C> {
    fn route_emit(
        &self,
        scope: &ExecutionScope,
        event: &str,
        payload: Payload,
    ) -> Result<(), CoreError> {
        let job = &scope.job;
        let job_ctx: &JobContext = job;
        let source = scope.routine_id.as_str();
        let now = self.now_ms();

        // Emits of a cancelled (or otherwise finished) job are suppressed.
        if job.is_terminal() {
            tracing::debug!(job = %job.job_id(), event, "emit suppressed: job terminal");
            return Ok(());
        }
        // Skip strategy: this routine's downstream is cut for this job.
        if job.is_skipped(source) {
            job.trace(source, "emit_suppressed", serde_json::json!({ "event": event }), now);
            return Ok(());
        }

        if !self.hooks().on_event_emit(event, source, &scope.worker, Some(job_ctx), &payload) {
            job.trace(source, "emit_suppressed", serde_json::json!({ "event": event }), now);
            return Ok(());
        }

        let flow_arc = self
            .flows
            .get(job.flow_id())
            .ok_or_else(|| CoreError::FlowNotFound(job.flow_id().to_string()))?;
        let flow = flow_arc.read();

        if !flow.get_routine(source).is_some_and(|r| r.has_event(event)) {
            tracing::debug!(routine = source, event, "emit of undeclared event");
        }

        RuntimeStats::bump(&self.stats.emits_routed);
        job.trace(source, "emitted", serde_json::json!({ "event": event }), now);

        let connections: Vec<Connection> = flow.connections_from(source, event).cloned().collect();
        for connection in connections {
            let projected = connection.project(&payload)?;
            self.enqueue_and_activate(
                &flow,
                job,
                &connection.target_routine,
                &connection.target_slot,
                projected,
                source,
            )?;
        }
        Ok(())
    }
}
