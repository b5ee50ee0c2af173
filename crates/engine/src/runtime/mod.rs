// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runtime: worker pool, task queue, event routing, job lifecycle.

mod dispatch;
mod failure;
mod routing;

use crate::error::RuntimeError;
use crate::queue::TaskQueue;
use crate::registry::{FlowRegistry, WorkerRegistry};
use crate::stats::{RuntimeStats, StatsSnapshot};
use crate::task::Priority;
use parking_lot::{Condvar, Mutex, RwLock};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use weft_core::{
    current_hooks, Clock, CoreError, ExecutionHooks, JobContext, JobId, JobStatus, Payload,
    SystemClock, WorkerState, WorkerStatus,
};

/// How long a worker blocks on the queue before re-checking runtime state.
const POP_TIMEOUT: Duration = Duration::from_millis(50);

/// Redelivery delay for tasks of a paused job/worker.
const PAUSE_REDELIVERY: Duration = Duration::from_millis(25);

/// Cap on the graceful-drain phase of `shutdown(wait = true)`.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Grace period for worker threads to exit on forced shutdown.
const JOIN_GRACE: Duration = Duration::from_secs(2);

const STATE_RUNNING: u8 = 0;
const STATE_DRAINING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Runtime sizing knobs.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Worker threads in the pool. Defaults to the host's parallelism.
    pub thread_pool_size: usize,
    /// Bound on the task queue; `post()` is refused beyond it.
    pub max_queue_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            max_queue_size: 10_000,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    weft_core::setters! {
        set {
            thread_pool_size: usize,
            max_queue_size: usize,
        }
    }
}

/// Explicit runtime dependencies. Defaults give a private flow registry and
/// the process-wide hooks.
pub struct RuntimeDeps {
    pub flows: Arc<FlowRegistry>,
    /// Fixed hook impl; `None` reads the process-wide registration per call.
    pub hooks: Option<Arc<dyn ExecutionHooks>>,
}

impl Default for RuntimeDeps {
    fn default() -> Self {
        Self { flows: Arc::new(FlowRegistry::new()), hooks: None }
    }
}

pub(crate) struct EngineCore<C: Clock> {
    pub(crate) max_queue_size: usize,
    pub(crate) clock: C,
    pub(crate) flows: Arc<FlowRegistry>,
    pub(crate) workers: Arc<WorkerRegistry>,
    pub(crate) queue: TaskQueue,
    pub(crate) jobs: RwLock<HashMap<JobId, Arc<JobContext>>>,
    pub(crate) stats: RuntimeStats,
    hooks_override: Option<Arc<dyn ExecutionHooks>>,
    state: AtomicU8,
    /// Serializes worker creation per flow.
    exec_lock: Mutex<()>,
    /// Serializes activation-policy evaluation per routine.
    latches: Mutex<HashMap<(String, SmolStr), Arc<Mutex<()>>>>,
    completion: Mutex<()>,
    completion_signal: Condvar,
}

impl<C: Clock> EngineCore<C> {
    pub(crate) fn hooks(&self) -> Arc<dyn ExecutionHooks> {
        self.hooks_override.clone().unwrap_or_else(current_hooks)
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }

    pub(crate) fn state(&self) -> u8 {
        self.state.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: u8) {
        self.state.store(state, Ordering::SeqCst);
    }

    pub(crate) fn is_accepting(&self) -> bool {
        self.state() == STATE_RUNNING
    }

    pub(crate) fn get_job(&self, job_id: JobId) -> Option<Arc<JobContext>> {
        self.jobs.read().get(&job_id).cloned()
    }

    pub(crate) fn jobs_snapshot(&self) -> Vec<Arc<JobContext>> {
        self.jobs.read().values().cloned().collect()
    }

    pub(crate) fn latch(&self, flow_id: &str, routine_id: &SmolStr) -> Arc<Mutex<()>> {
        let mut latches = self.latches.lock();
        latches
            .entry((flow_id.to_string(), routine_id.clone()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub(crate) fn signal_completion(&self) {
        let _guard = self.completion.lock();
        self.completion_signal.notify_all();
    }

    fn all_jobs_terminal(&self) -> bool {
        self.jobs.read().values().all(|job| job.is_terminal())
    }

    pub(crate) fn wait_all_jobs(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.completion.lock();
        loop {
            if self.all_jobs_terminal() {
                return true;
            }
            if self.completion_signal.wait_until(&mut guard, deadline).timed_out() {
                return self.all_jobs_terminal();
            }
        }
    }

    /// Fail a job (stop semantics). Remaining tasks are dropped at dequeue.
    pub(crate) fn fail_job(&self, job: &Arc<JobContext>, worker: &WorkerState, error: &str) {
        if job.complete(JobStatus::Failed, Some(error.to_string()), self.now_ms()) {
            tracing::info!(job = %job.job_id(), error = %error, "job failed");
            RuntimeStats::bump(&self.stats.jobs_failed);
            self.hooks().on_job_end(job, worker, JobStatus::Failed, Some(error));
            self.signal_completion();
        }
    }

    /// Bookkeeping after a task leaves the system. Completes the job when
    /// its last live task drains.
    pub(crate) fn finish_task(&self, job: &Arc<JobContext>) {
        if job.task_finished() == 0 {
            if !job.is_terminal()
                && job.status() != JobStatus::Paused
                && job.complete(JobStatus::Completed, None, self.now_ms())
            {
                tracing::info!(job = %job.job_id(), "job completed");
                RuntimeStats::bump(&self.stats.jobs_completed);
                if let Some(worker) = self.workers.get(job.worker_id()) {
                    self.hooks().on_job_end(job, &worker, JobStatus::Completed, None);
                }
            }
            self.signal_completion();
        }
    }
}

/// The scheduler facade handed to hosts.
pub struct Runtime<C: Clock = SystemClock> {
    core: Arc<EngineCore<C>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Runtime<SystemClock> {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_deps(config, RuntimeDeps::default(), SystemClock)
    }
}

impl<C: Clock> Runtime<C> {
    /// Build a runtime with explicit dependencies and clock, and start the
    /// worker pool.
    pub fn with_deps(config: RuntimeConfig, deps: RuntimeDeps, clock: C) -> Self {
        let core = Arc::new(EngineCore {
            max_queue_size: config.max_queue_size.max(1),
            clock,
            flows: deps.flows,
            workers: Arc::new(WorkerRegistry::new()),
            queue: TaskQueue::new(),
            jobs: RwLock::new(HashMap::new()),
            stats: RuntimeStats::default(),
            hooks_override: deps.hooks,
            state: AtomicU8::new(STATE_RUNNING),
            exec_lock: Mutex::new(()),
            latches: Mutex::new(HashMap::new()),
            completion: Mutex::new(()),
            completion_signal: Condvar::new(),
        });

        let pool_size = config.thread_pool_size.max(1);
        let mut threads = Vec::with_capacity(pool_size);
        for index in 0..pool_size {
            let core = Arc::clone(&core);
            let handle = std::thread::Builder::new()
                .name(format!("weft-worker-{index}"))
                .spawn(move || dispatch::worker_loop(core));
            match handle {
                Ok(handle) => threads.push(handle),
                Err(err) => tracing::error!(error = %err, "failed to spawn worker thread"),
            }
        }
        Self { core, threads: Mutex::new(threads) }
    }

    pub fn flows(&self) -> Arc<FlowRegistry> {
        Arc::clone(&self.core.flows)
    }

    pub fn workers(&self) -> Arc<WorkerRegistry> {
        Arc::clone(&self.core.workers)
    }

    /// Start (or return) the worker for a flow. Idempotent per flow.
    pub fn exec(&self, flow_id: &str) -> Result<Arc<WorkerState>, RuntimeError> {
        let core = &self.core;
        if !core.is_accepting() {
            return Err(RuntimeError::ShuttingDown);
        }
        let flow_arc = core
            .flows
            .get(flow_id)
            .ok_or_else(|| CoreError::FlowNotFound(flow_id.to_string()))?;

        let _exec_guard = core.exec_lock.lock();
        if let Some(worker) = core.workers.for_flow(flow_id) {
            if worker.status() != WorkerStatus::Stopped {
                return Ok(worker);
            }
        }

        {
            let mut flow = flow_arc.write();
            flow.validate().map_err(CoreError::from)?;
            flow.seal();
        }
        core.flows.set_running(flow_id, true)?;

        let worker = Arc::new(WorkerState::new(flow_id));
        core.workers.register(Arc::clone(&worker));
        worker.set_status(WorkerStatus::Running);
        tracing::info!(flow = flow_id, worker = %worker.worker_id(), "worker started");
        core.hooks().on_worker_start(flow_id, &worker);
        Ok(worker)
    }

    /// Inject a job: payload into `routine.slot`, a fresh [`JobContext`],
    /// one activation task.
    pub fn post(
        &self,
        flow_id: &str,
        routine_id: &str,
        slot_name: &str,
        payload: Payload,
        metadata: Option<Payload>,
    ) -> Result<(Arc<WorkerState>, Arc<JobContext>), RuntimeError> {
        let core = &self.core;
        if !core.is_accepting() {
            return Err(RuntimeError::ShuttingDown);
        }
        if core.queue.len() >= core.max_queue_size {
            return Err(RuntimeError::Backpressure(core.max_queue_size));
        }

        let worker = self.exec(flow_id)?;
        let flow_arc = core
            .flows
            .get(flow_id)
            .ok_or_else(|| CoreError::FlowNotFound(flow_id.to_string()))?;

        let now = core.now_ms();
        let job = Arc::new(JobContext::new(
            worker.worker_id(),
            flow_id,
            metadata.unwrap_or_default(),
            now,
        ));

        // The job must be visible before its first task can be dequeued.
        core.jobs.write().insert(job.job_id(), Arc::clone(&job));
        let deliver = || -> Result<bool, CoreError> {
            let flow = flow_arc.read();
            let routine = flow
                .get_routine(routine_id)
                .ok_or_else(|| CoreError::RoutineNotFound(routine_id.to_string()))?;
            if routine.slot(slot_name).is_none() {
                return Err(CoreError::SlotNotFound {
                    routine: routine_id.into(),
                    slot: slot_name.into(),
                });
            }
            core.enqueue_and_activate(&flow, &job, routine_id, slot_name, payload, "")
        };
        let delivered = match deliver() {
            Ok(delivered) => delivered,
            Err(err) => {
                core.jobs.write().remove(&job.job_id());
                return Err(err.into());
            }
        };
        RuntimeStats::bump(&core.stats.jobs_created);
        job.trace(routine_id, "posted", serde_json::json!({ "slot": slot_name }), now);
        tracing::debug!(job = %job.job_id(), flow = flow_id, routine = routine_id, "job posted");

        if !delivered {
            // The before-enqueue hook vetoed the only task; nothing will run.
            if job.complete(JobStatus::Completed, None, now) {
                RuntimeStats::bump(&core.stats.jobs_completed);
                core.hooks().on_job_end(&job, &worker, JobStatus::Completed, None);
                core.signal_completion();
            }
        }
        Ok((worker, job))
    }

    pub fn get_job(&self, job_id: JobId) -> Option<Arc<JobContext>> {
        self.core.get_job(job_id)
    }

    pub fn jobs(&self) -> Vec<Arc<JobContext>> {
        self.core.jobs_snapshot()
    }

    /// Block until every job reached a terminal status, up to `timeout`.
    pub fn wait_until_all_jobs_finished(&self, timeout: Duration) -> bool {
        self.core.wait_all_jobs(timeout)
    }

    pub fn pause_job(&self, job_id: JobId) -> Result<(), RuntimeError> {
        let job = self
            .core
            .get_job(job_id)
            .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;
        job.pause();
        Ok(())
    }

    pub fn resume_job(&self, job_id: JobId) -> Result<(), RuntimeError> {
        let job = self
            .core
            .get_job(job_id)
            .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;
        job.resume();
        Ok(())
    }

    /// Cancel a job: terminal immediately, queued tasks discarded at
    /// dequeue, in-flight logic finishes with its emits suppressed.
    pub fn cancel_job(&self, job_id: JobId) -> Result<(), RuntimeError> {
        let core = &self.core;
        let job = core
            .get_job(job_id)
            .ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;
        if job.complete(JobStatus::Cancelled, None, core.now_ms()) {
            tracing::info!(job = %job.job_id(), "job cancelled");
            RuntimeStats::bump(&core.stats.jobs_cancelled);
            if let Some(worker) = core.workers.get(job.worker_id()) {
                core.hooks().on_job_end(&job, &worker, JobStatus::Cancelled, None);
            }
            core.signal_completion();
        }
        Ok(())
    }

    /// Pause dispatch for every job on a flow's worker.
    pub fn pause_worker(&self, flow_id: &str) -> Result<(), RuntimeError> {
        let worker = self
            .core
            .workers
            .for_flow(flow_id)
            .ok_or_else(|| RuntimeError::WorkerNotFound(flow_id.to_string()))?;
        worker.set_status(WorkerStatus::Paused);
        Ok(())
    }

    pub fn resume_worker(&self, flow_id: &str) -> Result<(), RuntimeError> {
        let worker = self
            .core
            .workers
            .for_flow(flow_id)
            .ok_or_else(|| RuntimeError::WorkerNotFound(flow_id.to_string()))?;
        worker.set_status(WorkerStatus::Running);
        Ok(())
    }

    /// Stop the runtime.
    ///
    /// `wait = true` refuses new posts, drains the queue, then joins the
    /// pool. `wait = false` cancels all jobs, clears the queue, and joins
    /// with a grace timeout. Returns whether a clean stop was achieved.
    /// Idempotent.
    pub fn shutdown(&self, wait: bool) -> bool {
        let core = &self.core;
        if core.state() == STATE_STOPPED {
            return true;
        }
        core.set_state(STATE_DRAINING);

        let drained = if wait {
            let drained = core.wait_all_jobs(DRAIN_TIMEOUT);
            core.queue.close();
            drained
        } else {
            for job in core.jobs_snapshot() {
                if job.complete(JobStatus::Cancelled, None, core.now_ms()) {
                    RuntimeStats::bump(&core.stats.jobs_cancelled);
                    if let Some(worker) = core.workers.get(job.worker_id()) {
                        core.hooks().on_job_end(&job, &worker, JobStatus::Cancelled, None);
                    }
                }
            }
            core.signal_completion();
            let dropped = core.queue.drain();
            for task in &dropped {
                if let Some(job) = core.get_job(task.job_id) {
                    core.finish_task(&job);
                }
            }
            core.queue.close();
            dropped.is_empty()
        };

        let joined = self.join_pool(wait);

        for worker_id in core.workers.ids() {
            if let Some(worker) = core.workers.remove(worker_id) {
                worker.set_status(WorkerStatus::Stopped);
                core.hooks().on_worker_stop(worker.flow_id(), &worker, WorkerStatus::Stopped);
                let _ = core.flows.set_running(worker.flow_id(), false);
                if let Some(flow) = core.flows.get(worker.flow_id()) {
                    flow.write().unseal();
                }
                tracing::info!(flow = worker.flow_id(), worker = %worker.worker_id(), "worker stopped");
            }
        }

        core.set_state(STATE_STOPPED);
        drained && joined
    }

    fn join_pool(&self, wait: bool) -> bool {
        let handles = std::mem::take(&mut *self.threads.lock());
        if wait {
            for handle in handles {
                let _ = handle.join();
            }
            return true;
        }
        let deadline = Instant::now() + JOIN_GRACE;
        let mut pending = handles;
        loop {
            let (finished, still_running): (Vec<_>, Vec<_>) =
                pending.into_iter().partition(|h| h.is_finished());
            for handle in finished {
                let _ = handle.join();
            }
            if still_running.is_empty() {
                return true;
            }
            if Instant::now() >= deadline {
                // Abandon stuck threads; they exit once their logic returns.
                tracing::warn!(count = still_running.len(), "worker threads outlived grace period");
                return false;
            }
            pending = still_running;
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats.snapshot()
    }

    /// Tasks currently queued (ready + delayed).
    pub fn queue_depth(&self) -> usize {
        self.core.queue.len()
    }

    /// Ready tasks per priority lane (High, Normal, Low).
    pub fn queue_depths(&self) -> [usize; Priority::COUNT] {
        self.core.queue.depths()
    }
}

impl<C: Clock> Drop for Runtime<C> {
    fn drop(&mut self) {
        if self.core.state() != STATE_STOPPED {
            self.shutdown(false);
        }
    }
}
