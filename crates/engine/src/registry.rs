// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide lookup tables for flows and live workers.
//!
//! The runtime takes registries as explicit dependencies; a process-wide
//! instance is only a convenience for hosts that want one shared table.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use weft_core::{CoreError, Flow, WorkerId, WorkerState};

struct FlowEntry {
    flow: Arc<RwLock<Flow>>,
    /// True while a worker on this flow is running; guards unregistration
    /// and structural mutation.
    running: AtomicBool,
}

/// Registry of flows keyed by flow id.
#[derive(Default)]
pub struct FlowRegistry {
    entries: RwLock<HashMap<String, Arc<FlowEntry>>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide convenience instance.
    pub fn global() -> &'static FlowRegistry {
        static GLOBAL: OnceLock<FlowRegistry> = OnceLock::new();
        GLOBAL.get_or_init(FlowRegistry::new)
    }

    /// Validate and register a flow. Duplicate ids are rejected.
    pub fn register(&self, flow: Flow) -> Result<(), CoreError> {
        flow.validate()?;
        let flow_id = flow.flow_id().to_string();
        let mut entries = self.entries.write();
        if entries.contains_key(&flow_id) {
            return Err(CoreError::FlowAlreadyExists(flow_id));
        }
        entries.insert(
            flow_id,
            Arc::new(FlowEntry {
                flow: Arc::new(RwLock::new(flow)),
                running: AtomicBool::new(false),
            }),
        );
        Ok(())
    }

    /// Remove a flow. Rejected while its worker is running.
    pub fn unregister(&self, flow_id: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.write();
        let entry =
            entries.get(flow_id).ok_or_else(|| CoreError::FlowNotFound(flow_id.to_string()))?;
        if entry.running.load(Ordering::SeqCst) {
            return Err(CoreError::FlowRunning(flow_id.to_string()));
        }
        entries.remove(flow_id);
        Ok(())
    }

    pub fn get(&self, flow_id: &str) -> Option<Arc<RwLock<Flow>>> {
        self.entries.read().get(flow_id).map(|e| Arc::clone(&e.flow))
    }

    pub fn contains(&self, flow_id: &str) -> bool {
        self.entries.read().contains_key(flow_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Mutate an idle flow in place (add/remove routines, rewire, config).
    /// Rejected while the flow's worker is running.
    pub fn update<R>(
        &self,
        flow_id: &str,
        f: impl FnOnce(&mut Flow) -> R,
    ) -> Result<R, CoreError> {
        let entry = {
            let entries = self.entries.read();
            entries
                .get(flow_id)
                .ok_or_else(|| CoreError::FlowNotFound(flow_id.to_string()))?
                .clone()
        };
        if entry.running.load(Ordering::SeqCst) {
            return Err(CoreError::FlowRunning(flow_id.to_string()));
        }
        let result = f(&mut entry.flow.write());
        Ok(result)
    }

    /// Flip the running guard (runtime-internal).
    pub(crate) fn set_running(&self, flow_id: &str, running: bool) -> Result<(), CoreError> {
        let entries = self.entries.read();
        let entry =
            entries.get(flow_id).ok_or_else(|| CoreError::FlowNotFound(flow_id.to_string()))?;
        entry.running.store(running, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_running(&self, flow_id: &str) -> bool {
        self.entries
            .read()
            .get(flow_id)
            .is_some_and(|e| e.running.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
struct WorkerTable {
    workers: HashMap<WorkerId, Arc<WorkerState>>,
    by_flow: HashMap<String, WorkerId>,
}

/// Registry of live workers for introspection. Non-owning in spirit:
/// entries are removed on shutdown.
#[derive(Default)]
pub struct WorkerRegistry {
    inner: RwLock<WorkerTable>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, worker: Arc<WorkerState>) {
        let mut inner = self.inner.write();
        inner.by_flow.insert(worker.flow_id().to_string(), worker.worker_id());
        inner.workers.insert(worker.worker_id(), worker);
    }

    pub fn get(&self, worker_id: WorkerId) -> Option<Arc<WorkerState>> {
        self.inner.read().workers.get(&worker_id).cloned()
    }

    pub fn for_flow(&self, flow_id: &str) -> Option<Arc<WorkerState>> {
        let inner = self.inner.read();
        let worker_id = inner.by_flow.get(flow_id)?;
        inner.workers.get(worker_id).cloned()
    }

    pub fn remove(&self, worker_id: WorkerId) -> Option<Arc<WorkerState>> {
        let mut inner = self.inner.write();
        let worker = inner.workers.remove(&worker_id)?;
        inner.by_flow.remove(worker.flow_id());
        Some(worker)
    }

    pub fn ids(&self) -> Vec<WorkerId> {
        self.inner.read().workers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().workers.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
