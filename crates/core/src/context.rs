// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ambient execution scope for routine logic.
//!
//! The scheduler installs a scope on the worker thread before each logic
//! invocation so `emit` and `current_job` work without threading handles
//! through user code. Out-of-scope calls fail loudly with
//! `no_execution_context`.

use crate::error::CoreError;
use crate::job::JobContext;
use crate::payload::Payload;
use crate::worker::WorkerState;
use smol_str::SmolStr;
use std::cell::RefCell;
use std::sync::Arc;

/// Routes an emitted event to its connected slots. Implemented by the
/// runtime; the core only defines the seam.
pub trait EventRouter: Send + Sync {
    fn route_emit(
        &self,
        scope: &ExecutionScope,
        event: &str,
        payload: Payload,
    ) -> Result<(), CoreError>;
}

/// The context of one logic invocation.
#[derive(Clone)]
pub struct ExecutionScope {
    pub job: Arc<JobContext>,
    pub worker: Arc<WorkerState>,
    pub routine_id: SmolStr,
    pub router: Arc<dyn EventRouter>,
}

thread_local! {
    static SCOPE: RefCell<Option<ExecutionScope>> = const { RefCell::new(None) };
}

/// Install a scope for the current thread; restored on guard drop.
pub fn enter_scope(scope: ExecutionScope) -> ScopeGuard {
    let prev = SCOPE.with(|cell| cell.borrow_mut().replace(scope));
    ScopeGuard { prev }
}

/// RAII guard restoring the previously installed scope.
pub struct ScopeGuard {
    prev: Option<ExecutionScope>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let prev = self.prev.take();
        SCOPE.with(|cell| *cell.borrow_mut() = prev);
    }
}

/// Snapshot of the currently installed scope, if any.
pub fn current_scope() -> Option<ExecutionScope> {
    SCOPE.with(|cell| cell.borrow().clone())
}

/// The job of the current logic invocation.
pub fn current_job() -> Option<Arc<JobContext>> {
    current_scope().map(|scope| scope.job)
}

/// Emit an event from within a logic invocation.
///
/// The scope is cloned out before routing so the router may run logic-free
/// of the thread-local borrow.
pub fn emit(event: &str, payload: Payload) -> Result<(), CoreError> {
    let scope = current_scope().ok_or(CoreError::NoExecutionContext)?;
    let router = Arc::clone(&scope.router);
    router.route_emit(&scope, event, payload)
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
