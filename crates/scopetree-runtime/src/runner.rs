//! Effect Runner
//!
//! Schedules effect programs keyed by scope, independent of the reducer
//! tree. Each program runs on its own tokio task with a dedicated action
//! feed receiver (subscribed before spawn, so events arrive in order);
//! programs across scopes run concurrently. Cancelling a scope fires its
//! token and aborts every task registered under it, including forks.

use crate::context::EffectContext;
use crate::program::{EffectError, EffectProgram};
use dashmap::DashMap;
use parking_lot::Mutex;
use scopetree_core::{ScopePath, ScopeResult, Store};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

// ----------------------------------------------------------------------------
// Per-Scope Task Tracking
// ----------------------------------------------------------------------------

/// Cancellation token and task handles shared by every program (and fork)
/// running under one scope key
pub(crate) struct ScopeTasks {
    token: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl ScopeTasks {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn track(&self, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    fn cancel(&self) {
        self.token.cancel();
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

// ----------------------------------------------------------------------------
// Effect Runner
// ----------------------------------------------------------------------------

pub struct EffectRunner {
    store: Arc<Store>,
    scopes: DashMap<String, Arc<ScopeTasks>>,
}

impl EffectRunner {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            scopes: DashMap::new(),
        }
    }

    /// Start an effect program under `scope_key` (dot-joined scope path).
    /// Multiple programs may share one key; they all die together when the
    /// scope is cancelled.
    pub fn run<P: EffectProgram>(&self, scope_key: &str, program: P) -> ScopeResult<()> {
        let scope = ScopePath::split(scope_key)?;
        let tasks = self
            .scopes
            .entry(scope_key.to_string())
            .or_insert_with(|| Arc::new(ScopeTasks::new()))
            .clone();
        spawn_program(
            self.store.clone(),
            scope,
            tasks.clone(),
            tasks.token.child_token(),
            program,
        );
        Ok(())
    }

    /// Cancel every program registered at `path` or any of its descendants
    pub fn cancel_scope(&self, path: &ScopePath) {
        self.scopes.retain(|key, tasks| {
            let covered = ScopePath::split(key).is_ok_and(|scope| scope.starts_with(path));
            if covered {
                debug!(scope = %key, "cancelling effect programs");
                tasks.cancel();
            }
            !covered
        });
    }

    /// Cancel everything (runtime teardown)
    pub fn shutdown(&self) {
        self.cancel_scope(&ScopePath::root());
    }

    /// Number of scope keys with registered programs
    pub fn active_scopes(&self) -> usize {
        self.scopes.len()
    }
}

/// Spawn one program task. Completion, cancellation, and faults are all
/// absorbed here: a fault terminates the program and is logged, nothing
/// else.
pub(crate) fn spawn_program<P: EffectProgram>(
    store: Arc<Store>,
    scope: ScopePath,
    tasks: Arc<ScopeTasks>,
    token: CancellationToken,
    program: P,
) {
    let actions = store.subscribe_actions();
    let ctx = EffectContext::new(scope.clone(), store, actions, token, tasks.clone());
    let handle = tokio::spawn(async move {
        match Box::new(program).run(ctx).await {
            Ok(()) => debug!(scope = %scope, "effect program finished"),
            Err(EffectError::Cancelled) => debug!(scope = %scope, "effect program cancelled"),
            Err(fault) => error!(scope = %scope, %fault, "effect program fault"),
        }
    });
    tasks.track(handle);
}
