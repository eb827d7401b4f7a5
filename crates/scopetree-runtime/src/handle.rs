//! Scope Handles
//!
//! Explicit context passing for scoped callers: a [`ScopeHandle`] carries a
//! path plus the runtime it belongs to, and every operation on it is bound
//! to that path. Nested units derive their own handle with
//! [`ScopeHandle::child`] instead of inheriting ambient context, so a unit
//! of logic never learns where in the global tree it was mounted.

use crate::program::EffectProgram;
use crate::runtime::ScopeRuntime;
use scopetree_core::lifecycle::{failed_action, request_action, succeeded_action};
use scopetree_core::store::SubscriptionId;
use scopetree_core::tree::Reducer;
use scopetree_core::{Action, ScopePath, ScopeResult};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

// ----------------------------------------------------------------------------
// Scope Handle
// ----------------------------------------------------------------------------

#[derive(Clone)]
pub struct ScopeHandle {
    path: ScopePath,
    runtime: Arc<ScopeRuntime>,
}

impl ScopeHandle {
    pub(crate) fn new(path: ScopePath, runtime: Arc<ScopeRuntime>) -> Self {
        Self { path, runtime }
    }

    pub fn path(&self) -> &ScopePath {
        &self.path
    }

    /// Derive a handle for a nested scope (`"a"` or `"a.b"`)
    pub fn child(&self, scope: &str) -> ScopeResult<ScopeHandle> {
        let child = ScopePath::split(scope)?;
        Ok(Self::new(self.path.concat(&child), self.runtime.clone()))
    }

    /// Register `reducer` at this handle's path (called on mount)
    pub fn register(&self, reducer: Reducer) -> ScopeResult<()> {
        self.runtime.register(&self.path, reducer)
    }

    /// Unregister this handle's path (called on unmount); tolerant of
    /// teardown races
    pub fn unregister(&self) -> bool {
        self.runtime.unregister(&self.path)
    }

    /// Dispatch a local action; the router wraps it with this handle's
    /// path before it enters the shared store
    pub fn dispatch(&self, action: Action) {
        self.runtime.dispatch_at(&self.path, action);
    }

    /// The whole state tree
    pub fn state(&self) -> Value {
        self.runtime.get_state()
    }

    /// The slice owned by this handle's path, if initialized
    pub fn local_state(&self) -> Option<Value> {
        self.runtime.state_at(&self.path)
    }

    /// Subscribe to state changes; dropping the returned guard
    /// unsubscribes
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
        Subscription {
            id: self.runtime.subscribe(listener),
            runtime: self.runtime.clone(),
        }
    }

    /// Start an effect program under this handle's scope key
    pub fn run_saga<P: EffectProgram>(&self, program: P) -> ScopeResult<()> {
        self.runtime.run_saga(&self.path.join(), program)
    }

    /// Drive the async lifecycle for `resource` around `fut`: Request is
    /// dispatched before the call, then Succeeded with the value or Failed
    /// with the error. Failure is captured into state, never propagated;
    /// returns the value on success.
    pub async fn run_async<Fut, T, E>(&self, resource: &str, fut: Fut) -> Option<T>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: Display,
    {
        self.dispatch(request_action(resource));
        match fut.await {
            Ok(value) => {
                let payload = serde_json::to_value(&value).unwrap_or(Value::Null);
                self.dispatch(succeeded_action(resource, payload));
                Some(value)
            }
            Err(error) => {
                self.dispatch(failed_action(resource, json!(error.to_string())));
                None
            }
        }
    }

    /// A zero-argument trigger that runs the async lifecycle for
    /// `resource` each time it is called. The spawned task never panics
    /// back to the caller; outcomes land in state.
    pub fn async_trigger<F, Fut, T, E>(&self, resource: &str, factory: F) -> impl Fn()
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Display + Send + 'static,
    {
        let handle = self.clone();
        let resource = resource.to_string();
        move || {
            let handle = handle.clone();
            let resource = resource.clone();
            let fut = factory();
            tokio::spawn(async move {
                let _ = handle.run_async(&resource, fut).await;
            });
        }
    }
}

// ----------------------------------------------------------------------------
// Subscription Guard
// ----------------------------------------------------------------------------

/// Active state-change subscription; unsubscribes on drop
pub struct Subscription {
    id: SubscriptionId,
    runtime: Arc<ScopeRuntime>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.runtime.unsubscribe(self.id);
    }
}
