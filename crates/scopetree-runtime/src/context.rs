//! Effect Context
//!
//! The capability handed to a running effect program: its suspension points
//! (`take`, `delay`, `call`), its dispatch path (`put`), forking, and the
//! in-program async lifecycle helper. Every suspension races the scope's
//! cancellation token, and `put` refuses to dispatch once the token has
//! fired, so a cancelled program cannot touch the store again.

use crate::program::{ActionPattern, EffectError, EffectProgram, EffectResult};
use crate::runner::{spawn_program, ScopeTasks};
use scopetree_core::lifecycle::{failed_action, request_action, succeeded_action};
use scopetree_core::{Action, ScopePath, Store, WrappedAction};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::warn;

// ----------------------------------------------------------------------------
// Effect Context
// ----------------------------------------------------------------------------

pub struct EffectContext {
    scope: ScopePath,
    store: Arc<Store>,
    actions: broadcast::Receiver<WrappedAction>,
    token: CancellationToken,
    tasks: Arc<ScopeTasks>,
}

impl EffectContext {
    pub(crate) fn new(
        scope: ScopePath,
        store: Arc<Store>,
        actions: broadcast::Receiver<WrappedAction>,
        token: CancellationToken,
        tasks: Arc<ScopeTasks>,
    ) -> Self {
        Self {
            scope,
            store,
            actions,
            token,
            tasks,
        }
    }

    /// The scope path this program is bound to
    pub fn scope(&self) -> &ScopePath {
        &self.scope
    }

    /// Snapshot of the whole state tree
    pub fn state(&self) -> Value {
        self.store.get_state()
    }

    /// Snapshot of the slice at this program's scope
    pub fn local_state(&self) -> Option<Value> {
        self.store.state_at(&self.scope)
    }

    /// Dispatch an action wrapped at this program's scope
    pub fn put(&self, action: Action) -> EffectResult<()> {
        if self.token.is_cancelled() {
            return Err(EffectError::Cancelled);
        }
        self.store
            .dispatch(WrappedAction::wrap(action, self.scope.clone()));
        Ok(())
    }

    /// Suspend until the next action matching `pattern` arrives. Actions
    /// are observed strictly in arrival order; non-matching ones are
    /// skipped. Falling behind the feed logs a lag and continues.
    pub async fn take(&mut self, pattern: &ActionPattern) -> EffectResult<WrappedAction> {
        loop {
            tokio::select! {
                biased;
                () = self.token.cancelled() => return Err(EffectError::Cancelled),
                received = self.actions.recv() => match received {
                    Ok(wrapped) if pattern.matches(&wrapped) => return Ok(wrapped),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(scope = %self.scope, skipped, "effect program lagged behind the action feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(EffectError::FeedClosed);
                    }
                },
            }
        }
    }

    /// Suspend for `duration`, subject to cancellation
    pub async fn delay(&self, duration: Duration) -> EffectResult<()> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(EffectError::Cancelled),
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Await an external asynchronous call, subject to cancellation
    pub async fn call<Fut, T>(&self, fut: Fut) -> EffectResult<T>
    where
        Fut: Future<Output = T>,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(EffectError::Cancelled),
            value = fut => Ok(value),
        }
    }

    /// Run the async lifecycle for `resource` around `fut`: Request before,
    /// Succeeded with the value or Failed with the error after. The call's
    /// own failure is captured into state and reported as `Ok(None)`; only
    /// cancellation surfaces as an error.
    pub async fn run_async<Fut, T, E>(
        &mut self,
        resource: &str,
        fut: Fut,
    ) -> EffectResult<Option<T>>
    where
        Fut: Future<Output = Result<T, E>> + Send,
        T: Serialize,
        E: Display,
    {
        self.put(request_action(resource))?;
        match self.call(fut).await? {
            Ok(value) => {
                let payload = serde_json::to_value(&value).unwrap_or(Value::Null);
                self.put(succeeded_action(resource, payload))?;
                Ok(Some(value))
            }
            Err(error) => {
                self.put(failed_action(resource, json!(error.to_string())))?;
                Ok(None)
            }
        }
    }

    /// Fork a concurrent sub-task under this program's scope. The child
    /// gets its own action feed and a child cancellation token, and dies
    /// with the parent scope.
    pub fn fork<P: EffectProgram>(&self, program: P) {
        spawn_program(
            self.store.clone(),
            self.scope.clone(),
            self.tasks.clone(),
            self.token.child_token(),
            program,
        );
    }
}
