//! Scope Runtime
//!
//! The orchestrator binding the three moving parts together: the reducer
//! registry, the store with its hot-swapped root reducer, and the effect
//! runner. Registration flows through here so every structural change
//! recomposes the tree, swaps the store's reducer, and seeds the new path
//! with `@@INIT`; unregistration tears down state and effect programs in
//! the same motion.

use crate::handle::ScopeHandle;
use crate::program::EffectProgram;
use crate::runner::EffectRunner;
use parking_lot::Mutex;
use scopetree_core::store::SubscriptionId;
use scopetree_core::tree::{Reducer, ReducerTree, RootReducer};
use scopetree_core::{Action, RuntimeConfig, ScopeError, ScopePath, ScopeResult, Store, WrappedAction};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

// ----------------------------------------------------------------------------
// Scope Runtime
// ----------------------------------------------------------------------------

pub struct ScopeRuntime {
    store: Arc<Store>,
    tree: Mutex<ReducerTree>,
    runner: EffectRunner,
    static_reducer: Option<Reducer>,
    config: RuntimeConfig,
}

impl ScopeRuntime {
    pub fn new(config: RuntimeConfig) -> Arc<Self> {
        Self::with_static_reducer(config, None)
    }

    pub(crate) fn with_static_reducer(
        config: RuntimeConfig,
        static_reducer: Option<Reducer>,
    ) -> Arc<Self> {
        let store = Arc::new(Store::new(&config.channels));
        let runtime = Arc::new(Self {
            runner: EffectRunner::new(store.clone()),
            store,
            tree: Mutex::new(ReducerTree::new()),
            static_reducer,
            config,
        });
        // install the (possibly static-only) composition before first use
        let tree = runtime.tree.lock();
        runtime.recompose(&tree);
        drop(tree);
        info!("scope runtime started");
        runtime
    }

    /// A handle bound to the root scope; nest with [`ScopeHandle::child`]
    pub fn handle(self: &Arc<Self>) -> ScopeHandle {
        ScopeHandle::new(ScopePath::root(), self.clone())
    }

    /// Register a reducer at `path` and seed its state with `@@INIT`.
    /// A duplicate registration is rejected; the existing reducer stays
    /// authoritative.
    pub fn register(&self, path: &ScopePath, reducer: Reducer) -> ScopeResult<()> {
        {
            let mut tree = self.tree.lock();
            tree.register(path, reducer).map_err(|err| {
                error!(path = %path, "{err}");
                err
            })?;
            self.recompose(&tree);
        }
        self.store
            .dispatch(WrappedAction::wrap(Action::init(), path.clone()));
        Ok(())
    }

    /// Remove the reducer at `path`, prune its state slice (policy
    /// permitting), and cancel effect programs under the path. Unknown
    /// paths are tolerated with a diagnostic; unmount races are expected.
    pub fn unregister(&self, path: &ScopePath) -> bool {
        let removed = {
            let mut tree = self.tree.lock();
            let removed = tree.unregister(path);
            if removed {
                self.recompose(&tree);
            }
            removed
        };
        if removed {
            if self.config.prune_on_unregister {
                self.store.prune(path);
            }
        } else {
            let err = ScopeError::UnknownScope { path: path.join() };
            warn!(path = %path, "{err}: unregister ignored");
        }
        // saga keys are independent of reducer registration, cancel anyway
        self.runner.cancel_scope(path);
        removed
    }

    /// Dispatch an already-wrapped action
    pub fn dispatch(&self, wrapped: WrappedAction) {
        self.store.dispatch(wrapped);
    }

    /// Wrap `action` at `path` and dispatch it
    pub fn dispatch_at(&self, path: &ScopePath, action: Action) {
        self.store.dispatch(WrappedAction::wrap(action, path.clone()));
    }

    pub fn get_state(&self) -> Value {
        self.store.get_state()
    }

    pub fn state_at(&self, path: &ScopePath) -> Option<Value> {
        self.store.state_at(path)
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.store.unsubscribe(id);
    }

    /// Start an effect program under a dot-joined scope key
    pub fn run_saga<P: EffectProgram>(&self, scope_key: &str, program: P) -> ScopeResult<()> {
        self.runner.run(scope_key, program)
    }

    /// Cancel all effect programs and stop accepting new work from them
    pub fn shutdown(&self) {
        self.runner.shutdown();
        info!("scope runtime shut down");
    }

    /// Fold the registry into a fresh root reducer and swap it into the
    /// store. The static reducer, when present, runs on the whole root
    /// state before the tree fold.
    fn recompose(&self, tree: &ReducerTree) {
        let tree_reducer = tree.compose();
        let root = match &self.static_reducer {
            Some(static_reducer) => {
                let static_reducer = static_reducer.clone();
                RootReducer::new(move |state, wrapped| {
                    let state = static_reducer(state, &wrapped.action_relative_to(0));
                    tree_reducer.apply(state, wrapped)
                })
            }
            None => tree_reducer,
        };
        self.store.replace_reducer(root);
    }
}

impl Drop for ScopeRuntime {
    fn drop(&mut self) {
        self.runner.shutdown();
    }
}
