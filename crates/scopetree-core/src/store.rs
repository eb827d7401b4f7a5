//! Minimal State Container
//!
//! Holds the single authoritative state tree, applies the current root
//! reducer, and notifies subscribers. The root reducer is hot-swapped
//! atomically (`arc-swap`) whenever the reducer tree changes, so
//! `replace_reducer` never blocks dispatch and never resets state for
//! paths unaffected by the change.
//!
//! Dispatch is synchronous: the reducer runs to completion under the state
//! lock, subscribers are notified exactly once after state settles, and the
//! action is then forwarded on a broadcast feed for effect programs.

use crate::action::WrappedAction;
use crate::config::ChannelConfig;
use crate::path::{self, ScopePath};
use crate::tree::RootReducer;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Identifier handed back by [`Store::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

// ----------------------------------------------------------------------------
// Store
// ----------------------------------------------------------------------------

pub struct Store {
    state: Mutex<Value>,
    reducer: ArcSwap<RootReducer>,
    subscribers: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
    actions: broadcast::Sender<WrappedAction>,
}

impl Store {
    pub fn new(config: &ChannelConfig) -> Self {
        let (actions, _) = broadcast::channel(config.action_buffer_size);
        Self {
            state: Mutex::new(Value::Null),
            reducer: ArcSwap::from_pointee(RootReducer::identity()),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            actions,
        }
    }

    /// Snapshot of the whole state tree
    pub fn get_state(&self) -> Value {
        self.state.lock().clone()
    }

    /// Snapshot of the slice at `path`, if present
    pub fn state_at(&self, path: &ScopePath) -> Option<Value> {
        path::get_at(&self.state.lock(), path).cloned()
    }

    /// Apply the current root reducer and notify subscribers once.
    ///
    /// Actions dispatched from one scope are applied in call order; the
    /// state lock serializes concurrent dispatchers.
    pub fn dispatch(&self, wrapped: WrappedAction) {
        let reducer = self.reducer.load();
        {
            // the reducer runs on a clone so a panicking reducer leaves
            // the committed state untouched
            let mut state = self.state.lock();
            let next = reducer.apply(state.clone(), &wrapped);
            *state = next;
        }
        trace!(scope = %wrapped.scope, kind = %wrapped.action.kind, "action applied");
        self.notify();
        // no receivers is fine; effect programs subscribe on demand
        let _ = self.actions.send(wrapped);
    }

    /// Swap in a new root reducer. Existing state is left untouched; the
    /// next dispatch simply runs through the new composition.
    pub fn replace_reducer(&self, reducer: RootReducer) {
        self.reducer.store(Arc::new(reducer));
    }

    /// Remove the state slice at `path` (used by the unregister pruning
    /// policy). Subscribers are notified when something was removed.
    pub fn prune(&self, path: &ScopePath) -> bool {
        let removed = path::delete_at(&mut self.state.lock(), path);
        if removed {
            self.notify();
        }
        removed
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.lock().retain(|(sid, _)| *sid != id);
    }

    /// A fresh receiver on the action feed. Subscribe before spawning a
    /// program so it observes every later action in arrival order.
    pub fn subscribe_actions(&self) -> broadcast::Receiver<WrappedAction> {
        self.actions.subscribe()
    }

    /// Listeners run outside the subscriber lock: a listener may re-enter
    /// the store (dispatch, subscribe, unsubscribe) without deadlocking.
    fn notify(&self) {
        let listeners: Vec<Listener> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::tree::{create_reducer, ReducerTree};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counter_store() -> (Store, ScopePath) {
        let path = ScopePath::split("app.counter").unwrap();
        let mut tree = ReducerTree::new();
        tree.register(
            &path,
            create_reducer(json!({"count": 0}), |state, action| {
                if action.kind == "Inc" {
                    let next = state["count"].as_i64().unwrap_or(0) + 1;
                    state["count"] = json!(next);
                }
            }),
        )
        .unwrap();
        let store = Store::new(&ChannelConfig::default());
        store.replace_reducer(tree.compose());
        store.dispatch(WrappedAction::wrap(Action::init(), path.clone()));
        (store, path)
    }

    #[test]
    fn dispatch_applies_reducer_and_updates_slice() {
        let (store, path) = counter_store();
        store.dispatch(WrappedAction::wrap(Action::bare("Inc"), path.clone()));
        store.dispatch(WrappedAction::wrap(Action::bare("Inc"), path.clone()));
        assert_eq!(store.state_at(&path), Some(json!({"count": 2})));
    }

    #[test]
    fn subscribers_fire_once_per_dispatch() {
        let (store, path) = counter_store();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let id = store.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.dispatch(WrappedAction::wrap(Action::bare("Inc"), path.clone()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        store.unsubscribe(id);
        store.dispatch(WrappedAction::wrap(Action::bare("Inc"), path));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn replace_reducer_preserves_existing_state() {
        let (store, path) = counter_store();
        store.dispatch(WrappedAction::wrap(Action::bare("Inc"), path.clone()));

        // recompose with an additional unrelated entry
        let mut tree = ReducerTree::new();
        tree.register(&path, create_reducer(json!({"count": 0}), |_, _| {}))
            .unwrap();
        tree.register(
            &ScopePath::split("app.other").unwrap(),
            create_reducer(json!({"ready": true}), |_, _| {}),
        )
        .unwrap();
        store.replace_reducer(tree.compose());

        assert_eq!(store.state_at(&path), Some(json!({"count": 1})));
    }

    #[test]
    fn dispatched_actions_reach_the_feed() {
        let (store, path) = counter_store();
        let mut feed = store.subscribe_actions();
        store.dispatch(WrappedAction::wrap(Action::bare("Inc"), path.clone()));
        let seen = feed.try_recv().unwrap();
        assert_eq!(seen.action.kind, "Inc");
        assert_eq!(seen.scope, path);
    }

    #[test]
    fn listener_may_reenter_the_store() {
        let (store, path) = counter_store();
        let store = Arc::new(store);

        // a listener that dispatches a follow-up action exactly once,
        // the way a re-render callback reacts to a state change
        let echoed = Arc::new(AtomicUsize::new(0));
        let inner_store = store.clone();
        let inner_path = path.clone();
        let fired = echoed.clone();
        store.subscribe(move || {
            if fired.fetch_add(1, Ordering::SeqCst) == 0 {
                inner_store.dispatch(WrappedAction::wrap(Action::bare("Inc"), inner_path.clone()));
            }
        });

        store.dispatch(WrappedAction::wrap(Action::bare("Inc"), path.clone()));
        assert_eq!(store.state_at(&path), Some(json!({"count": 2})));
        assert_eq!(echoed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listener_may_subscribe_and_unsubscribe() {
        let (store, path) = counter_store();
        let store = Arc::new(store);

        let inner = store.clone();
        let id = store.subscribe(move || {
            let late = inner.subscribe(|| {});
            inner.unsubscribe(late);
        });

        store.dispatch(WrappedAction::wrap(Action::bare("Inc"), path.clone()));
        store.unsubscribe(id);
        assert_eq!(store.state_at(&path), Some(json!({"count": 1})));
    }

    #[test]
    fn panicking_reducer_leaves_state_intact() {
        let path = ScopePath::split("app").unwrap();
        let mut tree = ReducerTree::new();
        tree.register(
            &path,
            create_reducer(json!({"count": 0}), |_, action| {
                if action.kind == "Boom" {
                    panic!("reducer blew up");
                }
            }),
        )
        .unwrap();
        let store = Store::new(&ChannelConfig::default());
        store.replace_reducer(tree.compose());
        store.dispatch(WrappedAction::wrap(Action::init(), path.clone()));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.dispatch(WrappedAction::wrap(Action::bare("Boom"), path.clone()));
        }));
        assert!(result.is_err());
        assert_eq!(store.state_at(&path), Some(json!({"count": 0})));
    }

    #[test]
    fn prune_removes_slice() {
        let (store, path) = counter_store();
        assert!(store.prune(&path));
        assert_eq!(store.state_at(&path), None);
        assert!(!store.prune(&path));
    }
}
