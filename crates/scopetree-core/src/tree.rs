//! Reducer Tree Registry and Composition
//!
//! The dynamic registry mapping scope paths to locally-owned reducers, and
//! the composer that folds the whole tree into one root reducer. A node can
//! simultaneously own a reducer and have children, so `register(["a"])` and
//! `register(["a","b"])` coexist; the state slice at `a` then carries both
//! `a`'s own keys and the nested `b` object.
//!
//! The tree is only mutated through [`ReducerTree::register`] and
//! [`ReducerTree::unregister`]; every structural change is followed by a
//! fresh [`ReducerTree::compose`] whose snapshot is swapped atomically into
//! the store, so a dispatch racing a mutation sees either the pre- or the
//! post-mutation tree, never a partial one.

use crate::action::{Action, WrappedAction};
use crate::errors::{ScopeError, ScopeResult};
use crate::path::ScopePath;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

// ----------------------------------------------------------------------------
// Reducer Types
// ----------------------------------------------------------------------------

/// A pure local state-transition function owned by one scope path.
///
/// Receives the state slice at its path (`Value::Null` before first init)
/// and an action relative to its path, and returns the next slice. A
/// reducer must return keys of its slice it does not own (nested child
/// slices) unchanged; [`create_reducer`] guarantees this by construction.
pub type Reducer = Arc<dyn Fn(Value, &Action) -> Value + Send + Sync>;

/// The composed whole-tree reducer applied by the store on every dispatch
pub struct RootReducer {
    apply: Box<dyn Fn(Value, &WrappedAction) -> Value + Send + Sync>,
}

impl RootReducer {
    pub fn new(apply: impl Fn(Value, &WrappedAction) -> Value + Send + Sync + 'static) -> Self {
        Self {
            apply: Box::new(apply),
        }
    }

    /// The do-nothing reducer installed before anything registers
    pub fn identity() -> Self {
        Self::new(|state, _| state)
    }

    pub fn apply(&self, state: Value, action: &WrappedAction) -> Value {
        (self.apply)(state, action)
    }
}

/// Build a reducer from an initial slice and a mutating handler.
///
/// On first delivery (slice still `Value::Null`) the initial value is
/// materialized before the handler runs, so `@@INIT` populates the slice.
/// Because the handler mutates in place, unrelated keys survive untouched.
pub fn create_reducer<F>(initial: Value, handle: F) -> Reducer
where
    F: Fn(&mut Value, &Action) + Send + Sync + 'static,
{
    Arc::new(move |state, action| {
        let mut state = if state.is_null() {
            initial.clone()
        } else {
            state
        };
        handle(&mut state, action);
        state
    })
}

/// Chain two reducers over the same slice, left first
pub fn compose_reducers(first: Reducer, second: Reducer) -> Reducer {
    Arc::new(move |state, action| second(first(state, action), action))
}

// ----------------------------------------------------------------------------
// Reducer Tree
// ----------------------------------------------------------------------------

#[derive(Default, Clone)]
struct ReducerNode {
    /// The reducer owning this exact node, if any
    reducer: Option<Reducer>,
    children: HashMap<String, ReducerNode>,
}

impl ReducerNode {
    fn is_empty(&self) -> bool {
        self.reducer.is_none() && self.children.is_empty()
    }
}

/// Registry of scope-addressed reducers
#[derive(Default, Clone)]
pub struct ReducerTree {
    root: ReducerNode,
    len: usize,
}

impl ReducerTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered reducers
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether a reducer is registered at exactly `path`
    pub fn contains(&self, path: &ScopePath) -> bool {
        let mut node = &self.root;
        for segment in path.segments() {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.reducer.is_some()
    }

    /// Insert a reducer at `path`. Re-registration at an occupied path is an
    /// error; the pre-existing reducer stays authoritative.
    pub fn register(&mut self, path: &ScopePath, reducer: Reducer) -> ScopeResult<()> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        if node.reducer.is_some() {
            return Err(ScopeError::DuplicateScope { path: path.join() });
        }
        node.reducer = Some(reducer);
        self.len += 1;
        debug!(path = %path, "reducer registered");
        Ok(())
    }

    /// Remove the reducer at `path`. Returns whether anything was removed;
    /// an unknown path is tolerated (teardown races are expected). Interior
    /// nodes left without reducers or children are pruned.
    pub fn unregister(&mut self, path: &ScopePath) -> bool {
        let removed = Self::unregister_node(&mut self.root, path.segments());
        if removed {
            self.len -= 1;
            debug!(path = %path, "reducer unregistered");
        }
        removed
    }

    fn unregister_node(node: &mut ReducerNode, segments: &[String]) -> bool {
        let (head, rest) = match segments {
            [head, rest @ ..] => (head, rest),
            [] => return node.reducer.take().is_some(),
        };
        let Some(child) = node.children.get_mut(head) else {
            return false;
        };
        let removed = Self::unregister_node(child, rest);
        if removed && child.is_empty() {
            node.children.remove(head);
        }
        removed
    }

    /// Fold the current tree into a single root reducer.
    ///
    /// The snapshot is independent of later mutations: nodes are cloned and
    /// the reducers themselves are shared `Arc`s, so composition after
    /// adding or removing one entry cannot perturb state held at unrelated
    /// paths (untouched branches pass through the fold unchanged).
    pub fn compose(&self) -> RootReducer {
        let snapshot = self.root.clone();
        RootReducer::new(move |state, wrapped| fold_node(&snapshot, state, wrapped, 0))
    }
}

/// Depth-first fold along the wrapped scope: the node's own reducer runs on
/// the slice at this node, then the fold descends into the single child
/// named by the next scope segment. Branches off the path are untouched, so
/// there is no fan-out to siblings or descendants.
fn fold_node(node: &ReducerNode, state: Value, wrapped: &WrappedAction, depth: usize) -> Value {
    let mut state = state;
    if let Some(reducer) = &node.reducer {
        let local = wrapped.action_relative_to(depth);
        state = reducer(state, &local);
    }
    let Some(segment) = wrapped.scope.get(depth) else {
        return state;
    };
    let Some(child) = node.children.get(segment) else {
        return state;
    };
    let child_state = match &state {
        Value::Object(map) => map.get(segment).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    };
    let next_child = fold_node(child, child_state, wrapped, depth + 1);
    if !state.is_object() {
        state = Value::Object(Map::new());
    }
    if let Value::Object(map) = &mut state {
        map.insert(segment.to_string(), next_child);
    }
    state
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter() -> Reducer {
        create_reducer(json!({"count": 0}), |state, action| {
            if action.kind == "Inc" {
                let next = state["count"].as_i64().unwrap_or(0) + 1;
                state["count"] = json!(next);
            }
        })
    }

    fn path(s: &str) -> ScopePath {
        ScopePath::split(s).unwrap()
    }

    #[test]
    fn register_at_occupied_path_is_rejected() {
        let mut tree = ReducerTree::new();
        tree.register(&path("a.b"), counter()).unwrap();
        let err = tree.register(&path("a.b"), counter()).unwrap_err();
        assert!(matches!(err, ScopeError::DuplicateScope { .. }));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn node_can_own_a_reducer_and_children() {
        let mut tree = ReducerTree::new();
        tree.register(&path("a"), counter()).unwrap();
        tree.register(&path("a.b"), counter()).unwrap();
        assert!(tree.contains(&path("a")));
        assert!(tree.contains(&path("a.b")));
    }

    #[test]
    fn unregister_unknown_path_is_noop() {
        let mut tree = ReducerTree::new();
        tree.register(&path("a"), counter()).unwrap();
        assert!(!tree.unregister(&path("never.there")));
        assert!(!tree.unregister(&path("a.b")));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn unregister_prunes_empty_interior_nodes() {
        let mut tree = ReducerTree::new();
        tree.register(&path("a.b.c"), counter()).unwrap();
        assert!(tree.unregister(&path("a.b.c")));
        assert!(tree.is_empty());
        assert!(tree.root.children.is_empty());
    }

    #[test]
    fn fold_routes_to_exact_path_only() {
        let mut tree = ReducerTree::new();
        tree.register(&path("a.b"), counter()).unwrap();
        tree.register(&path("a.c"), counter()).unwrap();
        let root = tree.compose();

        let mut state = root.apply(
            Value::Null,
            &WrappedAction::wrap(Action::init(), path("a.b")),
        );
        state = root.apply(state, &WrappedAction::wrap(Action::init(), path("a.c")));
        state = root.apply(state, &WrappedAction::wrap(Action::bare("Inc"), path("a.b")));

        assert_eq!(state["a"]["b"]["count"], json!(1));
        assert_eq!(state["a"]["c"]["count"], json!(0));
    }

    #[test]
    fn fold_drops_actions_with_no_registered_node() {
        let mut tree = ReducerTree::new();
        tree.register(&path("a"), counter()).unwrap();
        let root = tree.compose();
        let state = root.apply(Value::Null, &WrappedAction::wrap(Action::init(), path("a")));
        let next = root.apply(
            state.clone(),
            &WrappedAction::wrap(Action::bare("Inc"), path("a.ghost")),
        );
        // `a` sees the residual kind `ghost.Inc` and ignores it
        assert_eq!(next, state);
    }

    #[test]
    fn composition_is_stable_under_new_registrations() {
        let mut tree = ReducerTree::new();
        tree.register(&path("a"), counter()).unwrap();
        let root = tree.compose();
        let mut state = root.apply(Value::Null, &WrappedAction::wrap(Action::init(), path("a")));
        state = root.apply(state, &WrappedAction::wrap(Action::bare("Inc"), path("a")));
        assert_eq!(state["a"]["count"], json!(1));

        // adding a nested reducer must not alter `a`'s own slice
        tree.register(&path("a.b"), counter()).unwrap();
        let root = tree.compose();
        let state = root.apply(state, &WrappedAction::wrap(Action::init(), path("a.b")));
        assert_eq!(state["a"]["count"], json!(1));
        assert_eq!(state["a"]["b"]["count"], json!(0));
    }

    #[test]
    fn compose_snapshot_ignores_later_mutations() {
        let mut tree = ReducerTree::new();
        tree.register(&path("a"), counter()).unwrap();
        let root = tree.compose();
        tree.unregister(&path("a"));

        // the earlier snapshot still routes to `a`
        let state = root.apply(Value::Null, &WrappedAction::wrap(Action::init(), path("a")));
        assert_eq!(state["a"]["count"], json!(0));
    }

    #[test]
    fn compose_reducers_runs_left_then_right() {
        let tag = |name: &'static str| -> Reducer {
            Arc::new(move |state, _| {
                let mut trail = state.as_str().unwrap_or("").to_string();
                trail.push_str(name);
                json!(trail)
            })
        };
        let chained = compose_reducers(tag("a"), tag("b"));
        assert_eq!(chained(Value::Null, &Action::bare("x")), json!("ab"));
    }
}
