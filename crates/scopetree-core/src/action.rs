//! Actions and Scope Routing
//!
//! An [`Action`] is the unit of intent applied to the state tree. Scoped
//! callers dispatch plain local actions; the router wraps them with their
//! dispatch-origin path ([`WrappedAction`]) before they enter the shared
//! store, so a nested unit never sees the global path structure.
//!
//! Routing is relative: a reducer registered at path `P` receives an action
//! wrapped at `P` with its bare kind, while an ancestor at a prefix of `P`
//! sees the residual path dot-prefixed onto the kind (`"counter.Inc"`).
//! Plain reducers therefore match only exact-path traffic and silently
//! ignore descendant actions, which is exactly the fan-out rule the tree
//! fold in [`crate::tree`] implements.

use crate::path::ScopePath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved action kind dispatched once per newly registered path
pub const INIT_KIND: &str = "@@INIT";

// ----------------------------------------------------------------------------
// Action
// ----------------------------------------------------------------------------

/// A plain action: a kind tag plus an arbitrary JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// An action with no payload
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// The initialization action seeding lazily-mounted state
    pub fn init() -> Self {
        Self::bare(INIT_KIND)
    }

    pub fn is_init(&self) -> bool {
        self.kind == INIT_KIND
    }
}

// ----------------------------------------------------------------------------
// WrappedAction
// ----------------------------------------------------------------------------

/// An action annotated with the scope path it was dispatched from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedAction {
    pub scope: ScopePath,
    pub action: Action,
}

impl WrappedAction {
    /// Attach the dispatch-origin path to an action
    pub fn wrap(action: Action, scope: ScopePath) -> Self {
        Self { scope, action }
    }

    /// Wrap at the root scope
    pub fn root(action: Action) -> Self {
        Self::wrap(action, ScopePath::root())
    }

    /// The action as seen by a reducer `depth` segments into the wrapped
    /// scope: residual segments are dot-prefixed onto the kind.
    pub fn action_relative_to(&self, depth: usize) -> Action {
        let residual = &self.scope.segments()[depth.min(self.scope.len())..];
        if residual.is_empty() {
            self.action.clone()
        } else {
            Action::new(
                format!("{}.{}", residual.join("."), self.action.kind),
                self.action.payload.clone(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relative_action_at_own_depth_is_bare() {
        let wrapped = WrappedAction::wrap(
            Action::new("Inc", json!(1)),
            ScopePath::split("a.b").unwrap(),
        );
        let local = wrapped.action_relative_to(2);
        assert_eq!(local.kind, "Inc");
        assert_eq!(local.payload, json!(1));
    }

    #[test]
    fn relative_action_for_ancestors_carries_residual_path() {
        let wrapped = WrappedAction::wrap(Action::bare("Inc"), ScopePath::split("a.b").unwrap());
        assert_eq!(wrapped.action_relative_to(0).kind, "a.b.Inc");
        assert_eq!(wrapped.action_relative_to(1).kind, "b.Inc");
    }

    #[test]
    fn action_serializes_with_type_tag() {
        let action = Action::new("Ping", json!({"n": 1}));
        let encoded = serde_json::to_value(&action).unwrap();
        assert_eq!(encoded, json!({"type": "Ping", "payload": {"n": 1}}));
    }
}
