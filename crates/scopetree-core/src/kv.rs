//! Named-Value Reducer
//!
//! A ready-made reducer for scopes that only need a bag of named values,
//! mutated through a single `SetValue` action. Values live under the
//! `values` property of the owning slice.

use crate::action::Action;
use crate::tree::{create_reducer, Reducer};
use serde_json::{json, Value};

/// Action kind recognized by [`kv_reducer`]
pub const SET_VALUE_KIND: &str = "SetValue";

/// Build the `SetValue` action for one named value
pub fn set_value(name: impl Into<String>, value: Value) -> Action {
    Action::new(SET_VALUE_KIND, json!({"name": name.into(), "value": value}))
}

/// Reducer storing named values under `values.{name}`
pub fn kv_reducer() -> Reducer {
    create_reducer(json!({"values": {}}), |state, action| {
        if action.kind != SET_VALUE_KIND {
            return;
        }
        let (Some(name), Some(value)) = (
            action.payload.get("name").and_then(Value::as_str),
            action.payload.get("value"),
        ) else {
            return;
        };
        state["values"][name] = value.clone();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_value_updates_named_slot() {
        let reducer = kv_reducer();
        let state = reducer(Value::Null, &Action::init());
        let state = reducer(state, &set_value("theme", json!("dark")));
        let state = reducer(state, &set_value("page", json!(3)));
        assert_eq!(state, json!({"values": {"theme": "dark", "page": 3}}));
    }

    #[test]
    fn malformed_payload_is_ignored() {
        let reducer = kv_reducer();
        let state = reducer(Value::Null, &Action::init());
        let next = reducer(state.clone(), &Action::new(SET_VALUE_KIND, json!({"nope": 1})));
        assert_eq!(next, state);
    }
}
