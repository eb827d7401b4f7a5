//! Async Operation Lifecycle
//!
//! Every asynchronous call is tracked through three synthetic action kinds
//! derived from its resource name (`Async/{resource}/Request`,
//! `Async/{resource}/Succeeded`, `Async/{resource}/Failed`) and projected
//! into a `{pending, result, error}` slice by the reducer transform built
//! with [`handle_asyncs`].
//!
//! Invariants maintained per resource:
//! - `pending` is true strictly between a Request and its matching
//!   Succeeded/Failed.
//! - at most one of `result`/`error` is non-null once the call settles:
//!   Succeeded clears `error`, Failed clears `result`.
//! - a fresh Request flips `pending` only, keeping the previous outcome
//!   visible while the retry is in flight.

use crate::action::Action;
use crate::tree::Reducer;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Kind prefix shared by all lifecycle actions
pub const ASYNC_KIND_PREFIX: &str = "Async";

// ----------------------------------------------------------------------------
// Lifecycle Stages and Action Constructors
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncStage {
    Request,
    Succeeded,
    Failed,
}

impl AsyncStage {
    pub fn as_str(self) -> &'static str {
        match self {
            AsyncStage::Request => "Request",
            AsyncStage::Succeeded => "Succeeded",
            AsyncStage::Failed => "Failed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "Request" => Some(AsyncStage::Request),
            "Succeeded" => Some(AsyncStage::Succeeded),
            "Failed" => Some(AsyncStage::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for AsyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Async/{resource}/{stage}`
pub fn async_kind(resource: &str, stage: AsyncStage) -> String {
    format!("{ASYNC_KIND_PREFIX}/{resource}/{stage}")
}

pub fn request_action(resource: &str) -> Action {
    Action::bare(async_kind(resource, AsyncStage::Request))
}

pub fn succeeded_action(resource: &str, payload: Value) -> Action {
    Action::new(async_kind(resource, AsyncStage::Succeeded), payload)
}

pub fn failed_action(resource: &str, payload: Value) -> Action {
    Action::new(async_kind(resource, AsyncStage::Failed), payload)
}

/// Split an action kind back into `(resource, stage)`, if it is one of ours
pub fn parse_async_kind(kind: &str) -> Option<(&str, AsyncStage)> {
    let rest = kind.strip_prefix(ASYNC_KIND_PREFIX)?.strip_prefix('/')?;
    let (resource, stage) = rest.rsplit_once('/')?;
    if resource.is_empty() {
        return None;
    }
    Some((resource, AsyncStage::parse(stage)?))
}

// ----------------------------------------------------------------------------
// Resource Definitions
// ----------------------------------------------------------------------------

/// Payload transform applied before a result or error is stored
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Declarative description of one tracked async resource
#[derive(Clone, Default)]
pub struct ResourceDef {
    default_value: Option<Value>,
    result_transform: Option<Transform>,
    error_transform: Option<Transform>,
}

impl ResourceDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value seeded into `result` at initialization (defaults to null)
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_result_transform(
        mut self,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.result_transform = Some(Arc::new(transform));
        self
    }

    pub fn with_error_transform(
        mut self,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.error_transform = Some(Arc::new(transform));
        self
    }
}

/// Options for [`handle_asyncs_with`]
#[derive(Debug, Clone)]
pub struct AsyncOptions {
    /// Property of the owning slice under which resources live
    pub data_prop: String,
}

impl Default for AsyncOptions {
    fn default() -> Self {
        Self {
            data_prop: "data".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Reducer Transform
// ----------------------------------------------------------------------------

/// Build a reducer that initializes and maintains the lifecycle slices for
/// every declared resource, under the default `data` property.
pub fn handle_asyncs(defs: HashMap<String, ResourceDef>) -> Reducer {
    handle_asyncs_with(defs, AsyncOptions::default())
}

pub fn handle_asyncs_with(defs: HashMap<String, ResourceDef>, options: AsyncOptions) -> Reducer {
    Arc::new(move |state, action| {
        let mut state = if state.is_null() { json!({}) } else { state };

        if action.is_init() {
            for (resource, def) in &defs {
                let seed = json!({
                    "pending": false,
                    "result": def.default_value.clone().unwrap_or(Value::Null),
                    "error": Value::Null,
                });
                state[options.data_prop.as_str()][resource.as_str()] = seed;
            }
            return state;
        }

        let Some((resource, stage)) = parse_async_kind(&action.kind) else {
            return state;
        };
        let Some(def) = defs.get(resource) else {
            // lifecycle traffic for a resource this slice does not track
            return state;
        };

        let slot = &mut state[options.data_prop.as_str()][resource];
        match stage {
            AsyncStage::Request => {
                slot["pending"] = json!(true);
            }
            AsyncStage::Succeeded => {
                let result = match &def.result_transform {
                    Some(transform) => transform(action.payload.clone()),
                    None => action.payload.clone(),
                };
                slot["pending"] = json!(false);
                slot["result"] = result;
                slot["error"] = Value::Null;
            }
            AsyncStage::Failed => {
                let error = match &def.error_transform {
                    Some(transform) => transform(action.payload.clone()),
                    None => action.payload.clone(),
                };
                slot["pending"] = json!(false);
                slot["error"] = error;
                slot["result"] = Value::Null;
            }
        }
        state
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
