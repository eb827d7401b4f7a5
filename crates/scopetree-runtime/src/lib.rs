//! Scopetree Runtime Engine
//!
//! This crate contains the orchestration engine over `scopetree-core`:
//! - [`ScopeRuntime`]: registration, recomposition, init seeding, pruning
//! - [`ScopeHandle`]: explicit per-scope context passing for callers
//! - [`EffectRunner`] / [`EffectContext`]: cooperative, cancellable effect
//!   programs scheduled per scope
//!
//! ```rust,no_run
//! use scopetree_runtime::RuntimeBuilder;
//! use scopetree_core::{create_reducer, Action};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = RuntimeBuilder::new().build();
//! let counter = runtime.handle().child("app.counter")?;
//! counter.register(create_reducer(json!({"count": 0}), |state, action| {
//!     if action.kind == "Inc" {
//!         let next = state["count"].as_i64().unwrap_or(0) + 1;
//!         state["count"] = json!(next);
//!     }
//! }))?;
//! counter.dispatch(Action::bare("Inc"));
//! assert_eq!(counter.local_state(), Some(json!({"count": 1})));
//! # Ok(())
//! # }
//! ```

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod builder;
pub mod context;
pub mod handle;
pub mod program;
pub mod runner;
pub mod runtime;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use builder::RuntimeBuilder;
pub use context::EffectContext;
pub use handle::{ScopeHandle, Subscription};
pub use program::{fetch_on_every, ActionPattern, EffectError, EffectProgram, EffectResult};
pub use runner::EffectRunner;
pub use runtime::ScopeRuntime;

// Re-export core types for convenience
pub use scopetree_core::{
    create_reducer, handle_asyncs, Action, ChannelConfig, Reducer, RuntimeConfig, ScopeError,
    ScopePath, ScopeResult, WrappedAction,
};
