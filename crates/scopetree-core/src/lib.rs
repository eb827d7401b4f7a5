//! Scopetree Core
//!
//! Core model for the scopetree hierarchical state-orchestration engine:
//! scope-path addressing, the scope-addressed reducer registry and its
//! composition into one root reducer, the action wrapping protocol, the
//! minimal hot-swappable store, and the async-operation lifecycle state
//! machine. Everything here is synchronous; the cooperative effect runner
//! lives in `scopetree-runtime`.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod action;
pub mod config;
pub mod errors;
pub mod kv;
pub mod lifecycle;
pub mod path;
pub mod store;
pub mod tree;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use action::{Action, WrappedAction, INIT_KIND};
pub use config::{ChannelConfig, RuntimeConfig};
pub use errors::{ScopeError, ScopeResult};
pub use lifecycle::{
    failed_action, handle_asyncs, handle_asyncs_with, parse_async_kind, request_action,
    succeeded_action, AsyncOptions, AsyncStage, ResourceDef,
};
pub use path::ScopePath;
pub use store::{Store, SubscriptionId};
pub use tree::{compose_reducers, create_reducer, Reducer, ReducerTree, RootReducer};
