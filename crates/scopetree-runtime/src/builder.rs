//! Runtime Builder API
//!
//! Builder-style construction for consumers (UI bindings, tests) that need
//! to tune the channel sizes, pruning policy, or install a static reducer
//! that runs on the whole root state before the tree fold.

use crate::runtime::ScopeRuntime;
use scopetree_core::tree::Reducer;
use scopetree_core::{ChannelConfig, RuntimeConfig};
use std::sync::Arc;

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    static_reducer: Option<Reducer>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_channels(mut self, channels: ChannelConfig) -> Self {
        self.config.channels = channels;
        self
    }

    /// Whether unregistering a scope also removes its state slice
    /// (default: true)
    pub fn prune_on_unregister(mut self, enabled: bool) -> Self {
        self.config.prune_on_unregister = enabled;
        self
    }

    /// Install a reducer that runs on the whole root state, before the
    /// scope-tree composition, on every dispatch
    pub fn with_static_reducer(mut self, reducer: Reducer) -> Self {
        self.static_reducer = Some(reducer);
        self
    }

    pub fn build(self) -> Arc<ScopeRuntime> {
        ScopeRuntime::with_static_reducer(self.config, self.static_reducer)
    }
}
