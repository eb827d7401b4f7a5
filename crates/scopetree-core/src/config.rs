//! Runtime Configuration
//!
//! Consolidates the tunables of the orchestration core: channel capacity
//! for the action feed and the state-pruning policy applied when a scope
//! unregisters.

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Buffer sizes for the broadcast feed carrying dispatched actions from the
/// store to effect programs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Capacity of the action broadcast channel; programs that fall more
    /// than this many actions behind observe a lag and skip ahead.
    pub action_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            action_buffer_size: 128, // dispatch bursts are short-lived
        }
    }
}

// ----------------------------------------------------------------------------
// Runtime Configuration
// ----------------------------------------------------------------------------

/// Top-level configuration for a [`crate::store::Store`]-backed runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub channels: ChannelConfig,
    /// Whether unregistering a scope also removes its state slice.
    /// The source lineage of this behavior is ambiguous; pruning is the
    /// default here so no orphaned branches outlive their owners.
    pub prune_on_unregister: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channels: ChannelConfig::default(),
            prune_on_unregister: true,
        }
    }
}

impl RuntimeConfig {
    /// Keep state slices of unregistered scopes in place
    pub fn retain_state() -> Self {
        Self {
            prune_on_unregister: false,
            ..Self::default()
        }
    }
}
