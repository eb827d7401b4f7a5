//! Error types for the scopetree core
//!
//! Structural errors (duplicate or unknown scopes) are local and non-fatal:
//! mount/unmount ordering in a dynamic tree cannot be fully serialized by
//! callers, so registration conflicts are rejected with a diagnostic and
//! teardown races degrade to no-ops. Async failures are turned into state
//! (see [`crate::lifecycle`]) rather than propagated as errors.

// ----------------------------------------------------------------------------
// Core Error Type
// ----------------------------------------------------------------------------

/// Errors raised by the scope registry and path utilities
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScopeError {
    /// A reducer is already registered at exactly this path; the existing
    /// reducer stays authoritative.
    #[error("additional scope is required for `{path}`: a reducer is already registered there")]
    DuplicateScope { path: String },

    /// Lookup or unregistration of a path that was never registered.
    #[error("no reducer registered at `{path}`")]
    UnknownScope { path: String },

    /// A scope string that cannot form a valid path (e.g. empty segment).
    #[error("invalid scope `{scope}`: {reason}")]
    InvalidScope { scope: String, reason: String },
}

pub type ScopeResult<T> = core::result::Result<T, ScopeError>;
