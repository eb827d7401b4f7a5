//! Effect Programs
//!
//! An effect program is a cooperative, cancellable side-effect task bound
//! to a scope: it suspends on "wait for a matching action", "wait N
//! milliseconds" or "await an external call", and may dispatch actions or
//! fork concurrent sub-tasks through its [`crate::context::EffectContext`].
//! Programs are plain async closures over the context; the suspend/resume
//! contract is explicit rather than generator-based.

use crate::context::EffectContext;
use futures::future::BoxFuture;
use scopetree_core::lifecycle::ASYNC_KIND_PREFIX;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;

// ----------------------------------------------------------------------------
// Errors
// ----------------------------------------------------------------------------

/// Failure modes of a running effect program. A fault terminates that
/// program only; the store and sibling programs are unaffected.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EffectError {
    /// The owning scope unregistered; no further dispatches are allowed.
    #[error("effect program cancelled")]
    Cancelled,

    /// The store's action feed closed underneath the program.
    #[error("action feed closed")]
    FeedClosed,

    /// Program-defined failure.
    #[error("effect program fault: {0}")]
    Fault(String),
}

pub type EffectResult<T> = core::result::Result<T, EffectError>;

// ----------------------------------------------------------------------------
// Program Trait
// ----------------------------------------------------------------------------

/// A runnable effect program. Implemented for every async closure taking an
/// [`EffectContext`], so programs are written as plain `async` blocks.
pub trait EffectProgram: Send + 'static {
    fn run(self: Box<Self>, ctx: EffectContext) -> BoxFuture<'static, EffectResult<()>>;
}

impl<F, Fut> EffectProgram for F
where
    F: FnOnce(EffectContext) -> Fut + Send + 'static,
    Fut: Future<Output = EffectResult<()>> + Send + 'static,
{
    fn run(self: Box<Self>, ctx: EffectContext) -> BoxFuture<'static, EffectResult<()>> {
        Box::pin((*self)(ctx))
    }
}

// ----------------------------------------------------------------------------
// Action Patterns
// ----------------------------------------------------------------------------

/// Matcher used by [`EffectContext::take`] to select the next action
#[derive(Debug, Clone)]
pub enum ActionPattern {
    /// Any action at all
    Any,
    /// Any action with this exact kind, regardless of origin scope
    Kind(String),
    /// Any action whose kind is one of these
    Kinds(Vec<String>),
    /// An action with this kind wrapped at exactly this scope
    Scoped {
        scope: scopetree_core::ScopePath,
        kind: String,
    },
    /// Any lifecycle action (`Async/...`)
    AnyAsync,
}

impl ActionPattern {
    pub fn kind(kind: impl Into<String>) -> Self {
        Self::Kind(kind.into())
    }

    pub fn matches(&self, wrapped: &scopetree_core::WrappedAction) -> bool {
        match self {
            ActionPattern::Any => true,
            ActionPattern::Kind(kind) => wrapped.action.kind == *kind,
            ActionPattern::Kinds(kinds) => kinds.iter().any(|k| wrapped.action.kind == *k),
            ActionPattern::Scoped { scope, kind } => {
                wrapped.scope == *scope && wrapped.action.kind == *kind
            }
            ActionPattern::AnyAsync => wrapped
                .action
                .kind
                .starts_with(&format!("{ASYNC_KIND_PREFIX}/")),
        }
    }
}

// ----------------------------------------------------------------------------
// Combinators
// ----------------------------------------------------------------------------

/// A program that, on every action matching `pattern`, runs the async
/// lifecycle for `resource` around a fresh invocation of `fetch`.
pub fn fetch_on_every<F, Fut, T, E>(
    pattern: ActionPattern,
    resource: impl Into<String>,
    fetch: F,
) -> impl EffectProgram
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize + Send + 'static,
    E: Display + Send + 'static,
{
    let resource = resource.into();
    move |mut ctx: EffectContext| async move {
        loop {
            ctx.take(&pattern).await?;
            ctx.run_async(&resource, fetch()).await?;
        }
    }
}
