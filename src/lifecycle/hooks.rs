//! Lifecycle hooks
//!
//! User callbacks that run around each phase. `Before*` hooks are
//! fail-fast and abort the phase; `After*` hooks run to completion and have
//! their errors collected.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use strum_macros::{Display, EnumIter};
use tokio_util::sync::CancellationToken;

/// Moment at which hooks fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
pub enum HookPoint {
    BeforeInitialize,
    AfterInitialize,
    BeforeStart,
    AfterStart,
    BeforeShutdown,
    AfterShutdown,
}

/// A callback bound to a [`HookPoint`]
///
/// Implemented for any `Fn(CancellationToken) -> Future<Output = anyhow::Result<()>>`,
/// so closures returning an `async` block can be registered directly:
///
/// ```rust,ignore
/// app.register_hook(HookPoint::BeforeStart, |_ctx| async move {
///     tracing::info!("warming up");
///     Ok(())
/// });
/// ```
#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, ctx: &CancellationToken) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> Hook for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, ctx: &CancellationToken) -> anyhow::Result<()> {
        (self)(ctx.clone()).await
    }
}

/// Ordered hook lists, one per [`HookPoint`]
///
/// A dispatch works on a snapshot taken when it begins, so hooks registered
/// while a point is firing apply from the next dispatch of that point.
#[derive(Default)]
pub struct HookDispatcher {
    hooks: RwLock<HashMap<HookPoint, Vec<Arc<dyn Hook>>>>,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&self, point: HookPoint, hook: H)
    where
        H: Hook + 'static,
    {
        self.hooks.write().entry(point).or_default().push(Arc::new(hook));
    }

    pub fn count(&self, point: HookPoint) -> usize {
        self.hooks.read().get(&point).map_or(0, Vec::len)
    }

    fn snapshot(&self, point: HookPoint) -> Vec<Arc<dyn Hook>> {
        self.hooks.read().get(&point).cloned().unwrap_or_default()
    }

    /// Run hooks in order, stopping at the first failure.
    pub async fn dispatch_fail_fast(&self, point: HookPoint, ctx: &CancellationToken) -> Result<()> {
        let hooks = self.snapshot(point);
        tracing::debug!("Dispatching {} hooks ({})", point, hooks.len());

        for hook in hooks {
            hook.call(ctx).await.map_err(|e| {
                tracing::error!("{} hook failed: {}", point, e);
                AppError::hook(point, e)
            })?;
        }
        Ok(())
    }

    /// Run every hook and return the failures.
    pub async fn dispatch_collect(&self, point: HookPoint, ctx: &CancellationToken) -> Vec<AppError> {
        let hooks = self.snapshot(point);
        tracing::debug!("Dispatching {} hooks ({})", point, hooks.len());

        let mut errors = Vec::new();
        for hook in hooks {
            if let Err(e) = hook.call(ctx).await {
                // Log error but continue with other hooks
                tracing::warn!("{} hook failed: {}", point, e);
                errors.push(AppError::hook(point, e));
            }
        }
        errors
    }
}
