//! Lifecycle Engine
//!
//! Drives the application through Initialize, Start and Stop. Phases run
//! one at a time and components are processed one at a time, lower kinds
//! first on the way up and in exact reverse on the way down.

use super::{AppState, Application, Deadline, FailureRecord, HookPoint, Phase};
use crate::component::Component;
use crate::context::AppContext;
use crate::error::{AppError, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

impl Application {
    /// Initialize every component in startup order.
    ///
    /// On failure the application enters `Failed`, the components already
    /// initialized are stopped in reverse order, and the originating error
    /// is returned. Errors from `AfterInitialize` hooks are returned as an
    /// aggregate but leave the application `Initialized`.
    pub async fn initialize(&self, ctx: &CancellationToken) -> Result<()> {
        let after = self.initialize_phase(ctx).await?;
        AppError::aggregate(after).map_or(Ok(()), Err)
    }

    /// Start every component in startup order.
    ///
    /// On failure the application enters `Failed` and the components
    /// started so far are stopped in reverse order.
    pub async fn start(&self, ctx: &CancellationToken) -> Result<()> {
        let after = self.start_phase(ctx).await?;
        AppError::aggregate(after).map_or(Ok(()), Err)
    }

    /// Stop every live component in shutdown order.
    ///
    /// Accepted from `Initialized`, `Running` and `Failed`. From `Created`,
    /// `Stopping` or `Stopped` this is a no-op. A component is live from a
    /// successful Initialize until it is stopped, either here or by the
    /// rollback of a failed phase, so after a failure only the components
    /// rollback did not reach are stopped. Component and hook errors are
    /// collected and returned together once the application is `Stopped`.
    pub async fn stop(&self, ctx: &CancellationToken) -> Result<()> {
        let _phase = self.phase.lock().await;

        match self.state() {
            AppState::Initialized | AppState::Running | AppState::Failed => {}
            AppState::Created | AppState::Stopping | AppState::Stopped => {
                tracing::debug!(app = %self.name(), state = %self.state(), "Stop ignored");
                return Ok(());
            }
            state => {
                return Err(AppError::IllegalState {
                    operation: "stop",
                    state,
                });
            }
        }

        tracing::info!(app = %self.name(), "Shutting down application...");
        self.transition(AppState::Stopping)?;

        let mut errors = self.hooks.dispatch_collect(HookPoint::BeforeShutdown, ctx).await;

        let mut components = std::mem::take(&mut *self.live.lock());
        components.reverse();
        for component in &components {
            tracing::debug!("Stopping: {}", component.name());
            if let Err(e) = component.stop(ctx).await {
                // Log error but continue with other components
                tracing::error!("Stop failed for {}: {}", component.name(), e);
                errors.push(AppError::component(component.name(), Phase::Stop, e));
            }
        }

        errors.extend(self.hooks.dispatch_collect(HookPoint::AfterShutdown, ctx).await);
        self.transition(AppState::Stopped)?;

        tracing::info!(
            "Application shutdown complete ({} components, {} errors)",
            components.len(),
            errors.len()
        );
        AppError::aggregate(errors).map_or(Ok(()), Err)
    }

    /// Initialize, start, wait for cancellation, then stop.
    ///
    /// Waits on both `ctx` and the application's own handle (see
    /// [`shutdown`](Self::shutdown) and
    /// [`spawn_shutdown_handler`](Self::spawn_shutdown_handler)). The stop
    /// phase runs with a fresh token so that components can finish their
    /// shutdown work. Returns the error that ended the application, or
    /// `Ok` after a clean shutdown.
    pub async fn run(&self, ctx: &CancellationToken) -> Result<()> {
        let app_token = self.cancellation_token();

        let deadline = self.init_timeout.map(|t| Deadline::new(ctx, t));
        let after = self
            .initialize_phase(deadline.as_ref().map_or(ctx, Deadline::token))
            .await
            .map_err(|e| deadline_error(e, deadline.as_ref(), Phase::Initialize))?;
        drop(deadline);
        self.log_after_hook_errors(HookPoint::AfterInitialize, after);

        let deadline = self.start_timeout.map(|t| Deadline::new(ctx, t));
        let after = self
            .start_phase(deadline.as_ref().map_or(ctx, Deadline::token))
            .await
            .map_err(|e| deadline_error(e, deadline.as_ref(), Phase::Start))?;
        drop(deadline);
        self.log_after_hook_errors(HookPoint::AfterStart, after);

        tracing::info!(app = %self.name(), version = %self.version(), "Application running");
        tokio::select! {
            _ = ctx.cancelled() => {}
            _ = app_token.cancelled() => {}
        }

        self.stop(&CancellationToken::new()).await
    }

    /// Return a `Stopped` or `Failed` application to `Created`.
    ///
    /// Components are kept and will be initialized again by the next
    /// `initialize`; they must support that to be reused.
    pub async fn reset(&self) -> Result<()> {
        let _phase = self.phase.lock().await;

        let state = self.state();
        if !state.is_terminal() {
            return Err(AppError::IllegalState {
                operation: "reset",
                state,
            });
        }

        self.transition(AppState::Created)?;
        *self.failure.lock() = None;
        self.live.lock().clear();
        *self.shared.started_at.lock() = None;
        let mut token = self.token.lock();
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
        Ok(())
    }

    // ---- phases -------------------------------------------------------

    /// Returns the collected `AfterInitialize` errors on success.
    async fn initialize_phase(&self, ctx: &CancellationToken) -> Result<Vec<AppError>> {
        let _phase = self.phase.lock().await;

        let state = self.state();
        if state != AppState::Created {
            return Err(AppError::IllegalState {
                operation: "initialize",
                state,
            });
        }

        tracing::info!(app = %self.name(), "Starting application initialization...");
        self.transition(AppState::Initializing)?;

        if let Err(e) = self.before_hooks(HookPoint::BeforeInitialize, ctx).await {
            return Err(self.fail(Phase::Initialize, e, &[], ctx).await);
        }

        let components = self.shared.registry.read().startup_order();
        let app_ctx = self.context();
        let (advanced, outcome) = self
            .advance(Phase::Initialize, &components, ctx, &app_ctx)
            .await;
        if let Err(e) = outcome {
            return Err(self.fail(Phase::Initialize, e, &components[..advanced], ctx).await);
        }

        *self.live.lock() = components;
        self.transition(AppState::Initialized)?;
        tracing::info!("Application initialization complete ({} components)", advanced);
        Ok(self.hooks.dispatch_collect(HookPoint::AfterInitialize, ctx).await)
    }

    /// Returns the collected `AfterStart` errors on success.
    async fn start_phase(&self, ctx: &CancellationToken) -> Result<Vec<AppError>> {
        let _phase = self.phase.lock().await;

        let state = self.state();
        if state != AppState::Initialized {
            return Err(AppError::IllegalState {
                operation: "start",
                state,
            });
        }

        tracing::info!(app = %self.name(), "Starting application...");
        self.transition(AppState::Starting)?;

        if let Err(e) = self.before_hooks(HookPoint::BeforeStart, ctx).await {
            return Err(self.fail(Phase::Start, e, &[], ctx).await);
        }

        let components = self.shared.registry.read().startup_order();
        let app_ctx = self.context();
        let (advanced, outcome) = self
            .advance(Phase::Start, &components, ctx, &app_ctx)
            .await;
        if let Err(e) = outcome {
            // The started prefix is rolled back; the rest stay initialized.
            *self.live.lock() = components[advanced..].to_vec();
            return Err(self.fail(Phase::Start, e, &components[..advanced], ctx).await);
        }

        *self.shared.started_at.lock() = Some(Utc::now());
        self.transition(AppState::Running)?;
        tracing::info!("Application started ({} components)", advanced);
        Ok(self.hooks.dispatch_collect(HookPoint::AfterStart, ctx).await)
    }

    // ---- helpers ------------------------------------------------------

    fn is_cancelled(&self, ctx: &CancellationToken) -> bool {
        ctx.is_cancelled() || self.token.lock().is_cancelled()
    }

    fn check_cancelled(&self, ctx: &CancellationToken) -> Result<()> {
        if self.is_cancelled(ctx) {
            Err(AppError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn transition(&self, next: AppState) -> Result<()> {
        self.shared.observer.set_state(next).map(|_| ())
    }

    async fn before_hooks(&self, point: HookPoint, ctx: &CancellationToken) -> Result<()> {
        self.check_cancelled(ctx)?;
        self.hooks.dispatch_fail_fast(point, ctx).await
    }

    /// Apply `phase` to `components` in order until one fails or the
    /// handle is cancelled. Returns how many components completed the
    /// operation together with the outcome.
    async fn advance(
        &self,
        phase: Phase,
        components: &[Arc<dyn Component>],
        ctx: &CancellationToken,
        app_ctx: &AppContext,
    ) -> (usize, Result<()>) {
        for (done, component) in components.iter().enumerate() {
            if let Err(e) = self.check_cancelled(ctx) {
                return (done, Err(e));
            }

            tracing::debug!(
                component = %component.name(),
                kind = %component.kind(),
                "{} component",
                phase
            );
            let result = match phase {
                Phase::Initialize => component.initialize(ctx, app_ctx).await,
                Phase::Start => component.start(ctx).await,
                Phase::Stop => component.stop(ctx).await,
            };
            if let Err(e) = result {
                tracing::error!("{} failed for {}: {}", phase, component.name(), e);
                return (done, Err(AppError::component(component.name(), phase, e)));
            }
        }

        (components.len(), self.check_cancelled(ctx))
    }

    /// Enter `Failed`, roll back `advanced` in reverse, record the failure
    /// and hand back the originating error.
    async fn fail(
        &self,
        phase: Phase,
        error: AppError,
        advanced: &[Arc<dyn Component>],
        ctx: &CancellationToken,
    ) -> AppError {
        tracing::error!(app = %self.name(), "{} phase failed: {}", phase, error);
        if let Err(e) = self.transition(AppState::Failed) {
            self.shared.observer.report_error(&e.to_string());
        }

        let rollback_errors = self.rollback(phase, advanced, ctx).await;
        *self.failure.lock() = Some(FailureRecord {
            phase,
            error: error.to_string(),
            rollback_errors,
        });
        error
    }

    /// Best-effort stop of `advanced` in reverse order.
    ///
    /// A cancelled handle is replaced by a fresh one so that rollback can
    /// still complete.
    async fn rollback(
        &self,
        phase: Phase,
        advanced: &[Arc<dyn Component>],
        ctx: &CancellationToken,
    ) -> Vec<String> {
        let stop_ctx = if self.is_cancelled(ctx) {
            CancellationToken::new()
        } else {
            ctx.clone()
        };

        let mut errors = Vec::new();
        for component in advanced.iter().rev() {
            tracing::debug!("Rolling back {}: {}", phase, component.name());
            if let Err(e) = component.stop(&stop_ctx).await {
                let message = format!(
                    "rollback of {} failed for {}: {}",
                    phase,
                    component.name(),
                    e
                );
                self.shared.observer.report_error(&message);
                errors.push(message);
            }
        }
        errors
    }

    fn log_after_hook_errors(&self, point: HookPoint, errors: Vec<AppError>) {
        for e in errors {
            tracing::warn!(app = %self.name(), "{} hook error ignored by run: {}", point, e);
        }
    }
}

/// Report a cancellation caused by an expired deadline as a timeout.
fn deadline_error(error: AppError, deadline: Option<&Deadline>, phase: Phase) -> AppError {
    match deadline {
        Some(deadline) if error.is_cancelled() && deadline.expired() => AppError::Timeout {
            phase,
            timeout: deadline.timeout(),
        },
        _ => error,
    }
}
