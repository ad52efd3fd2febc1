//! Structured logging
//!
//! [`TracingLogger`] is an `Infrastructure` component that installs a
//! `tracing-subscriber` formatter during Initialize and hands out
//! [`Logger`] handles scoped to the application span.

use crate::component::{Component, ComponentKind, LOGGER_COMPONENT, LoggerProvider};
use crate::context::AppContext;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{Level, Span};

/// Handle for emitting events inside a service span
#[derive(Clone, Debug)]
pub struct Logger {
    span: Span,
}

impl Logger {
    pub fn new(service: &str) -> Self {
        Self {
            span: tracing::info_span!("service", name = %service),
        }
    }

    pub fn from_span(span: Span) -> Self {
        Self { span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn debug(&self, message: &str) {
        self.span.in_scope(|| tracing::debug!("{}", message));
    }

    pub fn info(&self, message: &str) {
        self.span.in_scope(|| tracing::info!("{}", message));
    }

    pub fn warn(&self, message: &str) {
        self.span.in_scope(|| tracing::warn!("{}", message));
    }

    pub fn error(&self, message: &str) {
        self.span.in_scope(|| tracing::error!("{}", message));
    }
}

/// Logger component backed by the global `tracing` dispatcher
///
/// # Example
///
/// ```rust,ignore
/// let app = Application::builder("orders", "1.0.0")
///     .logger(TracingLogger::new().with_level(Level::DEBUG))
///     .build()?;
/// ```
pub struct TracingLogger {
    level: Level,
    install: bool,
    logger: RwLock<Option<Logger>>,
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingLogger {
    pub fn new() -> Self {
        Self {
            level: Level::INFO,
            install: true,
            logger: RwLock::new(None),
        }
    }

    /// Maximum level of the installed subscriber
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Leave the global subscriber alone (for embedders that configure
    /// `tracing` themselves).
    pub fn without_subscriber(mut self) -> Self {
        self.install = false;
        self
    }

    fn install_subscriber(&self) {
        let result = tracing_subscriber::fmt()
            .with_max_level(self.level)
            .with_target(true)
            .try_init();
        if result.is_err() {
            tracing::debug!("Global tracing subscriber already set; keeping it");
        }
    }
}

#[async_trait]
impl Component for TracingLogger {
    fn name(&self) -> &str {
        LOGGER_COMPONENT
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Infrastructure
    }

    async fn initialize(&self, _ctx: &CancellationToken, app: &AppContext) -> anyhow::Result<()> {
        if self.install {
            self.install_subscriber();
        }
        let span = tracing::info_span!(
            "app",
            name = %app.name(),
            version = %app.version(),
            instance = %app.instance_id()
        );
        *self.logger.write() = Some(Logger::from_span(span));
        Ok(())
    }
}

impl LoggerProvider for TracingLogger {
    /// Application-scoped logger once initialized, a plain service logger
    /// before that.
    fn logger(&self) -> Logger {
        self.logger
            .read()
            .clone()
            .unwrap_or_else(|| Logger::new(LOGGER_COMPONENT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppShared;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_logger_available_before_and_after_initialize() {
        let component = TracingLogger::new().without_subscriber();
        component.logger().info("before initialize");

        let ctx = AppContext::new(&Arc::new(AppShared::new("svc".into(), "0.1.0".into())));
        component
            .initialize(&CancellationToken::new(), &ctx)
            .await
            .unwrap();

        component.logger().info("after initialize");
        assert_eq!(component.name(), LOGGER_COMPONENT);
        assert_eq!(component.kind(), ComponentKind::Infrastructure);
    }

    #[tokio::test]
    async fn test_initialize_twice_keeps_existing_subscriber() {
        let ctx = AppContext::new(&Arc::new(AppShared::new("svc".into(), "0.1.0".into())));
        let token = CancellationToken::new();

        TracingLogger::new().initialize(&token, &ctx).await.unwrap();
        TracingLogger::new()
            .with_level(Level::DEBUG)
            .initialize(&token, &ctx)
            .await
            .unwrap();
    }
}
