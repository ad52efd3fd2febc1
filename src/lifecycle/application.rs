//! Application Bootstrap
//!
//! The [`Application`] owns the component registry, the state observer, the
//! hook table and the lifecycle cancellation handle. Configuration methods
//! are only accepted while the application is `Created`; introspection is
//! available at any time.

use super::{AppState, Hook, HookDispatcher, HookPoint, Phase, cancel_on_signal};
use crate::component::{
    CONFIG_COMPONENT, Component, ComponentKind, ComponentRegistry, ConfigProvider,
    LOGGER_COMPONENT, LoggerProvider,
};
use crate::context::{AppContext, AppShared, AppStatus};
use crate::error::{AppError, Result};
use crate::logging::Logger;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What went wrong in the last failed phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub phase: Phase,
    pub error: String,
    /// Errors returned by components while rolling the phase back
    pub rollback_errors: Vec<String>,
}

/// A managed application: components, lifecycle state, hooks and listeners
///
/// All methods take `&self`; wrap the application in an `Arc` to drive it
/// from several tasks.
///
/// # Example
///
/// ```rust,ignore
/// use armature::prelude::*;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let app = Application::new("orders", "1.4.0");
///     app.set_config(Arc::new(ConfigService::new().with_env_prefix("ORDERS_")))?;
///     app.set_logger(Arc::new(TracingLogger::new()))?;
///     app.register(Arc::new(MemoryCache::new("cache")))?;
///
///     app.spawn_shutdown_handler();
///     app.run(&CancellationToken::new()).await?;
///     Ok(())
/// }
/// ```
pub struct Application {
    pub(super) shared: Arc<AppShared>,
    pub(super) hooks: HookDispatcher,
    pub(super) phase: tokio::sync::Mutex<()>,
    pub(super) token: Mutex<CancellationToken>,
    pub(super) failure: Mutex<Option<FailureRecord>>,
    /// Initialized and not yet stopped, in startup order
    pub(super) live: Mutex<Vec<Arc<dyn Component>>>,
    pub(super) init_timeout: Option<Duration>,
    pub(super) start_timeout: Option<Duration>,
    config: RwLock<Option<Arc<dyn ConfigProvider>>>,
    logger: RwLock<Option<Arc<dyn LoggerProvider>>>,
}

impl Application {
    /// Create an application in state `Created` with an empty registry.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(AppShared::new(name.into(), version.into())),
            hooks: HookDispatcher::new(),
            phase: tokio::sync::Mutex::new(()),
            token: Mutex::new(CancellationToken::new()),
            failure: Mutex::new(None),
            live: Mutex::new(Vec::new()),
            init_timeout: None,
            start_timeout: None,
            config: RwLock::new(None),
            logger: RwLock::new(None),
        }
    }

    /// Create a new application builder
    pub fn builder(name: impl Into<String>, version: impl Into<String>) -> ApplicationBuilder {
        ApplicationBuilder::new(name, version)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn version(&self) -> &str {
        &self.shared.version
    }

    pub fn instance_id(&self) -> Uuid {
        self.shared.instance_id
    }

    fn require_created(&self, operation: &'static str) -> Result<()> {
        match self.state() {
            AppState::Created => Ok(()),
            state => Err(AppError::IllegalState { operation, state }),
        }
    }

    // ---- configuration ------------------------------------------------

    /// Register a component under its own name.
    pub fn register<C: Component>(&self, component: Arc<C>) -> Result<()> {
        let mut registry = self.shared.registry.write();
        self.require_created("register a component")?;
        tracing::debug!(
            component = %component.name(),
            kind = %component.kind(),
            "registering component"
        );
        registry.register(component)
    }

    /// Register the configuration provider under the name `config`.
    pub fn set_config<C: ConfigProvider>(&self, config: Arc<C>) -> Result<()> {
        let mut registry = self.shared.registry.write();
        self.require_created("set the config provider")?;
        registry.register_named(CONFIG_COMPONENT, Arc::clone(&config))?;
        let provider: Arc<dyn ConfigProvider> = config;
        *self.config.write() = Some(provider);
        Ok(())
    }

    /// Register the logger under the name `logger`. Listener panics and
    /// rollback failures are reported through it from then on.
    pub fn set_logger<L: LoggerProvider>(&self, logger: Arc<L>) -> Result<()> {
        let mut registry = self.shared.registry.write();
        self.require_created("set the logger")?;
        registry.register_named(LOGGER_COMPONENT, Arc::clone(&logger))?;
        let provider: Arc<dyn LoggerProvider> = logger;
        self.shared.observer.set_logger(Some(&provider));
        *self.logger.write() = Some(provider);
        Ok(())
    }

    /// Replace the registry with one assembled elsewhere.
    ///
    /// Everything registered before, including the config and logger
    /// shortcuts, is discarded.
    pub fn set_component_manager(&self, registry: ComponentRegistry) -> Result<()> {
        let mut current = self.shared.registry.write();
        self.require_created("replace the component registry")?;
        *current = registry;
        *self.config.write() = None;
        *self.logger.write() = None;
        self.shared.observer.set_logger(None);
        Ok(())
    }

    pub fn register_hook<H>(&self, point: HookPoint, hook: H)
    where
        H: Hook + 'static,
    {
        self.hooks.register(point, hook);
    }

    pub fn register_state_change_listener<F>(&self, listener: F)
    where
        F: Fn(&str, AppState, AppState) + Send + Sync + 'static,
    {
        self.shared.observer.register_listener(listener);
    }

    // ---- introspection ------------------------------------------------

    pub fn get_component(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.shared.registry.read().get(name)
    }

    /// Look up a component by name and downcast it to its concrete type.
    pub fn get_component_as<T: Component>(&self, name: &str) -> Option<Arc<T>> {
        self.shared.registry.read().get_as::<T>(name)
    }

    /// First registered component of `kind`
    pub fn get_component_by_type(&self, kind: ComponentKind) -> Option<Arc<dyn Component>> {
        self.shared.registry.read().get_by_kind(kind)
    }

    pub fn get_components_by_type(&self, kind: ComponentKind) -> Vec<Arc<dyn Component>> {
        self.shared.registry.read().list_by_kind(kind)
    }

    pub fn state(&self) -> AppState {
        self.shared.observer.state()
    }

    pub fn status(&self) -> AppStatus {
        self.shared.status()
    }

    /// Read-only view handed to components during Initialize
    pub fn context(&self) -> AppContext {
        AppContext::new(&self.shared)
    }

    pub fn config(&self) -> Option<Arc<dyn ConfigProvider>> {
        self.config.read().clone()
    }

    pub fn logger(&self) -> Option<Logger> {
        self.logger.read().as_ref().map(|provider| provider.logger())
    }

    /// Originating error and rollback errors of the last failed phase
    pub fn failure(&self) -> Option<FailureRecord> {
        self.failure.lock().clone()
    }

    pub fn hook_count(&self, point: HookPoint) -> usize {
        self.hooks.count(point)
    }

    // ---- cancellation -------------------------------------------------

    /// The application's lifecycle handle; cancelling it makes `run` stop.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.lock().clone()
    }

    /// Request shutdown of a running `run` call.
    pub fn shutdown(&self) {
        tracing::info!(app = %self.name(), "Shutdown requested");
        self.token.lock().cancel();
    }

    /// Spawn a background task that cancels the lifecycle handle on
    /// Ctrl+C or SIGTERM.
    pub fn spawn_shutdown_handler(&self) -> tokio::task::JoinHandle<()> {
        cancel_on_signal(self.cancellation_token())
    }
}

/// Builder for Application
///
/// Applies each step immediately and reports the first failure from
/// [`build`](ApplicationBuilder::build).
pub struct ApplicationBuilder {
    app: Application,
    error: Option<AppError>,
}

impl ApplicationBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            app: Application::new(name, version),
            error: None,
        }
    }

    fn apply(mut self, step: impl FnOnce(&Application) -> Result<()>) -> Self {
        if self.error.is_none() {
            if let Err(e) = step(&self.app) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn config<C: ConfigProvider>(self, config: C) -> Self {
        self.apply(|app| app.set_config(Arc::new(config)))
    }

    pub fn logger<L: LoggerProvider>(self, logger: L) -> Self {
        self.apply(|app| app.set_logger(Arc::new(logger)))
    }

    pub fn component<C: Component>(self, component: C) -> Self {
        self.apply(|app| app.register(Arc::new(component)))
    }

    /// Start from a pre-assembled registry; earlier steps are discarded.
    pub fn registry(self, registry: ComponentRegistry) -> Self {
        self.apply(|app| app.set_component_manager(registry))
    }

    pub fn hook<H: Hook + 'static>(self, point: HookPoint, hook: H) -> Self {
        self.app.register_hook(point, hook);
        self
    }

    pub fn listener<F>(self, listener: F) -> Self
    where
        F: Fn(&str, AppState, AppState) + Send + Sync + 'static,
    {
        self.app.register_state_change_listener(listener);
        self
    }

    /// Deadline applied to the Initialize phase by `run`
    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.app.init_timeout = Some(timeout);
        self
    }

    /// Deadline applied to the Start phase by `run`
    pub fn start_timeout(mut self, timeout: Duration) -> Self {
        self.app.start_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<Application> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.app),
        }
    }
}
