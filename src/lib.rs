//! # Armature
//!
//! Application lifecycle and component registry for long-running Rust
//! services.
//!
//! An [`Application`] owns a set of named [`Component`]s, each tagged with a
//! [`ComponentKind`]. The lifecycle engine initializes and starts them in
//! kind order (Infrastructure, DataSource, Core, Web), stops them in exact
//! reverse, rolls back partially completed phases on failure, and reports
//! every state change to registered listeners.
//!
//! ## Features
//!
//! - **Component Registry**: unique names, kind-ordered startup and typed lookup
//! - **Lifecycle State Machine**: validated transitions with synchronous listeners
//! - **Hooks**: async callbacks around each phase
//! - **Rollback**: failed phases stop what they already brought up
//! - **Cancellation**: every phase honours a `CancellationToken`
//! - **Built-in Components**: config, tracing logger, memory cache and an axum HTTP server
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use armature::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = Application::builder("orders", "1.0.0")
//!         .config(ConfigService::new().with_env_prefix("ORDERS_"))
//!         .logger(TracingLogger::new())
//!         .component(MemoryCache::new("cache"))
//!         .component(HttpServer::new("http", "127.0.0.1:3000".parse()?))
//!         .build()?;
//!
//!     app.spawn_shutdown_handler();
//!     app.run(&CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod component;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod logging;

#[cfg(test)]
mod testing;

// Re-export core types
pub use component::{Component, ComponentInfo, ComponentKind, ComponentRegistry};
pub use context::{AppContext, AppStatus};
pub use error::{AggregateError, AppError, BoxError, Result};
pub use lifecycle::{AppState, Application, ApplicationBuilder, HookPoint, Phase};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;
pub use axum;
pub use tokio_util::sync::CancellationToken;

/// Prelude module for convenient imports
///
/// ```
/// use armature::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::MemoryCache;
    pub use crate::component::{
        Component, ComponentKind, ComponentRegistry, ConfigProvider, HttpServerProvider,
        LoggerProvider,
    };
    pub use crate::config::ConfigService;
    pub use crate::context::{AppContext, AppStatus};
    pub use crate::error::{AppError, Result};
    pub use crate::http::HttpServer;
    pub use crate::lifecycle::{
        AppState, Application, ApplicationBuilder, Hook, HookPoint, Phase, shutdown_signal,
    };
    pub use crate::logging::{Logger, TracingLogger};
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
    pub use tokio_util::sync::CancellationToken;
}
