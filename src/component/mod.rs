//! Component contract
//!
//! Every managed subsystem (configuration, logging, data sources, caches,
//! HTTP servers, ...) implements [`Component`]. The application drives
//! components through Initialize, Start and Stop in an order derived from
//! their [`ComponentKind`].
//!
//! # Example
//!
//! ```rust,ignore
//! use armature::prelude::*;
//!
//! pub struct Database {
//!     pool: parking_lot::Mutex<Option<Pool>>,
//! }
//!
//! #[async_trait]
//! impl Component for Database {
//!     fn name(&self) -> &str {
//!         "database"
//!     }
//!
//!     fn kind(&self) -> ComponentKind {
//!         ComponentKind::DataSource
//!     }
//!
//!     async fn initialize(&self, _ctx: &CancellationToken, app: &AppContext) -> anyhow::Result<()> {
//!         let config = app.get_as::<ConfigService>(CONFIG_COMPONENT);
//!         // read the DSN, prepare (but do not open) the pool
//!         Ok(())
//!     }
//!
//!     async fn start(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
//!         // open connections
//!         Ok(())
//!     }
//!
//!     async fn stop(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
//!         // close connections; must be idempotent
//!         Ok(())
//!     }
//! }
//! ```

mod capability;
mod registry;

pub use capability::{ConfigProvider, HttpServerProvider, LoggerProvider};
pub use registry::ComponentRegistry;

use crate::context::AppContext;
use async_trait::async_trait;
use serde::Serialize;
use std::any::Any;
use strum_macros::{Display, EnumIter};
use tokio_util::sync::CancellationToken;

/// Well-known registry name of the configuration component
pub const CONFIG_COMPONENT: &str = "config";

/// Well-known registry name of the logger component
pub const LOGGER_COMPONENT: &str = "logger";

/// Category of a component
///
/// The declaration order is the startup order; shutdown runs in reverse.
/// Dependencies only flow upward: `Web` may use `Core`, `Core` may use
/// `DataSource`, and everything may use `Infrastructure`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Infrastructure,
    DataSource,
    Core,
    Web,
}

/// A subsystem managed by the application lifecycle
///
/// Components are shared behind `Arc`, so every operation takes `&self`
/// and implementations keep mutable state behind their own locks.
///
/// # Contract
///
/// - `initialize` is called exactly once before `start` and must not spawn
///   background work. It receives an [`AppContext`] to look up peers.
/// - `start` is the only place where tasks, listeners or connections in
///   use may be spawned.
/// - `stop` must be idempotent: second and later calls succeed without
///   side effects.
/// - Each operation should return promptly once `ctx` is cancelled.
#[async_trait]
pub trait Component: Any + Send + Sync {
    /// Unique name within one application
    fn name(&self) -> &str;

    /// Lifecycle tier of this component
    fn kind(&self) -> ComponentKind;

    async fn initialize(&self, ctx: &CancellationToken, app: &AppContext) -> anyhow::Result<()>;

    async fn start(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Name and kind of a registered component, as reported in status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentInfo {
    pub name: String,
    pub kind: ComponentKind,
}
