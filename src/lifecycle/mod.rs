//! Lifecycle Module
//!
//! State machine, hooks, listeners and the engine that drives registered
//! components through their phases.
//!
//! # Lifecycle Phases
//!
//! ```text
//! Created
//!    ↓  BeforeInitialize hooks
//!    ↓  Initialize (Infrastructure → DataSource → Core → Web)
//!    ↓  AfterInitialize hooks
//! Initialized
//!    ↓  BeforeStart hooks
//!    ↓  Start (same order)
//!    ↓  AfterStart hooks
//! Running
//!    ↓  cancellation / shutdown signal
//!    ↓  BeforeShutdown hooks
//!    ↓  Stop (exact reverse order)
//!    ↓  AfterShutdown hooks
//! Stopped
//! ```
//!
//! A failure during Initialize or Start moves the application to `Failed`
//! and stops the components that already completed the phase.
//!
//! # Example
//!
//! ```rust,ignore
//! use armature::prelude::*;
//!
//! let app = Application::new("orders", "1.0.0");
//! app.register_hook(HookPoint::BeforeStart, |_ctx: CancellationToken| async {
//!     tracing::info!("warming caches");
//!     Ok::<_, anyhow::Error>(())
//! });
//! app.register_state_change_listener(|app, old, new| {
//!     tracing::info!("{}: {} -> {}", app, old, new);
//! });
//! ```

mod application;
mod engine;
mod hooks;
mod observer;
mod shutdown;
mod state;

pub use application::{Application, ApplicationBuilder, FailureRecord};
pub use hooks::{Hook, HookDispatcher, HookPoint};
pub use observer::{StateChangeListener, StateObserver};
pub use shutdown::{Deadline, cancel_on_signal, shutdown_signal};
pub use state::{AppState, Phase};
