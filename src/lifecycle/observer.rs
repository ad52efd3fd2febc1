//! State Observer
//!
//! Owns the application state and notifies listeners of every transition.

use super::AppState;
use crate::component::LoggerProvider;
use crate::error::{AppError, Result};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU8, Ordering};

/// Callback invoked as `(source, old, new)` after a transition is committed
///
/// Listeners run while the transition lock is held, so they must not block
/// and must not drive the lifecycle themselves. Reading the state from a
/// listener is fine.
pub type StateChangeListener = Arc<dyn Fn(&str, AppState, AppState) + Send + Sync>;

/// Holds the current [`AppState`] and the listener list
pub struct StateObserver {
    source: String,
    state: AtomicU8,
    transition: Mutex<()>,
    listeners: RwLock<Vec<StateChangeListener>>,
    logger: RwLock<Option<Weak<dyn LoggerProvider>>>,
}

impl StateObserver {
    /// Create an observer in state `Created`; `source` is reported to listeners.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            state: AtomicU8::new(AppState::Created.as_u8()),
            transition: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
            logger: RwLock::new(None),
        }
    }

    /// Current state; never waits on a transition in progress.
    pub fn state(&self) -> AppState {
        AppState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Append a listener. The same callable may be registered twice and is
    /// then called twice.
    pub fn register_listener<F>(&self, listener: F)
    where
        F: Fn(&str, AppState, AppState) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Commit `next` and notify listeners in registration order.
    ///
    /// Returns the previous state. A panicking listener is reported and the
    /// remaining listeners still run.
    pub fn set_state(&self, next: AppState) -> Result<AppState> {
        let _guard = self.transition.lock();

        let old = self.state();
        if !old.can_transition_to(next) {
            return Err(AppError::IllegalTransition { from: old, to: next });
        }
        self.state.store(next.as_u8(), Ordering::Release);
        tracing::debug!(app = %self.source, from = %old, to = %next, "state transition");

        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(&self.source, old, next)));
            if let Err(payload) = outcome {
                self.report_error(&format!(
                    "state listener panicked on {} -> {}: {}",
                    old,
                    next,
                    panic_message(payload.as_ref())
                ));
            }
        }

        Ok(old)
    }

    /// Route an error report to the registered logger, or to `tracing`.
    pub fn report_error(&self, message: &str) {
        let provider = self.logger.read().as_ref().and_then(Weak::upgrade);
        match provider {
            Some(provider) => provider.logger().error(message),
            None => tracing::error!(app = %self.source, "{}", message),
        }
    }

    /// The registry owns the logger; the observer only borrows it.
    pub(crate) fn set_logger(&self, logger: Option<&Arc<dyn LoggerProvider>>) {
        *self.logger.write() = logger.map(Arc::downgrade);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
