//! Shutdown signals and deadlines
//!
//! Bridges OS signals and timers onto cancellation tokens. The lifecycle
//! engine itself never listens for signals; embedders wire them in through
//! [`Application::spawn_shutdown_handler`](crate::Application::spawn_shutdown_handler)
//! or by cancelling the token passed to `run`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Create a future that completes when a shutdown signal is received
///
/// Completes on Ctrl+C, or SIGTERM on unix. If a handler cannot be
/// installed the error is logged and that signal is never observed.
///
/// # Example
///
/// ```rust,ignore
/// use armature::lifecycle::shutdown_signal;
///
/// tokio::select! {
///     _ = shutdown_signal() => {
///         println!("Shutdown signal received");
///     }
///     _ = work() => {}
/// }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}

/// Cancel `token` when a shutdown signal arrives.
///
/// The task ends without cancelling if `token` is cancelled first.
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => {
                tracing::info!("Starting graceful shutdown...");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

/// A child token that is also cancelled once a timeout elapses
///
/// Dropping the deadline disarms the timer without cancelling the token.
pub struct Deadline {
    token: CancellationToken,
    timeout: Duration,
    expired: Arc<AtomicBool>,
    timer: JoinHandle<()>,
}

impl Deadline {
    pub fn new(parent: &CancellationToken, timeout: Duration) -> Self {
        let token = parent.child_token();
        let expired = Arc::new(AtomicBool::new(false));

        let timer_token = token.clone();
        let timer_expired = Arc::clone(&expired);
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    tracing::warn!("Deadline of {:?} elapsed", timeout);
                    timer_expired.store(true, Ordering::Release);
                    timer_token.cancel();
                }
                _ = timer_token.cancelled() => {}
            }
        });

        Self {
            token,
            timeout,
            expired,
            timer,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the timeout (rather than the parent) cancelled the token
    pub fn expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_cancels_child_only() {
        let parent = CancellationToken::new();
        let deadline = Deadline::new(&parent, Duration::from_millis(10));

        tokio::time::timeout(Duration::from_secs(1), deadline.token().cancelled())
            .await
            .unwrap();
        assert!(deadline.expired());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_deadline_follows_parent() {
        let parent = CancellationToken::new();
        let deadline = Deadline::new(&parent, Duration::from_secs(3600));

        parent.cancel();
        assert!(deadline.token().is_cancelled());
        assert!(!deadline.expired());
    }

    #[tokio::test]
    async fn test_dropped_deadline_never_fires() {
        let parent = CancellationToken::new();
        let deadline = Deadline::new(&parent, Duration::from_millis(10));
        let token = deadline.token().clone();
        drop(deadline);

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_on_signal_exits_when_token_cancelled() {
        let token = CancellationToken::new();
        let handle = cancel_on_signal(token.clone());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
