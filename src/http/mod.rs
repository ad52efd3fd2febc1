//! HTTP server component
//!
//! Wraps an `axum` router. Initialize assembles the router (user routes
//! plus `GET /health`), Start binds the listener and serves in a background
//! task, Stop triggers graceful shutdown and waits for it.

use crate::component::{Component, ComponentKind, HttpServerProvider};
use crate::context::{AppContext, AppStatus};
use anyhow::Context as _;
use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Serving {
    token: CancellationToken,
    handle: JoinHandle<std::io::Result<()>>,
}

/// A `Web` component serving an axum [`Router`]
///
/// # Example
///
/// ```rust,ignore
/// let server = HttpServer::new("http", "127.0.0.1:3000".parse()?)
///     .routes(Router::new().route("/hello", get(|| async { "hi" })));
/// app.register(Arc::new(server))?;
/// ```
pub struct HttpServer {
    name: String,
    addr: SocketAddr,
    routes: Mutex<Option<Router>>,
    app: Mutex<Option<Router>>,
    local_addr: Mutex<Option<SocketAddr>>,
    serving: Mutex<Option<Serving>>,
}

impl HttpServer {
    pub fn new(name: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            name: name.into(),
            addr,
            routes: Mutex::new(None),
            app: Mutex::new(None),
            local_addr: Mutex::new(None),
            serving: Mutex::new(None),
        }
    }

    /// Merge user routes into the served router.
    pub fn routes(self, router: Router) -> Self {
        {
            let mut routes = self.routes.lock();
            let merged = match routes.take() {
                Some(existing) => existing.merge(router),
                None => router,
            };
            *routes = Some(merged);
        }
        self
    }

    /// Router assembled during Initialize
    pub fn router(&self) -> Option<Router> {
        self.app.lock().clone()
    }

    pub fn is_serving(&self) -> bool {
        self.serving.lock().is_some()
    }
}

async fn health(State(app): State<AppContext>) -> Result<Json<AppStatus>, StatusCode> {
    app.status().map(Json).ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

#[async_trait]
impl Component for HttpServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Web
    }

    async fn initialize(&self, _ctx: &CancellationToken, app: &AppContext) -> anyhow::Result<()> {
        let health_routes = Router::new()
            .route("/health", get(health))
            .with_state(app.clone());
        let router = match self.routes.lock().clone() {
            Some(user) => user.merge(health_routes),
            None => health_routes,
        };
        *self.app.lock() = Some(router);
        Ok(())
    }

    async fn start(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        if self.is_serving() {
            return Ok(());
        }
        let router = self
            .router()
            .with_context(|| format!("http server '{}' started before initialize", self.name))?;

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        let local_addr = listener.local_addr()?;

        let token = CancellationToken::new();
        let shutdown = token.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
        });

        *self.local_addr.lock() = Some(local_addr);
        *self.serving.lock() = Some(Serving { token, handle });
        tracing::info!(server = %self.name, addr = %local_addr, "HTTP server listening");
        Ok(())
    }

    async fn stop(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        let Some(serving) = self.serving.lock().take() else {
            return Ok(());
        };
        serving.token.cancel();
        serving
            .handle
            .await?
            .with_context(|| format!("http server '{}' terminated with error", self.name))?;
        *self.local_addr.lock() = None;
        tracing::info!(server = %self.name, "HTTP server stopped");
        Ok(())
    }
}

impl HttpServerProvider for HttpServer {
    fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }
}
