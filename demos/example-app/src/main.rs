use armature::prelude::*;
use std::net::SocketAddr;
use std::time::Duration;

mod orders;

use orders::OrderService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let orders = Arc::new(OrderService::new("cache"));

    let app = Application::builder("example-app", env!("CARGO_PKG_VERSION"))
        .config(
            ConfigService::new()
                .with_env_prefix("EXAMPLE_")
                .with_value("seed_item", "coffee beans"),
        )
        .logger(TracingLogger::new())
        .component(MemoryCache::new("cache").with_sweep_interval(Duration::from_secs(10)))
        .component(HttpServer::new("http", addr).routes(orders.router()))
        .listener(|app, old, new| tracing::info!("[{}] {} -> {}", app, old, new))
        .hook(HookPoint::AfterStart, move |_ctx: CancellationToken| async move {
            tracing::info!("✅ Server running on http://{}", addr);
            Ok::<_, anyhow::Error>(())
        })
        .init_timeout(Duration::from_secs(30))
        .build()?;
    app.register(orders)?;

    app.spawn_shutdown_handler();
    app.run(&CancellationToken::new()).await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
