use armature::prelude::*;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::result::Result;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub item: String,
    pub quantity: u32,
}

/// Core component serving orders out of the shared cache
pub struct OrderService {
    cache: OnceLock<Arc<MemoryCache>>,
    cache_name: String,
}

impl OrderService {
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache: OnceLock::new(),
            cache_name: cache_name.into(),
        }
    }

    fn cache(&self) -> anyhow::Result<&Arc<MemoryCache>> {
        self.cache
            .get()
            .ok_or_else(|| anyhow::anyhow!("order service used before initialize"))
    }

    pub fn find(&self, id: u64) -> anyhow::Result<Option<Order>> {
        self.cache()?.get(&format!("order:{id}"))
    }

    pub fn save(&self, order: &Order) -> anyhow::Result<()> {
        self.cache()?.set(&format!("order:{}", order.id), order)
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/orders/{id}", get(find_order))
            .with_state(Arc::clone(self))
    }
}

async fn find_order(
    State(orders): State<Arc<OrderService>>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, StatusCode> {
    match orders.find(id) {
        Ok(Some(order)) => Ok(Json(order)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Order lookup failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[async_trait]
impl Component for OrderService {
    fn name(&self) -> &str {
        "orders"
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Core
    }

    async fn initialize(&self, _ctx: &CancellationToken, app: &AppContext) -> anyhow::Result<()> {
        let cache = app
            .get_as::<MemoryCache>(&self.cache_name)
            .ok_or_else(|| anyhow::anyhow!("cache '{}' is not registered", self.cache_name))?;
        let _ = self.cache.set(cache);

        if let Some(config) = app.get_as::<ConfigService>("config") {
            if let Some(item) = config.get("seed_item") {
                self.save(&Order {
                    id: 1,
                    item,
                    quantity: config.get_parsed("seed_quantity")?.unwrap_or(1),
                })?;
            }
        }
        Ok(())
    }
}
