pub mod categories;
pub mod ceremonies;
pub mod error;
pub mod sheets;
pub mod venues;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(venues::routes())
        .merge(categories::routes())
        .merge(ceremonies::routes())
        .merge(sheets::routes())
}

// Reports each backing service; 503 when either is unreachable.
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let database = state.db.ping().await;
    let redis = state.redis.ping().await;
    if let Err(e) = &database {
        tracing::error!("Health check: database unreachable: {}", e);
    }
    if let Err(e) = &redis {
        tracing::error!("Health check: redis unreachable: {}", e);
    }

    let healthy = database.is_ok() && redis.is_ok();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "database": database.is_ok(),
            "redis": redis.is_ok(),
        })),
    )
}
