use axum::{extract::State, response::Json};
use chrono::Utc;
use serde_json::json;

use crate::{
    errors::Result,
    handlers::{success, AppState},
};

pub async fn health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let database = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(state.database.pool())
        .await
    {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!("health check database probe failed: {e}");
            "disconnected"
        }
    };

    Ok(success(json!({
        "status": if database == "connected" { "healthy" } else { "degraded" },
        "database": database,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}
