use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::{config::Config, database::Database, services::EmailService};

pub mod auth;
pub mod contact;
pub mod downloads;
pub mod health;
pub mod password_reset;
pub mod quotes;
pub mod users;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
    pub email: EmailService,
}

/// Wrap a payload in the uniform `{success: true, data: …}` envelope.
pub fn success<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": data,
    }))
}
