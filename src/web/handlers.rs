use axum::Json;
use serde_json::{json, Value};

pub mod jobs;
pub mod scrape;
pub mod search;
pub mod user;

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
