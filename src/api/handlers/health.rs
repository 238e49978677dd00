/*
 * Responsibility
 * - GET / と GET /health (疎通用, 認可なし)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn index() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({"success": true, "message": "Casting Agency API"})),
    )
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
