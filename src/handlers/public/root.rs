// handlers/public/root.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::AppState;

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Interior Tracker API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Projects, expenses and photos for interior-design work",
        "endpoints": {
            "auth": "/api/auth/login, /api/auth/register, /api/auth/logout, /api/auth/loginWithAccessCode (public), /api/auth/user (session)",
            "projects": "/api/projects, /api/projects/stats, /api/create-proj, /api/edit-proj (session), /api/project/:id (public)",
            "photos": "/api/project/:id/images, /api/project/:id/upload-images (session)",
            "expenses": "/api/expenses[/:id], /api/expenses/project/:id, /api/expenses/chart-data (admin)",
            "categories": "/api/categories (admin)",
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();

    match state.repo.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "error": "database unavailable"
                })),
            )
        }
    }
}
