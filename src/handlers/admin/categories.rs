// handlers/admin/categories.rs - GET/POST /api/categories

use axum::extract::State;
use serde_json::Value;
use tracing::info;

use crate::api::{JsonBody, Payload};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::categories::{self, CatalogEntry, FIXED_CATEGORIES};
use crate::AppState;

const CATEGORY_EXISTS: &str = "Category already exists";

/// GET /api/categories - fixed categories, then custom ones
pub async fn categories_get(State(state): State<AppState>) -> ApiResult<Vec<CatalogEntry>> {
    let custom = state.repo.list_categories().await?;
    Ok(ApiResponse::success(categories::catalog(&custom)))
}

/// POST /api/categories
pub async fn categories_post(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Payload>,
) -> ApiResult<CatalogEntry> {
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Category name is required"))?;

    let custom = state.repo.list_categories().await?;
    if categories::exists(name, &custom) {
        return Err(ApiError::bad_request(CATEGORY_EXISTS));
    }

    let category = state.repo.insert_category(name).await.map_err(|e| match e {
        DatabaseError::Duplicate(_) => ApiError::bad_request(CATEGORY_EXISTS),
        other => other.into(),
    })?;
    info!("Added expense category {:?}", category.name);

    let id = FIXED_CATEGORIES.len() + custom.len() + 1;
    Ok(ApiResponse::created(CatalogEntry::new(id, &category.name)))
}
