// handlers/public/projects.rs - GET /api/project/:id

use axum::extract::{Path, State};

use crate::api::parse_id;
use crate::database::models::Project;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::AppState;

pub async fn project_get(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<Project> {
    let id = parse_id(&raw_id, "id")?;

    let project = state
        .repo
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("ไม่พบโปรเจ็ค"))?;

    Ok(ApiResponse::success(project))
}
