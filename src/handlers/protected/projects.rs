// handlers/protected/projects.rs - project listing and CRUD for signed-in users

use axum::extract::{Extension, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::api::{parse_id, JsonBody, Payload};
use crate::database::models::{NewProject, Project, ProjectChanges, ProjectFilter, ProjectStats, ProjectStatus};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::middleware::{lookup_role, ApiResponse, ApiResult, SessionContext};
use crate::services::access_code;
use crate::AppState;

const ACCESS_CODE_TAKEN: &str = "access_code นี้มีอยู่แล้ว กรุณาใช้ access_code อื่น";
const ID_REQUIRED: &str = "กรุณาระบุ ID ของโปรเจ็ค";

/// The unique index on `access_code` catches what the pre-check races past.
fn access_code_conflict(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::Duplicate(_) => ApiError::bad_request(ACCESS_CODE_TAKEN),
        other => other.into(),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
}

fn invalid_status() -> ApiError {
    let allowed = ProjectStatus::ALL.map(|s| s.as_str()).join(", ");
    ApiError::bad_request(format!("ค่า status ไม่ถูกต้อง ต้องเป็นหนึ่งใน: {}", allowed))
}

fn parse_status(raw: &str) -> Result<ProjectStatus, ApiError> {
    ProjectStatus::parse(raw).ok_or_else(invalid_status)
}

fn check_progress(progress: Option<i32>) -> Result<Option<i32>, ApiError> {
    match progress {
        Some(p) if !(0..=100).contains(&p) => Err(ApiError::bad_request("progress_percentage ต้องอยู่ระหว่าง 0-100")),
        other => Ok(other),
    }
}

/// Owners and admins may change a project; everyone else gets `denied`.
pub(super) async fn ensure_owner_or_admin(
    state: &AppState,
    project: &Project,
    user_id: Uuid,
    denied: &str,
) -> Result<(), ApiError> {
    if project.is_owned_by(user_id) {
        return Ok(());
    }
    if lookup_role(state.repo.as_ref(), user_id).await?.is_admin() {
        return Ok(());
    }
    tracing::warn!("User {} denied write access to project {}", user_id, project.id);
    Err(ApiError::forbidden(denied))
}

/// GET /api/projects - newest first, optionally filtered
pub async fn projects_get(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Vec<Project>> {
    let status = match query.status.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_status(raw)?),
        _ => None,
    };
    let filter = ProjectFilter {
        search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        status,
    };

    let projects = state.repo.list_projects(&filter).await?;
    Ok(ApiResponse::success(projects))
}

/// GET /api/projects/stats
pub async fn project_stats_get(State(state): State<AppState>) -> ApiResult<ProjectStats> {
    let projects = state.repo.list_projects(&ProjectFilter::default()).await?;
    Ok(ApiResponse::success(ProjectStats::from_projects(&projects)))
}

/// POST /api/create-proj
pub async fn project_create_post(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    JsonBody(body): JsonBody<Payload>,
) -> ApiResult<Value> {
    let name = body
        .text("name")
        .ok_or_else(|| ApiError::bad_request("กรุณาระบุชื่อโปรเจ็ค"))?;

    let access_code = body.text("access_code").unwrap_or_else(access_code::generate);
    if state.repo.access_code_taken(&access_code, None).await? {
        return Err(ApiError::bad_request(ACCESS_CODE_TAKEN));
    }

    let status = body.text("status").map(|s| parse_status(&s)).transpose()?;

    let project = NewProject {
        name,
        description: body.text("description"),
        access_code,
        status,
        progress_percentage: check_progress(body.integer("progress_percentage")?)?,
        start_date: body.date("start_date")?,
        estimated_end_date: body.date("estimated_end_date")?,
        actual_end_date: body.date("actual_end_date")?,
        budget: body.decimal("budget")?,
        bucket_name: body.text("bucket_name"),
        created_by: session.user.id,
    };

    let project = state
        .repo
        .insert_project(project)
        .await
        .map_err(access_code_conflict)?;
    info!("User {} created project {}", session.user.id, project.id);

    Ok(ApiResponse::created(json!({
        "project_id": project.id,
        "bucket_name": project.bucket_name,
        "access_code": project.access_code,
    })))
}

/// Changes for the fields present in an edit body.
fn project_changes(body: &Payload) -> Result<ProjectChanges, ApiError> {
    let status = if body.contains("status") {
        let raw = body.text("status").ok_or_else(invalid_status)?;
        Some(Some(parse_status(&raw)?))
    } else {
        None
    };

    let progress_percentage = body
        .present("progress_percentage", Payload::integer)?
        .map(check_progress)
        .transpose()?;

    Ok(ProjectChanges {
        name: body.text("name"),
        description: body.present("description", |p, k| Ok(p.text(k)))?,
        access_code: body.text("access_code"),
        bucket_name: body.present("bucket_name", |p, k| Ok(p.text(k)))?,
        status,
        progress_percentage,
        start_date: body.present("start_date", Payload::date)?,
        estimated_end_date: body.present("estimated_end_date", Payload::date)?,
        actual_end_date: body.present("actual_end_date", Payload::date)?,
        budget: body.present("budget", Payload::decimal)?,
    })
}

/// PUT /api/edit-proj
pub async fn project_edit_put(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    JsonBody(body): JsonBody<Payload>,
) -> ApiResult<Value> {
    let id = body.uuid("id")?.ok_or_else(|| ApiError::bad_request(ID_REQUIRED))?;

    let existing = state
        .repo
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("ไม่พบโปรเจ็คที่ต้องการแก้ไข"))?;

    ensure_owner_or_admin(&state, &existing, session.user.id, "ไม่มีสิทธิ์ในการแก้ไขโปรเจ็คนี้").await?;

    if let Some(code) = body.text("access_code") {
        if code != existing.access_code && state.repo.access_code_taken(&code, Some(id)).await? {
            return Err(ApiError::bad_request(ACCESS_CODE_TAKEN));
        }
    }

    let changes = project_changes(&body)?;
    if changes.is_empty() {
        return Err(ApiError::bad_request("ไม่มีข้อมูลที่จะอัปเดต"));
    }

    let project = state
        .repo
        .update_project(id, changes)
        .await
        .map_err(access_code_conflict)?
        .ok_or_else(|| ApiError::not_found("ไม่พบโปรเจ็คที่ต้องการแก้ไข"))?;
    info!("User {} updated project {}", session.user.id, id);

    Ok(ApiResponse::success(json!({
        "message": "อัปเดตโปรเจ็คสำเร็จ",
        "project": project,
    })))
}

/// DELETE /api/edit-proj?id=
pub async fn project_edit_delete(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Value> {
    let raw_id = query
        .id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(ID_REQUIRED))?;
    let id = parse_id(&raw_id, "id")?;

    let existing = state
        .repo
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("ไม่พบโปรเจ็คที่ต้องการลบ"))?;

    ensure_owner_or_admin(&state, &existing, session.user.id, "ไม่มีสิทธิ์ในการลบโปรเจ็คนี้").await?;

    state.repo.delete_project(id).await?;
    info!("User {} deleted project {}", session.user.id, id);

    Ok(ApiResponse::success(json!({ "message": "ลบโปรเจ็คสำเร็จ" })))
}
