// handlers/protected/auth.rs - GET /api/auth/user

use axum::extract::{Extension, State};
use serde_json::{json, Value};

use crate::middleware::{lookup_role, ApiResponse, ApiResult, SessionContext};
use crate::AppState;

pub async fn user_get(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> ApiResult<Value> {
    let user = session.user;
    let role = lookup_role(state.repo.as_ref(), user.id).await?;

    Ok(ApiResponse::success(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "role": role.as_str(),
            "created_at": user.created_at,
            "updated_at": user.updated_at,
        }
    })))
}
