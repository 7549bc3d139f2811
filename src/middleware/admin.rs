use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::session::{SessionContext, NOT_LOGGED_IN};
use crate::database::models::Role;
use crate::database::{DatabaseError, Repository};
use crate::error::ApiError;
use crate::AppState;

pub const ADMIN_ONLY: &str = "Access denied. Admin only.";

/// Session user confirmed as an admin against the `users` table.
#[derive(Clone, Debug)]
pub struct ValidatedUser {
    pub id: Uuid,
}

/// Role of `user_id`; users without a `users` row are guests.
pub async fn lookup_role(repo: &dyn Repository, user_id: Uuid) -> Result<Role, DatabaseError> {
    Ok(repo
        .find_user(user_id)
        .await?
        .map(|u| u.role())
        .unwrap_or(Role::Guest))
}

/// Admin gate. Must run inside `require_session`.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session = request
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized(NOT_LOGGED_IN))?;

    let role = lookup_role(state.repo.as_ref(), session.user.id).await?;
    if !role.is_admin() {
        tracing::warn!("Non-admin user {} denied access to {}", session.user.id, request.uri().path());
        return Err(ApiError::forbidden(ADMIN_ONLY));
    }

    request.extensions_mut().insert(ValidatedUser { id: session.user.id });

    Ok(next.run(request).await)
}
