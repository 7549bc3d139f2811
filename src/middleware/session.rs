use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::auth::{AuthError, AuthUser, SetCookies, StoredSession};
use crate::error::ApiError;
use crate::AppState;

pub const NOT_LOGGED_IN: &str = "ไม่พบผู้ใช้ที่ login";

/// The signed-in user and the access token the request acts with.
#[derive(Clone, Debug)]
pub struct SessionContext {
    pub user: AuthUser,
    pub access_token: String,
}

/// Resolve the session cookie into a `SessionContext`, refreshing it once when
/// the access token has expired or been rejected. Refreshed cookies are
/// appended to whatever response the inner handler produces.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let stored = state
        .cookies
        .read_session(request.headers())
        .ok_or_else(|| ApiError::unauthorized(NOT_LOGGED_IN))?;

    let (context, refreshed) = resolve(&state, stored).await?;
    tracing::debug!("Session resolved for user {}", context.user.id);
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Some(cookies) = refreshed {
        cookies.append_to(response.headers_mut());
    }
    Ok(response)
}

async fn resolve(
    state: &AppState,
    stored: StoredSession,
) -> Result<(SessionContext, Option<SetCookies>), ApiError> {
    if !stored.is_expired(Utc::now().timestamp()) {
        match state.auth.get_user(&stored.access_token).await {
            Ok(user) => {
                return Ok((
                    SessionContext {
                        user,
                        access_token: stored.access_token,
                    },
                    None,
                ))
            }
            Err(AuthError::InvalidSession) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let refresh_token = stored
        .refresh_token
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized(NOT_LOGGED_IN))?;

    let session = match state.auth.refresh_session(refresh_token).await {
        Ok(session) => session,
        Err(AuthError::InvalidSession) => return Err(ApiError::unauthorized(NOT_LOGGED_IN)),
        Err(e) => return Err(e.into()),
    };

    tracing::info!("Refreshed session for user {}", session.user.id);
    let cookies = state
        .cookies
        .session_cookies(&StoredSession::from_session(&session), false);

    Ok((
        SessionContext {
            user: session.user,
            access_token: session.access_token,
        },
        Some(cookies),
    ))
}
