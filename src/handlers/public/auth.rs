// handlers/public/auth.rs - POST /api/auth/{login,register,logout,loginWithAccessCode}
//
// Credential exchanges with the auth provider. Each successful exchange
// answers with the provider session stored in the session cookie.

use axum::{extract::State, http::HeaderMap};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::{JsonBody, Payload};
use crate::auth::{AuthError, AuthSession, SetCookies, StoredSession};
use crate::database::models::{NewUser, Role};
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::services::access_code;
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;

type CookieResponse = Result<(SetCookies, ApiResponse<Value>), ApiError>;

/// Email (trimmed) and password (verbatim) from a credentials body.
fn credentials(body: &Payload) -> Result<(String, String), ApiError> {
    let email = body.text("email");
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    match (email, password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(ApiError::bad_request("Email และ Password จำเป็น")),
    }
}

fn session_cookies(state: &AppState, session: &AuthSession, remember: bool) -> SetCookies {
    state
        .cookies
        .session_cookies(&StoredSession::from_session(session), remember)
}

/// POST /api/auth/login
pub async fn login_post(State(state): State<AppState>, JsonBody(body): JsonBody<Payload>) -> CookieResponse {
    let (email, password) = credentials(&body)?;

    let session = state.auth.sign_in_with_password(&email, &password).await?;
    info!("User {} logged in", session.user.id);

    let cookies = session_cookies(&state, &session, body.flag("remember"));
    Ok((cookies, ApiResponse::success(json!({ "message": "Login สำเร็จ" }))))
}

/// POST /api/auth/register - new accounts are admins
pub async fn register_post(State(state): State<AppState>, JsonBody(body): JsonBody<Payload>) -> CookieResponse {
    let (email, password) = credentials(&body)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("Password ต้องมีความยาวอย่างน้อย 6 ตัวอักษร"));
    }

    let outcome = state.auth.sign_up(&email, &password).await?;

    let user = NewUser {
        id: outcome.user.id,
        email: outcome.user.email.clone().unwrap_or(email),
        full_name: String::new(),
        role: Role::Admin,
    };
    state.repo.insert_user(user).await.map_err(|e| {
        tracing::error!("Signed up {} but failed to record the user: {}", outcome.user.id, e);
        ApiError::internal_server_error("สมัครสำเร็จแต่บันทึกข้อมูลผู้ใช้ไม่สำเร็จ")
    })?;
    info!("Registered admin user {}", outcome.user.id);

    // Without auto-confirm there is no session yet, so no cookie.
    let cookies = outcome
        .session
        .as_ref()
        .map(|s| session_cookies(&state, s, body.flag("remember")))
        .unwrap_or_default();

    Ok((cookies, ApiResponse::created(json!({ "message": "ลงทะเบียนสำเร็จ" }))))
}

/// POST /api/auth/logout
pub async fn logout_post(State(state): State<AppState>, headers: HeaderMap) -> CookieResponse {
    if let Some(stored) = state.cookies.read_session(&headers) {
        state.auth.sign_out(&stored.access_token).await.map_err(|e| {
            warn!("Sign-out failed: {}", e);
            ApiError::bad_request(e.to_string())
        })?;
    }

    let cookies = state.cookies.removal_cookies(&headers);
    Ok((cookies, ApiResponse::success(json!({ "message": "Logout สำเร็จ" }))))
}

/// POST /api/auth/loginWithAccessCode
///
/// Signs in the guest account bound to a project's access code, creating it
/// on first use. The guest account has no `users` row and so acts as a guest.
pub async fn access_code_login_post(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Payload>,
) -> CookieResponse {
    let code = body
        .text("access_code")
        .ok_or_else(|| ApiError::bad_request("กรุณาระบุ access_code"))?;

    let project = state
        .repo
        .find_project_by_access_code(&code)
        .await?
        .ok_or_else(|| ApiError::unauthorized("ไม่พบโปรเจ็คหรือ access code ไม่ถูกต้อง"))?;

    let email = access_code::guest_email(&code);
    let session = match state.auth.sign_in_with_password(&email, &code).await {
        Ok(session) => session,
        Err(AuthError::InvalidCredentials(_)) => create_guest(&state, &email, &code).await?,
        Err(e) => {
            warn!("Guest sign-in for project {} failed: {}", project.id, e);
            return Err(ApiError::unauthorized("เข้าสู่ระบบไม่สำเร็จ"));
        }
    };
    info!("Guest {} logged in to project {}", session.user.id, project.id);

    let cookies = session_cookies(&state, &session, true);
    Ok((
        cookies,
        ApiResponse::success(json!({
            "message": "เข้าสู่ระบบด้วย access code สำเร็จ",
            "project": [project],
        })),
    ))
}

async fn create_guest(state: &AppState, email: &str, code: &str) -> Result<AuthSession, ApiError> {
    let outcome = state.auth.sign_up(email, code).await.map_err(|e| {
        warn!("Creating guest account {} failed: {}", email, e);
        ApiError::internal_server_error("สร้าง guest user ไม่สำเร็จ")
    })?;
    info!("Created guest account {}", outcome.user.id);

    match outcome.session {
        Some(session) => Ok(session),
        None => state
            .auth
            .sign_in_with_password(email, code)
            .await
            .map_err(|e| {
                warn!("Guest sign-in after sign-up failed: {}", e);
                ApiError::unauthorized("เข้าสู่ระบบไม่สำเร็จ")
            }),
    }
}
