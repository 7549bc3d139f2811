use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use url::Url;

use super::{verify_access_token, AuthError, AuthProvider, AuthSession, AuthUser, SignUpOutcome};
use crate::config::SupabaseConfig;

/// GoTrue-compatible auth client for the managed backend.
#[derive(Clone)]
pub struct SupabaseAuth {
    http: Client,
    base: Url,
    anon_key: String,
    jwt_secret: Option<String>,
}

impl SupabaseAuth {
    pub fn new(http: Client, base: Url, anon_key: String, jwt_secret: Option<String>) -> Self {
        Self {
            http,
            base,
            anon_key,
            jwt_secret,
        }
    }

    pub fn from_config(config: &SupabaseConfig, http: Client) -> Result<Self, AuthError> {
        let base = provider_base_url(config.url.as_deref()).ok_or(AuthError::NotConfigured("SUPABASE_URL"))?;
        let anon_key = config
            .anon_key
            .clone()
            .ok_or(AuthError::NotConfigured("SUPABASE_ANON_KEY"))?;
        Ok(Self::new(http, base, anon_key, config.jwt_secret.clone()))
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        self.base
            .join(path)
            .map_err(|_| AuthError::NotConfigured("SUPABASE_URL"))
    }

    fn post(&self, url: Url) -> RequestBuilder {
        self.http.post(url).header("apikey", &self.anon_key)
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Response, AuthError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(self.post(url).json(&body).send().await?)
    }
}

/// Normalise the provider URL so relative joins keep any path prefix.
pub(crate) fn provider_base_url(raw: Option<&str>) -> Option<Url> {
    let raw = raw?.trim();
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&with_slash).ok()
}

/// Pull a human-readable message out of a provider error body.
pub(crate) async fn upstream_failure(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    (status, message)
}

fn upstream(status: StatusCode, message: String) -> AuthError {
    AuthError::Upstream {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;

        if response.status().is_success() {
            return Ok(response.json::<AuthSession>().await?);
        }

        let (status, message) = upstream_failure(response).await;
        if status.is_client_error() {
            Err(AuthError::InvalidCredentials(message))
        } else {
            Err(upstream(status, message))
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .post(self.endpoint("auth/v1/signup")?)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = upstream_failure(response).await;
            return if status.is_client_error() {
                Err(AuthError::InvalidCredentials(message))
            } else {
                Err(upstream(status, message))
            };
        }

        // With auto-confirm the provider answers with a full session; otherwise
        // it returns the pending user alone.
        let body: Value = response.json().await?;
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body)
                .map_err(|e| upstream(StatusCode::OK, format!("unexpected sign-up payload: {}", e)))?;
            return Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user_value = body.get("user").cloned().unwrap_or(body);
        let user: AuthUser = serde_json::from_value(user_value)
            .map_err(|e| upstream(StatusCode::OK, format!("unexpected sign-up payload: {}", e)))?;
        Ok(SignUpOutcome { user, session: None })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .post(self.endpoint("auth/v1/logout")?)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let (status, message) = upstream_failure(response).await;
        match status {
            // The token is already gone; nothing left to revoke.
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(()),
            s if s.is_client_error() => Err(AuthError::InvalidCredentials(message)),
            s => Err(upstream(s, message)),
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        if let Some(secret) = self.jwt_secret.as_deref() {
            return verify_access_token(access_token, secret).map(AuthUser::from);
        }

        let response = self
            .http
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response.json::<AuthUser>().await?);
        }

        let (status, message) = upstream_failure(response).await;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(AuthError::InvalidSession)
        } else {
            Err(upstream(status, message))
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;

        if response.status().is_success() {
            return Ok(response.json::<AuthSession>().await?);
        }

        let (status, message) = upstream_failure(response).await;
        if status.is_client_error() {
            tracing::debug!("Refresh token rejected: {}", message);
            Err(AuthError::InvalidSession)
        } else {
            Err(upstream(status, message))
        }
    }
}
