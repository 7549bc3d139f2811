pub mod claims;
pub mod cookie;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use claims::{verify_access_token, AccessClaims};
pub use cookie::{CookieSettings, SetCookies, StoredSession};
pub use supabase::SupabaseAuth;

/// Identity as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Token pair issued by the auth provider on sign-in, sign-up or refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Sign-up returns a session only when the provider auto-confirms accounts.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider refused the request (bad credentials, duplicate email, weak password).
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("invalid or expired session")]
    InvalidSession,

    #[error("auth provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("auth provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("auth provider returned {status}: {message}")]
    Upstream { status: u16, message: String },
}

/// Delegated authentication. The service never sees password hashes; every
/// credential check goes through an implementation of this trait.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;
}
