use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthError, AuthUser};

/// Audience the provider stamps on tokens issued to signed-in users.
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Claims carried by provider-issued access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl From<AccessClaims> for AuthUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Validate an HS256 access token against the provider's JWT secret.
pub fn verify_access_token(token: &str, secret: &str) -> Result<AccessClaims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::NotConfigured("SUPABASE_JWT_SECRET"));
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

    decode::<AccessClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Access token rejected: {}", e);
            AuthError::InvalidSession
        })
}
