//! Session cookie codec.
//!
//! The provider's session lives in an HttpOnly cookie whose value is
//! `base64-` followed by base64url-encoded JSON. Long values are split into
//! numbered chunks (`name.0`, `name.1`, ...). A value without the prefix is a
//! bare access token.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use axum::response::{IntoResponseParts, ResponseParts};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use super::AuthSession;
use crate::config::AppConfig;

pub const BASE64_PREFIX: &str = "base64-";

/// Largest cookie value written before splitting into chunks.
pub const MAX_CHUNK_SIZE: usize = 3180;

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// The subset of a provider session kept in the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl StoredSession {
    pub fn from_session(session: &AuthSession) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: Some(session.refresh_token.clone()),
            token_type: Some(session.token_type.clone()),
            expires_at: session.expires_at,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    pub fn encode(&self) -> String {
        // Serializing a struct of strings and integers cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        format!("{}{}", BASE64_PREFIX, general_purpose::URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let Some(encoded) = raw.strip_prefix(BASE64_PREFIX) else {
            return Some(Self {
                access_token: raw.to_string(),
                refresh_token: None,
                token_type: None,
                expires_at: None,
            });
        };

        let bytes = decode_base64(encoded)?;
        let session: StoredSession = serde_json::from_slice(&bytes).ok()?;
        if session.access_token.is_empty() {
            return None;
        }
        Some(session)
    }
}

fn decode_base64(encoded: &str) -> Option<Vec<u8>> {
    let trimmed = encoded.trim_end_matches('=');
    general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(trimmed))
        .ok()
}

/// How session cookies are named and flagged.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    /// Max-Age applied when the client asked to be remembered.
    pub remember_max_age: i64,
}

impl CookieSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            name: config.auth_cookie_name(),
            secure: config.security.secure_cookies,
            remember_max_age: (config.security.remember_me_days * 24 * 60 * 60) as i64,
        }
    }

    /// Read the session cookie (plain or chunked) from request headers.
    pub fn read_session(&self, headers: &HeaderMap) -> Option<StoredSession> {
        let jar = parse_cookies(headers);

        if let Some(value) = jar.get(&self.name) {
            return StoredSession::decode(value);
        }

        let mut joined = String::new();
        for index in 0.. {
            match jar.get(&format!("{}.{}", self.name, index)) {
                Some(chunk) => joined.push_str(chunk),
                None => break,
            }
        }

        if joined.is_empty() {
            None
        } else {
            StoredSession::decode(&joined)
        }
    }

    /// `Set-Cookie` values storing `session`, chunked when necessary.
    pub fn session_cookies(&self, session: &StoredSession, remember: bool) -> SetCookies {
        let value = session.encode();
        let max_age = remember.then_some(self.remember_max_age);
        let mut cookies = SetCookies::default();

        if value.len() <= MAX_CHUNK_SIZE {
            cookies.push(self.set_cookie(&self.name, &value, max_age));
            return cookies;
        }

        // An unchunked cookie would shadow the chunks on the next read.
        cookies.push(self.remove_cookie(&self.name));
        for (index, chunk) in value.as_bytes().chunks(MAX_CHUNK_SIZE).enumerate() {
            let chunk = String::from_utf8_lossy(chunk);
            cookies.push(self.set_cookie(&format!("{}.{}", self.name, index), &chunk, max_age));
        }
        cookies
    }

    /// `Set-Cookie` values that clear the session cookie and any chunks the
    /// client currently holds.
    pub fn removal_cookies(&self, headers: &HeaderMap) -> SetCookies {
        let jar = parse_cookies(headers);
        let mut cookies = SetCookies::default();
        cookies.push(self.remove_cookie(&self.name));

        let chunk_prefix = format!("{}.", self.name);
        let mut chunk_names: Vec<&String> = jar.keys().filter(|k| k.starts_with(&chunk_prefix)).collect();
        chunk_names.sort();
        for name in chunk_names {
            cookies.push(self.remove_cookie(name));
        }
        cookies
    }

    fn set_cookie(&self, key: &str, value: &str, max_age: Option<i64>) -> String {
        let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", key, value);
        if self.secure {
            cookie.push_str("; Secure");
        }
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        cookie
    }

    fn remove_cookie(&self, key: &str) -> String {
        let mut cookie = format!("{}=deleted; Path=/; HttpOnly; SameSite=Lax; Expires={}", key, EXPIRED);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Parse every `Cookie` header into name/value pairs. Later duplicates win.
pub fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Pending `Set-Cookie` headers, attached to whatever response is finally
/// returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetCookies(Vec<String>);

impl SetCookies {
    pub fn push(&mut self, cookie: String) {
        self.0.push(cookie);
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Append every pending cookie to `headers`.
    pub fn append_to(&self, headers: &mut HeaderMap) {
        for cookie in &self.0 {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    headers.append(SET_COOKIE, value);
                }
                Err(e) => tracing::warn!("Dropping malformed Set-Cookie value: {}", e),
            }
        }
    }
}

impl IntoResponseParts for SetCookies {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.append_to(res.headers_mut());
        Ok(res)
    }
}
