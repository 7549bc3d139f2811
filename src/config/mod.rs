use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub supabase: SupabaseConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
    pub max_upload_file_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub secure_cookies: bool,
    pub remember_me_days: u64,
    pub auth_cookie_name: Option<String>,
}

/// Managed backend endpoints. Values are optional so the config can load
/// in tests; `serve` refuses to start without `url` and `anon_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub storage_bucket: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_first(&["PORT", "INTERIOR_TRACKER_PORT"]) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = non_empty(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }
        if let Ok(v) = env::var("API_MAX_UPLOAD_FILE_BYTES") {
            self.api.max_upload_file_bytes = v.parse().unwrap_or(self.api.max_upload_file_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }
        if let Ok(v) = env::var("SECURITY_REMEMBER_ME_DAYS") {
            self.security.remember_me_days = v.parse().unwrap_or(self.security.remember_me_days);
        }
        if let Ok(v) = env::var("AUTH_COOKIE_NAME") {
            self.security.auth_cookie_name = non_empty(v);
        }

        // Managed backend; the NEXT_PUBLIC_* names are accepted so an existing
        // front-end .env can be reused as is.
        if let Some(v) = env_first(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]) {
            self.supabase.url = non_empty(v);
        }
        if let Some(v) = env_first(&["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"]) {
            self.supabase.anon_key = non_empty(v);
        }
        if let Ok(v) = env::var("SUPABASE_JWT_SECRET") {
            self.supabase.jwt_secret = non_empty(v);
        }
        if let Ok(v) = env::var("STORAGE_BUCKET") {
            if !v.trim().is_empty() {
                self.supabase.storage_bucket = v;
            }
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                max_request_size_bytes: 50 * 1024 * 1024, // 50MB
                max_upload_file_bytes: 10 * 1024 * 1024,  // 10MB
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                secure_cookies: false,
                remember_me_days: 7,
                auth_cookie_name: None,
            },
            supabase: SupabaseConfig::unset(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                max_request_size_bytes: 50 * 1024 * 1024,
                max_upload_file_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                secure_cookies: true,
                remember_me_days: 7,
                auth_cookie_name: None,
            },
            supabase: SupabaseConfig::unset(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                max_request_size_bytes: 50 * 1024 * 1024,
                max_upload_file_bytes: 10 * 1024 * 1024,
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                secure_cookies: true,
                remember_me_days: 7,
                auth_cookie_name: None,
            },
            supabase: SupabaseConfig::unset(),
        }
    }

    /// Name of the provider's session cookie: `sb-<project-ref>-auth-token`,
    /// where the project ref is the first label of the provider host.
    pub fn auth_cookie_name(&self) -> String {
        if let Some(name) = &self.security.auth_cookie_name {
            return name.clone();
        }

        let project_ref = self
            .supabase
            .url
            .as_deref()
            .and_then(|raw| url::Url::parse(raw).ok())
            .and_then(|u| u.host_str().map(|h| h.split('.').next().unwrap_or(h).to_string()))
            .unwrap_or_else(|| "local".to_string());

        format!("sb-{}-auth-token", project_ref)
    }
}

impl SupabaseConfig {
    fn unset() -> Self {
        Self {
            url: None,
            anon_key: None,
            jwt_secret: None,
            storage_bucket: "project-images".to_string(),
        }
    }
}

fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| env::var(k).ok())
}

fn non_empty(v: String) -> Option<String> {
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
