pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthProvider, CookieSettings};
use crate::config::{ApiConfig, AppConfig};
use crate::database::Repository;
use crate::services::ObjectStorage;

/// Limits applied to multipart photo uploads.
#[derive(Debug, Clone, Copy)]
pub struct UploadPolicy {
    /// Files above this size are skipped.
    pub max_file_bytes: usize,
    /// Body limit for a whole upload request.
    pub max_request_bytes: usize,
}

impl UploadPolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            max_file_bytes: config.max_upload_file_bytes,
            max_request_bytes: config.max_request_size_bytes,
        }
    }
}

/// Shared, read-only handles every handler works through.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub cookies: CookieSettings,
    pub uploads: UploadPolicy,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        repo: Arc<dyn Repository>,
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            repo,
            auth,
            storage,
            cookies: CookieSettings::from_config(config),
            uploads: UploadPolicy::from_config(&config.api),
        }
    }
}

/// The full HTTP surface: public, session-protected and admin routes.
pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(&state))
        .merge(admin_routes(&state))
        .with_state(state)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/api/auth/login", post(public::login_post))
        .route("/api/auth/register", post(public::register_post))
        .route("/api/auth/logout", post(public::logout_post))
        .route("/api/auth/loginWithAccessCode", post(public::access_code_login_post))
        .route("/api/project/:id", get(public::project_get))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    use handlers::protected;

    let uploads = Router::new()
        .route(
            "/api/project/:id/images",
            get(protected::images_get).post(protected::images_post),
        )
        .route("/api/project/:id/upload-images", post(protected::images_post))
        .layer(DefaultBodyLimit::max(state.uploads.max_request_bytes));

    Router::new()
        .route("/api/auth/user", get(protected::user_get))
        .route("/api/projects", get(protected::projects_get))
        .route("/api/projects/stats", get(protected::project_stats_get))
        .route("/api/create-proj", post(protected::project_create_post))
        .route(
            "/api/edit-proj",
            put(protected::project_edit_put).delete(protected::project_edit_delete),
        )
        .merge(uploads)
        .route_layer(from_fn_with_state(state.clone(), middleware::require_session))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    use handlers::admin;

    Router::new()
        .route(
            "/api/categories",
            get(admin::categories_get).post(admin::categories_post),
        )
        .route(
            "/api/expenses",
            get(admin::expenses_get).post(admin::expenses_post),
        )
        .route("/api/expenses/chart-data", get(admin::chart_data_get))
        .route("/api/expenses/project/:id", get(admin::project_expenses_get))
        .route(
            "/api/expenses/:id",
            get(admin::expense_get)
                .put(admin::expense_put)
                .delete(admin::expense_delete),
        )
        // Last layer runs first: session, then role.
        .route_layer(from_fn_with_state(state.clone(), middleware::require_admin))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_session))
}

/// `*` (or no origins) allows any origin without credentials; an explicit
/// list allows cookies from those origins.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
