// handlers/protected/mod.rs - Handlers behind the session middleware
//
// Every handler here receives the `SessionContext` extension. Ownership
// checks (project owner or admin) happen inside the handlers.

pub mod auth;
pub mod photos;
pub mod projects;

pub use auth::user_get;
pub use photos::{images_get, images_post};
pub use projects::{
    project_create_post, project_edit_delete, project_edit_put, project_stats_get, projects_get,
};
