// handlers/public/mod.rs - Public handlers (no session required)
//
// Credential exchanges, service info and the read-only project page.

pub mod auth;
pub mod projects;
pub mod root;

pub use auth::{access_code_login_post, login_post, logout_post, register_post};
pub use projects::project_get;
pub use root::{health, root};
