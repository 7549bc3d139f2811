pub mod admin;
pub mod response;
pub mod session;

pub use admin::{lookup_role, require_admin, ValidatedUser};
pub use response::{ApiResponse, ApiResult};
pub use session::{require_session, SessionContext};
