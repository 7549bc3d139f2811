use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata row for an image stored in object storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Photo {
    pub id: Uuid,
    pub project_id: Uuid,
    pub file_name: String,
    /// Public URL of the stored object.
    pub file_path: String,
    pub file_size: i64,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub project_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub uploaded_by: Uuid,
}
