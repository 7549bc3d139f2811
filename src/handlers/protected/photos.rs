// handlers/protected/photos.rs - project image listing and multipart upload

use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Extension, Multipart, Path, State},
};
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::projects::ensure_owner_or_admin;
use crate::api::parse_id;
use crate::database::models::NewPhoto;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionContext};
use crate::AppState;

/// Multipart field carrying the files.
const IMAGES_FIELD: &str = "images";
/// Folder inside the bucket.
const IMAGE_FOLDER: &str = "project-images";

struct UploadedFile {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

/// Unique object name: `{millis}-{random base36}.{ext}`.
fn object_name(original: &str) -> String {
    const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..11)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    let extension = original.rsplit('.').next().unwrap_or(original);
    format!("{}-{}.{}", Utc::now().timestamp_millis(), suffix, extension)
}

async fn read_files(multipart: &mut Multipart) -> Result<Vec<UploadedFile>, ApiError> {
    let unreadable = |e: axum::extract::multipart::MultipartError| {
        warn!("Rejected multipart body: {}", e);
        ApiError::bad_request("ไม่สามารถอ่านไฟล์ที่อัปโหลดได้")
    };

    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        if field.name() != Some(IMAGES_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("image").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(unreadable)?;
        files.push(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }
    Ok(files)
}

/// GET /api/project/:id/images - newest first
pub async fn images_get(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<Value> {
    let id = parse_id(&raw_id, "id")?;
    state
        .repo
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("ไม่พบโปรเจ็ค"))?;

    let photos = state.repo.list_photos(id).await?;
    Ok(ApiResponse::success(json!({
        "status": 200,
        "message": "ดึงรายการรูปภาพสำเร็จ",
        "count": photos.len(),
        "data": photos,
    })))
}

/// POST /api/project/:id/images and /api/project/:id/upload-images
///
/// Files that are not images, are too large, or fail to store are skipped;
/// the response reports how many were saved.
pub async fn images_post(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(raw_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Value> {
    let id = parse_id(&raw_id, "id")?;
    let project = state
        .repo
        .find_project(id)
        .await?
        .ok_or_else(|| ApiError::not_found("ไม่พบโปรเจ็ค"))?;

    ensure_owner_or_admin(&state, &project, session.user.id, "ไม่มีสิทธิ์อัปโหลดรูปภาพ").await?;

    // Project and permission checks answer before the body shape does.
    let mut multipart = multipart.map_err(|e| {
        warn!("Rejected upload body: {}", e.body_text());
        ApiError::bad_request("ไม่สามารถอ่านไฟล์ที่อัปโหลดได้")
    })?;
    let files = read_files(&mut multipart).await?;
    if files.is_empty() {
        return Err(ApiError::bad_request("ไม่พบไฟล์ที่อัปโหลด"));
    }

    let mut saved = Vec::new();
    for file in files {
        if !file.content_type.starts_with("image/") {
            warn!("Skipping {}: content type {:?} is not an image", file.file_name, file.content_type);
            continue;
        }
        if file.bytes.len() > state.uploads.max_file_bytes {
            warn!("Skipping {}: {} bytes exceeds the upload limit", file.file_name, file.bytes.len());
            continue;
        }

        let path = format!("{}/{}/{}", IMAGE_FOLDER, project.id, object_name(&file.file_name));
        let size = file.bytes.len() as i64;

        if let Err(e) = state
            .storage
            .upload(&path, file.bytes, &file.content_type, &session.access_token)
            .await
        {
            warn!("Upload of {} failed: {}", path, e);
            continue;
        }

        let photo = NewPhoto {
            project_id: project.id,
            file_name: file.file_name,
            file_path: state.storage.public_url(&path),
            file_size: size,
            uploaded_by: session.user.id,
        };

        match state.repo.insert_photo(photo).await {
            Ok(photo) => saved.push(photo),
            Err(e) => {
                tracing::error!("Recording photo {} failed, removing the object: {}", path, e);
                if let Err(e) = state.storage.remove(&[path.clone()], &session.access_token).await {
                    tracing::error!("Removing orphaned object {} failed: {}", path, e);
                }
            }
        }
    }

    info!("User {} uploaded {} image(s) to project {}", session.user.id, saved.len(), project.id);

    Ok(ApiResponse::success(json!({
        "message": format!("อัปโหลดสำเร็จ {} ไฟล์", saved.len()),
        "images": saved,
    })))
}
