use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::auth::supabase::{provider_base_url, upstream_failure};
use crate::config::SupabaseConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object storage not configured: {0}")]
    NotConfigured(&'static str),

    #[error("object storage request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("object storage returned {status}: {message}")]
    Upstream { status: u16, message: String },
}

/// Bucket-scoped object store for project photos.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` at `path`, acting as the holder of `access_token`.
    /// Never overwrites an existing object.
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str, access_token: &str)
        -> Result<(), StorageError>;

    /// Public URL of the object at `path`.
    fn public_url(&self, path: &str) -> String;

    async fn remove(&self, paths: &[String], access_token: &str) -> Result<(), StorageError>;
}

/// Storage API client for the managed backend.
#[derive(Clone)]
pub struct SupabaseStorage {
    http: Client,
    base: Url,
    anon_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(http: Client, base: Url, anon_key: String, bucket: String) -> Self {
        Self {
            http,
            base,
            anon_key,
            bucket,
        }
    }

    pub fn from_config(config: &SupabaseConfig, http: Client) -> Result<Self, StorageError> {
        let base = provider_base_url(config.url.as_deref()).ok_or(StorageError::NotConfigured("SUPABASE_URL"))?;
        let anon_key = config
            .anon_key
            .clone()
            .ok_or(StorageError::NotConfigured("SUPABASE_ANON_KEY"))?;
        Ok(Self::new(http, base, anon_key, config.storage_bucket.clone()))
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}storage/v1/object/{}/{}",
            self.base,
            self.bucket,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        access_token: &str,
    ) -> Result<(), StorageError> {
        let response = self
            .http
            .post(self.object_url(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .header("content-type", content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let (status, message) = upstream_failure(response).await;
        Err(StorageError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}storage/v1/object/public/{}/{}",
            self.base,
            self.bucket,
            path.trim_start_matches('/')
        )
    }

    async fn remove(&self, paths: &[String], access_token: &str) -> Result<(), StorageError> {
        let response = self
            .http
            .delete(format!("{}storage/v1/object/{}", self.base, self.bucket))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let (status, message) = upstream_failure(response).await;
        Err(StorageError::Upstream {
            status: status.as_u16(),
            message,
        })
    }
}
