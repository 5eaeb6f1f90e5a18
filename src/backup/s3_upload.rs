// dbvault/src/backup/s3_upload.rs
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use std::path::Path;
use url::Url;

use crate::config::StorageTarget;
use crate::errors::{BoxError, UploadError};

#[async_trait]
pub trait Uploader: Send + Sync {
    /// Uploads `local_file` under its base name and returns a locator for the object.
    async fn upload(&self, local_file: &Path, target: &StorageTarget) -> Result<String, UploadError>;
}

/// Uploads to an S3-compatible object storage service (like DigitalOcean Spaces).
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Uploader;

/// Remote object name for a local file: its base name.
pub fn object_key(local_file: &Path) -> Result<String, UploadError> {
    local_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| UploadError::NotFound(local_file.to_path_buf()))
}

/// Path-style URL of `key` inside the target bucket.
pub fn object_locator(target: &StorageTarget, key: &str) -> Result<String, UploadError> {
    let mut url = Url::parse(&target.endpoint_url).map_err(|e| {
        UploadError::InvalidTarget(format!("endpoint_url {}: {}", target.endpoint_url, e))
    })?;
    url.path_segments_mut()
        .map_err(|_| {
            UploadError::InvalidTarget(format!(
                "endpoint_url {} cannot carry a path",
                target.endpoint_url
            ))
        })?
        .pop_if_empty()
        .push(&target.container_name)
        .push(key);
    Ok(url.to_string())
}

async fn build_client(target: &StorageTarget) -> s3::Client {
    let sdk_config = aws_config::defaults(s3::config::BehaviorVersion::latest())
        .endpoint_url(&target.endpoint_url)
        .region(Region::new(target.region.clone()))
        .credentials_provider(s3::config::Credentials::new(
            &target.access_key_id,
            &target.secret_access_key,
            None, // session_token
            None, // expiry
            "Static", // provider_name
        ))
        .retry_config(RetryConfig::disabled())
        .load()
        .await;

    let s3_config = s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();
    s3::Client::from_conf(s3_config)
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, local_file: &Path, target: &StorageTarget) -> Result<String, UploadError> {
        let key = object_key(local_file)?;
        let transport_err = |source: BoxError| UploadError::Transport {
            bucket: target.container_name.clone(),
            key: key.clone(),
            source,
        };

        match tokio::fs::try_exists(local_file).await {
            Ok(true) => {}
            Ok(false) => return Err(UploadError::NotFound(local_file.to_path_buf())),
            Err(e) => return Err(transport_err(e.into())),
        }
        let locator = object_locator(target, &key)?;

        let client = build_client(target).await;
        let body = ByteStream::from_path(local_file)
            .await
            .map_err(|e| transport_err(e.into()))?;

        // PutObject replaces any existing object with the same key.
        client
            .put_object()
            .bucket(&target.container_name)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|e| transport_err(DisplayErrorContext(&e).to_string().into()))?;

        Ok(locator)
    }
}
