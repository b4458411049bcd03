use std::path::Path;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;

use crate::config::Config;
use crate::error::{EtlError, Result};

/// Service error codes that indicate rejected credentials rather than a
/// failed transfer.
const AUTH_ERROR_CODES: &[&str] = &[
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "AccessDenied",
    "ExpiredToken",
];

/// Push `local_path` to the configured bucket. The destination key is
/// `<folder>/<basename>`, or the bare basename when no folder is given.
/// Returns the destination key.
pub async fn upload_file(
    config: &Config,
    local_path: &Path,
    folder: Option<&str>,
) -> Result<String> {
    if !local_path.is_file() {
        return Err(EtlError::NotFound(local_path.to_path_buf()));
    }
    let key = destination_key(local_path, folder)
        .ok_or_else(|| EtlError::NotFound(local_path.to_path_buf()))?;

    let client = storage_client(config);
    let body = ByteStream::from_path(local_path)
        .await
        .map_err(|e| EtlError::Transfer {
            context: "file upload",
            message: e.to_string(),
        })?;

    client
        .put_object()
        .bucket(&config.bucket_name)
        .key(&key)
        .body(body)
        .send()
        .await
        .map_err(classify_upload_error)?;

    info!(bucket = %config.bucket_name, key = %key, "uploaded");
    Ok(key)
}

/// Build an S3 client against the configured S3-compatible endpoint with
/// static credentials. Path-style addressing: compatible providers generally
/// do not serve virtual-hosted buckets.
fn storage_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        config.storage_access_key_id.clone(),
        config.storage_secret_access_key.clone(),
        None,
        None,
        "environment",
    );
    let s3_config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(config.storage_region.clone()))
        .endpoint_url(config.storage_endpoint_url.clone())
        .credentials_provider(credentials)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}

fn destination_key(local_path: &Path, folder: Option<&str>) -> Option<String> {
    let base = local_path.file_name()?.to_string_lossy();
    Some(match folder {
        Some(folder) => format!("{}/{}", folder.trim_end_matches('/'), base),
        None => base.into_owned(),
    })
}

fn classify_upload_error<E>(err: E) -> EtlError
where
    E: ProvideErrorMetadata + std::fmt::Display,
{
    if let Some(code) = err.code() {
        if AUTH_ERROR_CODES.contains(&code) {
            return EtlError::Authentication {
                service: "object storage",
                message: err.to_string(),
            };
        }
    }
    EtlError::Transfer {
        context: "file upload",
        message: err.to_string(),
    }
}
