#![doc = "Backblaze B2 native API client implementing the core `Storage` contract."]
//
//! # B2 client
//!
//! Talks to the B2 native API (v2) over `reqwest`:
//!
//! - `b2_authorize_account` exchanges a key id and application key for an
//!   account token. Keys restricted to one bucket are refused, bbup needs
//!   full bucket-list access.
//! - `b2_list_buckets` looks the bucket up by name.
//! - `b2_get_upload_url` + one POST to the returned URL uploads a file.
//!
//! See core's [`contract`](bbup_core::contract) module for the trait.

use std::fmt::Write as _;
use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use sha1::{Digest, Sha1};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

use bbup_core::contract::{BucketHandle, Storage, UploadRequest, UploadedFile};
use bbup_core::error::{AuthError, StorageError};
use bbup_core::profile::Credentials;

pub const B2_API_BASE: &str = "https://api.backblazeb2.com";

/// Lets B2 pick the content type from the file name.
pub const AUTO_CONTENT_TYPE: &str = "b2/x-auto";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeAccountResponse {
    account_id: String,
    authorization_token: String,
    api_url: String,
    download_url: String,
    #[serde(default)]
    allowed: Option<Allowed>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Allowed {
    #[serde(default)]
    bucket_id: Option<String>,
    #[serde(default)]
    bucket_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListBucketsResponse {
    buckets: Vec<BucketInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketInfo {
    bucket_id: String,
    bucket_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetUploadUrlResponse {
    upload_url: String,
    authorization_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadFileResponse {
    file_id: String,
    file_name: String,
    #[serde(default)]
    content_length: u64,
    #[serde(default)]
    content_type: Option<String>,
}

/// Error body returned by every B2 endpoint.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct B2Client {
    http: Client,
    api_base: String,
}

impl Default for B2Client {
    fn default() -> Self {
        Self::new()
    }
}

impl B2Client {
    pub fn new() -> Self {
        Self::with_api_base(B2_API_BASE)
    }

    /// Client for a different authorization endpoint, e.g. a local stand-in.
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            http: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn list_bucket(
        &self,
        account: &AuthorizeAccountResponse,
        bucket: &str,
    ) -> Result<BucketInfo, AuthError> {
        let url = format!("{}/b2api/v2/b2_list_buckets", account.api_url);
        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, &account.authorization_token)
            .json(&json!({ "accountId": account.account_id, "bucketName": bucket }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let msg = describe_failure(resp).await;
            tracing::error!(bucket, error = %msg, "b2_list_buckets failed");
            return Err(AuthError::Transport(msg));
        }

        let listed: ListBucketsResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        listed
            .buckets
            .into_iter()
            .find(|b| b.bucket_name == bucket)
            .ok_or_else(|| AuthError::BucketNotFound(bucket.to_string()))
    }
}

#[async_trait]
impl Storage for B2Client {
    async fn authorize(&self, credentials: &Credentials) -> Result<BucketHandle, AuthError> {
        let url = format!("{}/b2api/v2/b2_authorize_account", self.api_base);
        tracing::info!(key_id = %credentials.key_id, "Authorizing B2 account");

        let resp = self
            .http
            .get(&url)
            .basic_auth(&credentials.key_id, Some(&credentials.app_key))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, url = %url, "b2_authorize_account request failed");
                AuthError::Transport(e.to_string())
            })?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let msg = describe_failure(resp).await;
                tracing::warn!(error = %msg, "B2 rejected the credentials");
                return Err(AuthError::Rejected(msg));
            }
            _ => return Err(AuthError::Transport(describe_failure(resp).await)),
        }

        let account: AuthorizeAccountResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        check_unrestricted(account.allowed.as_ref())?;

        let bucket = self.list_bucket(&account, &credentials.bucket).await?;
        tracing::info!(
            bucket = %bucket.bucket_name,
            bucket_id = %bucket.bucket_id,
            api_url = %account.api_url,
            "B2 account authorized"
        );
        Ok(BucketHandle {
            account_id: account.account_id,
            api_url: account.api_url,
            download_url: account.download_url,
            authorization_token: account.authorization_token,
            bucket_id: bucket.bucket_id,
            bucket_name: bucket.bucket_name,
        })
    }

    async fn upload_file(
        &self,
        handle: &BucketHandle,
        req: &UploadRequest,
    ) -> Result<UploadedFile, StorageError> {
        let target = {
            let url = format!("{}/b2api/v2/b2_get_upload_url", handle.api_url);
            let resp = self
                .http
                .post(&url)
                .header(AUTHORIZATION, &handle.authorization_token)
                .json(&json!({ "bucketId": handle.bucket_id }))
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(describe_failure(resp).await.into());
            }
            resp.json::<GetUploadUrlResponse>().await?
        };

        let (sha1, length) = sha1_hex(&req.source).await?;
        let body = Body::wrap_stream(ReaderStream::new(File::open(&req.source).await?));
        tracing::info!(
            file_name = %req.file_name,
            bytes = length,
            bucket = %handle.bucket_name,
            "Uploading file to B2"
        );

        let resp = self
            .http
            .post(&target.upload_url)
            .header(AUTHORIZATION, &target.authorization_token)
            .header("X-Bz-File-Name", encode_file_name(&req.file_name))
            .header(CONTENT_TYPE, req.content_type.as_deref().unwrap_or(AUTO_CONTENT_TYPE))
            .header(CONTENT_LENGTH, length)
            .header("X-Bz-Content-Sha1", sha1)
            .body(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let msg = describe_failure(resp).await;
            tracing::error!(file_name = %req.file_name, error = %msg, "B2 upload failed");
            return Err(msg.into());
        }

        let uploaded: UploadFileResponse = resp.json().await?;
        Ok(UploadedFile {
            file_id: uploaded.file_id,
            file_name: uploaded.file_name,
            content_length: uploaded.content_length,
            content_type: uploaded.content_type,
        })
    }
}

/// Hex SHA-1 and length of a file, read in one pass without loading it whole.
async fn sha1_hex(path: &Path) -> std::io::Result<(String, u64)> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; 64 * 1024];
    let mut length = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        length += n as u64;
    }
    Ok((format!("{:x}", hasher.finalize()), length))
}

/// bbup needs a key that can see every bucket of the account.
fn check_unrestricted(allowed: Option<&Allowed>) -> Result<(), AuthError> {
    match allowed {
        Some(a) if a.bucket_id.is_some() || a.bucket_name.is_some() => {
            tracing::warn!(
                bucket_id = ?a.bucket_id,
                bucket_name = ?a.bucket_name,
                "Application key is restricted to one bucket"
            );
            Err(AuthError::RestrictedKey)
        }
        _ => Ok(()),
    }
}

async fn describe_failure(resp: Response) -> String {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
    match serde_json::from_str::<ApiError>(&text) {
        Ok(err) if !err.message.is_empty() => format!("{} ({}): {}", status, err.code, err.message),
        _ => format!("{status}: {text}"),
    }
}

/// Percent-encodes a file name for the `X-Bz-File-Name` header. `/` is kept.
pub fn encode_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}
