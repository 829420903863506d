//! Upload dispatch: authenticate a profile, acquire bytes, hand them to storage.
//!
//! Uploads report an [`UploadOutcome`] instead of an error. Callers only
//! branch on [`UploadOutcome::is_success`]; the failure cause is kept for
//! logging.

use std::path::Path;

use reqwest::Url;
use tracing::{info, warn};

use crate::contract::{BucketHandle, Storage, UploadRequest};
use crate::error::{AuthError, TransportError};
use crate::profile::BucketProfile;
use crate::progress::Progress;
use crate::remote::RemoteFetcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub saved_as: String,
    /// Size of the uploaded source, when it could be read.
    pub bytes: Option<u64>,
    /// Why the upload failed. `None` on success.
    pub cause: Option<String>,
}

impl UploadOutcome {
    fn succeeded(saved_as: &str, bytes: Option<u64>) -> Self {
        Self {
            saved_as: saved_as.to_string(),
            bytes,
            cause: None,
        }
    }

    fn failed(saved_as: &str, bytes: Option<u64>, cause: impl Into<String>) -> Self {
        Self {
            saved_as: saved_as.to_string(),
            bytes,
            cause: Some(cause.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.cause.is_none()
    }
}

pub async fn authenticate<S: Storage + ?Sized>(
    storage: &S,
    profile: &BucketProfile,
) -> Result<BucketHandle, AuthError> {
    info!(bucket = %profile.bucket, "Authenticating bucket profile");
    match storage.authorize(&profile.credentials()).await {
        Ok(handle) => {
            info!(bucket = %handle.bucket_name, bucket_id = %handle.bucket_id, "Authentication successful");
            Ok(handle)
        }
        Err(e) => {
            warn!(bucket = %profile.bucket, error = %e, "Authentication failed");
            Err(e)
        }
    }
}

/// Upload a file that already exists on disk.
///
/// A missing source is reported as a failed outcome without calling storage.
pub async fn upload_local<S: Storage + ?Sized>(
    storage: &S,
    handle: &BucketHandle,
    path: &Path,
    save_as: &str,
    content_type: Option<&str>,
) -> UploadOutcome {
    let bytes = match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => {
            warn!(path = %path.display(), "Upload source is not a regular file");
            return UploadOutcome::failed(save_as, None, format!("{} is not a file", path.display()));
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Upload source cannot be read");
            return UploadOutcome::failed(save_as, None, format!("{}: {e}", path.display()));
        }
    };

    info!(
        path = %path.display(),
        save_as,
        bytes,
        bucket = %handle.bucket_name,
        "Uploading file"
    );
    let req = UploadRequest {
        source: path.to_path_buf(),
        file_name: save_as.to_string(),
        content_type: content_type.map(str::to_string),
    };
    match storage.upload_file(handle, &req).await {
        Ok(uploaded) => {
            info!(file_id = %uploaded.file_id, file_name = %uploaded.file_name, "Upload complete");
            UploadOutcome::succeeded(save_as, Some(bytes))
        }
        Err(e) => {
            warn!(error = %e, save_as, bucket = %handle.bucket_name, "Upload failed");
            UploadOutcome::failed(save_as, Some(bytes), e.to_string())
        }
    }
}

/// Download `url` into a temporary file, then upload it like a local file.
///
/// The existence check and download are fatal on failure; the upload itself
/// is reported through the outcome. The temporary file is removed before
/// this returns.
pub async fn download_then_upload<S: Storage + ?Sized, P: Progress + ?Sized>(
    fetcher: &RemoteFetcher,
    storage: &S,
    handle: &BucketHandle,
    url: &Url,
    save_as: &str,
    progress: &mut P,
) -> Result<UploadOutcome, TransportError> {
    fetcher.check_exists(url).await?;
    let downloaded = fetcher.download(url, progress).await?;

    let outcome = upload_local(
        storage,
        handle,
        downloaded.file.path(),
        save_as,
        downloaded.content_type.as_deref(),
    )
    .await;
    Ok(outcome)
}
