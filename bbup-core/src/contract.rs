//! # contract: the storage API seen by the dispatcher
//!
//! This module defines the [`Storage`] trait and the plain data types that
//! flow through it. The binary crate implements it against the Backblaze B2
//! native API; tests use the generated `MockStorage`.
//!
//! ## Contract
//! - [`Storage::authorize`] exchanges credentials for a [`BucketHandle`]
//!   bound to one bucket. Keys restricted to a subset of buckets are refused
//!   with [`AuthError::RestrictedKey`].
//! - [`Storage::upload_file`] sends one local file to the bucket in a single
//!   request. Failures come back as boxed errors; the dispatcher collapses
//!   them into an unsuccessful outcome.

use std::path::PathBuf;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{AuthError, StorageError};
use crate::profile::Credentials;

/// An authorized session for a single bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketHandle {
    pub account_id: String,
    /// Base URL for API calls made with this session.
    pub api_url: String,
    /// Base URL for file downloads.
    pub download_url: String,
    pub authorization_token: String,
    pub bucket_id: String,
    pub bucket_name: String,
}

/// What to upload and under which name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Local file holding the bytes.
    pub source: PathBuf,
    /// Object name in the bucket.
    pub file_name: String,
    /// MIME type. The storage API picks one from the name when unset.
    pub content_type: Option<String>,
}

/// The stored object as reported back by the storage API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_id: String,
    pub file_name: String,
    pub content_length: u64,
    pub content_type: Option<String>,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    /// Authorize the account and look up the bucket named in `credentials`.
    async fn authorize(&self, credentials: &Credentials) -> Result<BucketHandle, AuthError>;

    /// Upload one local file into the handle's bucket.
    async fn upload_file(
        &self,
        handle: &BucketHandle,
        req: &UploadRequest,
    ) -> Result<UploadedFile, StorageError>;
}
