//! Error types shared across the core crate.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by storage transport calls.
pub type StorageError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from the configuration store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The config directory or file could not be written.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The profile list could not be serialized.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No profile matched the requested bucket (or no single default exists).
    #[error("{}", not_found_message(.0.as_deref()))]
    NotFound(Option<String>),
}

fn not_found_message(bucket: Option<&str>) -> String {
    match bucket {
        Some(name) => format!(
            "The provided bucket {name} cannot be found. Please provide a valid bucket name."
        ),
        None => "A default bucket cannot be found. Please provide a bucket name.".to_string(),
    }
}

/// Errors exchanging credentials for a bucket handle.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The storage API rejected the key id / application key pair.
    #[error("Backblaze rejected the credentials: {0}")]
    Rejected(String),

    /// The key is limited to a subset of buckets.
    #[error("The application key should be allowed to access all buckets. Is it restricted?")]
    RestrictedKey,

    /// The account has no bucket with this name.
    #[error("Bucket {0} does not exist in this account.")]
    BucketNotFound(String),

    /// The storage API could not be reached or answered nonsense.
    #[error("Backblaze authorization failed: {0}")]
    Transport(String),
}

/// Errors fetching a remote resource before upload.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The existence check did not report success.
    #[error("File cannot be downloaded from the provided URL (status {status}).")]
    NotAvailable { status: u16 },

    /// The request itself failed.
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Writing the downloaded body to the temporary file failed.
    #[error("Cannot write downloaded data to a temporary file: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Provided domain is invalid.")]
    Domain,

    #[error("The provided URL is invalid.")]
    Url,
}
