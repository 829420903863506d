use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One saved bucket configuration.
///
/// Serialized field names match the persisted `config.json` layout:
/// `{bucket, app_key, app_id, is_default, url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketProfile {
    /// Bucket name. Unique key within the store.
    pub bucket: String,
    /// Application key secret.
    pub app_key: String,
    /// Application key id.
    pub app_id: String,
    /// Whether this profile is used when no bucket is named.
    #[serde(default)]
    pub is_default: bool,
    /// Public base URL for download links, e.g. `https://cdn.example.com/file/mybucket`.
    #[serde(default)]
    pub url: Option<String>,
}

impl BucketProfile {
    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.bucket,
            is_default = self.is_default,
            has_url = self.url.is_some(),
            "Loaded bucket profile"
        );
        debug!(app_id = %self.app_id, "Bucket profile key id");
    }

    /// Public URL of an uploaded file, when the profile has a base URL.
    pub fn file_url(&self, save_as: &str) -> Option<String> {
        self.url
            .as_deref()
            .map(|base| format!("{}/{}", base.trim_end_matches('/'), save_as))
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            key_id: self.app_id.clone(),
            app_key: self.app_key.clone(),
            bucket: self.bucket.clone(),
        }
    }
}

/// Credentials for authorizing against one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key_id: String,
    pub app_key: String,
    pub bucket: String,
}

/// Base URL stored for a bucket served behind a custom domain.
pub fn public_base_url(domain: &str, bucket: &str) -> String {
    format!("https://{domain}/file/{bucket}")
}
