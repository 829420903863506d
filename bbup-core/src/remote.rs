//! Fetching a remote file into a scoped temporary file.

use std::io::Write;

use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Url};
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

use crate::error::TransportError;
use crate::progress::Progress;

/// Bytes written to the temporary file per progress update.
pub const CHUNK_SIZE: usize = 1024;

/// Some hosts refuse clients that do not look like a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; CrOS x86_64 12871.102.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/81.0.4044.141 Safari/537.36";

/// A downloaded body. The file is deleted when this value is dropped.
#[derive(Debug)]
pub struct Downloaded {
    pub file: NamedTempFile,
    pub content_type: Option<String>,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RemoteFetcher {
    client: Client,
}

impl RemoteFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// HEAD the URL and fail unless it answers with a success status.
    pub async fn check_exists(&self, url: &Url) -> Result<(), TransportError> {
        let resp = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|source| {
                error!(error = %source, url = %url, "Existence check request failed");
                TransportError::Request {
                    url: url.to_string(),
                    source,
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            debug!(url = %url, status = %status, "Remote file exists");
            Ok(())
        } else {
            error!(url = %url, status = %status, "Existence check did not succeed");
            Err(TransportError::NotAvailable {
                status: status.as_u16(),
            })
        }
    }

    /// Stream the body of `url` into a new temporary file.
    pub async fn download<P: Progress + ?Sized>(
        &self,
        url: &Url,
        progress: &mut P,
    ) -> Result<Downloaded, TransportError> {
        let request_err = |source: reqwest::Error| TransportError::Request {
            url: url.to_string(),
            source,
        };

        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(error = %e, url = %url, "Download request failed");
                request_err(e)
            })?;

        let total = resp.content_length().unwrap_or(0);
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        info!(url = %url, total, content_type = ?content_type, "Downloading remote file");

        let mut file = NamedTempFile::new()?;
        let mut bytes = 0u64;
        let mut body = resp.bytes_stream();

        progress.start(total);
        let streamed: Result<(), TransportError> = async {
            while let Some(next) = body.next().await {
                let data = next.map_err(|e| {
                    error!(error = %e, url = %url, received = bytes, "Download stream broke off");
                    request_err(e)
                })?;
                for chunk in data.chunks(CHUNK_SIZE) {
                    file.write_all(chunk)?;
                    bytes += chunk.len() as u64;
                    progress.advance(chunk.len() as u64);
                }
            }
            Ok(())
        }
        .await;
        // The bar is closed before any error reaches the terminal.
        progress.finish();
        streamed?;
        file.flush()?;

        info!(url = %url, bytes, path = %file.path().display(), "Download complete");
        Ok(Downloaded {
            file,
            content_type,
            bytes,
        })
    }
}
