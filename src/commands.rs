//! The three user-facing commands: `configure`, `local_upload`, `remote_upload`.
//!
//! Each command is generic over the storage API, the answer source and the
//! output stream, so integration tests can run the real flow against
//! `MockStorage` and a `ScriptedPrompt`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use bbup_core::contract::{BucketHandle, Storage};
use bbup_core::dispatch::{self, UploadOutcome};
use bbup_core::error::StoreError;
use bbup_core::profile::{public_base_url, BucketProfile};
use bbup_core::progress::Progress;
use bbup_core::remote::RemoteFetcher;
use bbup_core::size::format_size;
use bbup_core::store::ConfigStore;
use bbup_core::validate::{parse_domain, parse_remote_url, path_file_name, url_file_name};

use crate::console::{Color, Console, Prompt};

/// A command failure with the message and color shown to the user.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CommandFailed {
    pub message: String,
    pub color: Color,
}

impl CommandFailed {
    pub fn red(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            color: Color::Red,
        }
    }

    pub fn yellow(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            color: Color::Yellow,
        }
    }
}

pub const UPLOAD_FAILED_MESSAGE: &str = "File upload failed. Please try again.";

/// Prompts for bucket credentials, verifies them and saves the profile.
pub async fn configure<S, P, W>(
    store: &ConfigStore,
    storage: &S,
    console: &mut Console<P, W>,
    set_default: Option<bool>,
    use_domain: Option<bool>,
) -> Result<()>
where
    S: Storage + ?Sized,
    P: Prompt,
    W: Write,
{
    let set_default = match set_default {
        Some(v) => v,
        None => console.confirm("Do you want to set this bucket as default?", false)?,
    };
    let use_domain = match use_domain {
        Some(v) => v,
        None => console.confirm("Do you want to use a custom domain?", false)?,
    };

    let bucket = console.ask("Bucket name", None)?;
    let app_id = console.ask("Backblaze keyID", None)?;
    let app_key = console.ask("Backblaze applicationKey", None)?;
    let domain = if use_domain {
        Some(console.ask_until("Domain/Subdomain", None, parse_domain)?)
    } else {
        None
    };

    let profile = BucketProfile {
        url: domain.as_deref().map(|d| public_base_url(d, &bucket)),
        bucket,
        app_key,
        app_id,
        is_default: set_default,
    };

    if let Err(e) = dispatch::authenticate(storage, &profile).await {
        return Err(CommandFailed::red(e.to_string()).into());
    }

    if let Err(e) = store.save(profile.clone()) {
        warn!(error = %e, bucket = %profile.bucket, "Saving profile failed");
        return Err(CommandFailed::red("Configuration settings cannot be saved.").into());
    }

    console.say(
        Color::Green,
        &format!(
            "Settings for the bucket {} have been saved successfully.",
            profile.bucket
        ),
    )?;
    Ok(())
}

/// Finds the profile to upload with, asking for a bucket name until one matches.
pub fn resolve_profile<P: Prompt, W: Write>(
    store: &ConfigStore,
    bucket: Option<&str>,
    console: &mut Console<P, W>,
) -> Result<BucketProfile> {
    match store.resolve(bucket) {
        Ok(profile) => return Ok(profile),
        Err(e @ StoreError::NotFound(_)) => console.say(Color::Yellow, &e.to_string())?,
        Err(e) => return Err(e.into()),
    }

    loop {
        let name = console.ask("Bucket name", None)?;
        match store.resolve(Some(&name)) {
            Ok(profile) => return Ok(profile),
            Err(StoreError::NotFound(_)) => console.say(
                Color::Yellow,
                &format!("A bucket with name {name} cannot be found in config."),
            )?,
            Err(e) => return Err(e.into()),
        }
    }
}

async fn open_bucket<S, P, W>(
    store: &ConfigStore,
    storage: &S,
    bucket: Option<&str>,
    console: &mut Console<P, W>,
) -> Result<(BucketProfile, BucketHandle)>
where
    S: Storage + ?Sized,
    P: Prompt,
    W: Write,
{
    let profile = resolve_profile(store, bucket, console)?;
    console.say(Color::BrightBlue, "Authenticating Backblaze...")?;
    let handle = dispatch::authenticate(storage, &profile)
        .await
        .map_err(|e| CommandFailed::red(e.to_string()))?;
    console.say(Color::Green, "Authentication successful!")?;
    Ok((profile, handle))
}

fn report<P: Prompt, W: Write>(
    console: &mut Console<P, W>,
    profile: &BucketProfile,
    outcome: &UploadOutcome,
) -> Result<()> {
    if !outcome.is_success() {
        warn!(cause = ?outcome.cause, saved_as = %outcome.saved_as, "Upload did not succeed");
        return Err(CommandFailed::yellow(UPLOAD_FAILED_MESSAGE).into());
    }

    let size = format_size(outcome.bytes);
    let message = match profile.file_url(&outcome.saved_as) {
        Some(url) => format!("File has been uploaded ({size}): {url}"),
        None => format!("File has been successfully uploaded ({size})."),
    };
    console.say(Color::Green, &message)?;
    Ok(())
}

/// Uploads a file from the local filesystem.
pub async fn local_upload<S, P, W>(
    store: &ConfigStore,
    storage: &S,
    console: &mut Console<P, W>,
    bucket: Option<&str>,
    content_type: Option<&str>,
) -> Result<()>
where
    S: Storage + ?Sized,
    P: Prompt,
    W: Write,
{
    let path = PathBuf::from(console.ask("Local Path", None)?);
    if !path.is_file() {
        info!(path = %path.display(), "Local upload source missing");
        return Err(
            CommandFailed::yellow(format!("File cannot be found at path {}", path.display())).into(),
        );
    }

    let default_name = path_file_name(&path);
    let save_as = console.ask("Save as", default_name.as_deref())?;
    let (profile, handle) = open_bucket(store, storage, bucket, console).await?;

    console.say(Color::BrightBlue, "Uploading file to Backblaze.")?;
    let outcome = dispatch::upload_local(storage, &handle, &path, &save_as, content_type).await;
    report(console, &profile, &outcome)
}

/// Downloads a file from a URL and uploads it.
pub async fn remote_upload<S, P, W, Q>(
    store: &ConfigStore,
    storage: &S,
    fetcher: &RemoteFetcher,
    console: &mut Console<P, W>,
    progress: &mut Q,
    bucket: Option<&str>,
) -> Result<()>
where
    S: Storage + ?Sized,
    P: Prompt,
    W: Write,
    Q: Progress + ?Sized,
{
    let url = console.ask_until("Remote URL", None, parse_remote_url)?;
    let default_name = url_file_name(&url);
    let save_as = console.ask("Save as", default_name.as_deref())?;
    let (profile, handle) = open_bucket(store, storage, bucket, console).await?;

    console.say(Color::BrightBlue, &format!("Downloading data from {url}"))?;
    let outcome = dispatch::download_then_upload(fetcher, storage, &handle, &url, &save_as, progress)
        .await
        .map_err(|e| CommandFailed::red(e.to_string()))?;
    report(console, &profile, &outcome)
}
