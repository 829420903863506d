//! Per-user application directory holding `config.json`.
//!
//! - Linux:   `$XDG_CONFIG_HOME/bbuploader` or `~/.config/bbuploader`
//! - macOS:   `~/Library/Application Support/bbuploader`
//! - Windows: `%APPDATA%\bbuploader`

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub const APP_NAME: &str = "bbuploader";

/// Resolves the platform config directory for bbup.
pub fn config_dir() -> Result<PathBuf> {
    let dir = platform_config_dir(|key| std::env::var_os(key))
        .context("could not determine platform config directory")?;
    tracing::debug!(config_dir = %dir.display(), "Resolved platform config directory");
    Ok(dir)
}

/// Picks the directory from the variables `env` returns.
fn platform_config_dir<F>(env: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<OsString>,
{
    #[cfg(target_os = "windows")]
    {
        env("APPDATA").map(|p| PathBuf::from(p).join(APP_NAME))
    }

    #[cfg(target_os = "macos")]
    {
        env("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join(APP_NAME)
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = env("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| env("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join(APP_NAME))
    }
}
