//! # store: persisted list of bucket profiles
//!
//! The store is a single `config.json` file holding a JSON array of
//! [`BucketProfile`] objects, under a configuration root chosen by the caller.
//!
//! - Reading never fails: a missing, unreadable or non-list file reads as an
//!   empty store. List entries that are not valid profiles are skipped.
//! - Writing merges one profile into the current list. Profiles are keyed by
//!   bucket name and at most one is flagged default.
//! - Writes land in a sibling temporary file that is renamed over
//!   `config.json`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::profile::BucketProfile;

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// Loads all saved profiles, or an empty list if there is nothing usable on disk.
    pub fn load(&self) -> Vec<BucketProfile> {
        let path = self.path();
        if !path.is_file() {
            debug!(config_path = %path.display(), "No config file yet");
            return Vec::new();
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = ?e, config_path = %path.display(), "Failed to read config file, treating as empty");
                return Vec::new();
            }
        };

        let entries = match serde_json::from_str::<Vec<serde_json::Value>>(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, config_path = %path.display(), "Config file is not a list, treating as empty");
                return Vec::new();
            }
        };

        // Entries that do not parse are skipped, the rest stay usable.
        let total = entries.len();
        let profiles: Vec<BucketProfile> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(index, error = %e, config_path = %path.display(), "Skipping malformed bucket profile");
                    None
                }
            })
            .collect();
        info!(
            config_path = %path.display(),
            profiles = profiles.len(),
            skipped = total - profiles.len(),
            "Loaded bucket profiles"
        );
        profiles
    }

    /// Merges `profile` into the saved list and rewrites the file.
    pub fn save(&self, profile: BucketProfile) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| {
            error!(error = ?source, dir = %self.root.display(), "Failed to create config directory");
            StoreError::Io {
                path: self.root.clone(),
                source,
            }
        })?;

        let bucket = profile.bucket.clone();
        let merged = merge(self.load(), profile);
        let content = serde_json::to_string(&merged)?;

        let path = self.path();
        let io_err = |source: std::io::Error| {
            error!(error = ?source, config_path = %path.display(), "Failed to write config file");
            StoreError::Io {
                path: path.clone(),
                source,
            }
        };
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        tmp.write_all(content.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        info!(
            bucket = %bucket,
            profiles = merged.len(),
            config_path = %path.display(),
            "Saved bucket profile"
        );
        Ok(())
    }

    /// Finds the profile for `bucket`, or the single default profile when no name is given.
    pub fn resolve(&self, bucket: Option<&str>) -> Result<BucketProfile, StoreError> {
        let profiles = self.load();
        let found = match bucket {
            Some(name) => profiles.into_iter().find(|p| p.bucket == name),
            None => {
                let mut defaults = profiles.into_iter().filter(|p| p.is_default);
                match (defaults.next(), defaults.next()) {
                    (Some(only), None) => Some(only),
                    (Some(_), Some(_)) => {
                        warn!("More than one default bucket profile saved, refusing to pick one");
                        None
                    }
                    _ => None,
                }
            }
        };

        match found {
            Some(profile) => {
                profile.trace_loaded();
                Ok(profile)
            }
            None => {
                info!(bucket = ?bucket, "No matching bucket profile");
                Err(StoreError::NotFound(bucket.map(str::to_string)))
            }
        }
    }
}

/// Merges `profile` into `profiles`.
///
/// A profile with the same bucket name is replaced at its position; otherwise
/// the profile is appended. A default profile clears the flag on all others.
pub fn merge(mut profiles: Vec<BucketProfile>, profile: BucketProfile) -> Vec<BucketProfile> {
    if profile.is_default {
        for p in profiles.iter_mut() {
            p.is_default = false;
        }
    }

    match profiles.iter().position(|p| p.bucket == profile.bucket) {
        Some(idx) => profiles[idx] = profile,
        None => profiles.push(profile),
    }
    profiles
}
