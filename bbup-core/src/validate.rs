//! Input checks for values typed at the prompt.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;

use crate::error::ValidationError;

const MAX_DOMAIN_LEN: usize = 253;

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+(?:[a-zA-Z]{2,63}|xn--[a-zA-Z0-9-]{1,59})$",
        )
        .expect("domain pattern compiles")
    })
}

pub fn is_valid_domain(domain: &str) -> bool {
    domain.len() <= MAX_DOMAIN_LEN && domain_pattern().is_match(domain)
}

pub fn parse_domain(input: &str) -> Result<String, ValidationError> {
    let domain = input.trim();
    if is_valid_domain(domain) {
        Ok(domain.to_string())
    } else {
        Err(ValidationError::Domain)
    }
}

/// Accepts absolute `http`/`https` URLs that name a host.
pub fn parse_remote_url(input: &str) -> Result<Url, ValidationError> {
    let url = Url::parse(input.trim()).map_err(|_| ValidationError::Url)?;
    let has_host = url.host_str().is_some_and(|h| !h.is_empty());
    match url.scheme() {
        "http" | "https" if has_host => Ok(url),
        _ => Err(ValidationError::Url),
    }
}

/// Last non-empty path segment of a URL, used as the default save-as name.
pub fn url_file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

/// File name component of a local path, used as the default save-as name.
pub fn path_file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
