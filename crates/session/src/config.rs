//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

pub const API_URL_ENV: &str = "MEDGATE_API_URL";
pub const CREDENTIALS_PATH_ENV: &str = "MEDGATE_CREDENTIALS_PATH";
pub const HTTP_TIMEOUT_ENV: &str = "MEDGATE_HTTP_TIMEOUT_SECS";

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Base URL of the REST API, without the `auth/` suffix.
    pub api_url: String,
    /// SQLite file holding the credential record.
    pub credentials_path: PathBuf,
    pub request_timeout: Duration,
}

impl SessionConfig {
    pub fn new(api_url: impl Into<String>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            api_url: api_url.into(),
            credentials_path: credentials_path.into(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build from `MEDGATE_*` environment variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_url = lookup(API_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let credentials_path = match lookup(CREDENTIALS_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => default_credentials_path()?,
        };

        let request_timeout = match lookup(HTTP_TIMEOUT_ENV) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{HTTP_TIMEOUT_ENV} must be a whole number of seconds, got {raw:?}"))?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            api_url,
            credentials_path,
            request_timeout,
        })
    }
}

/// `<data dir>/medgate/credentials.db`.
pub fn default_credentials_path() -> anyhow::Result<PathBuf> {
    let mut dir = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    dir.push("medgate");
    dir.push("credentials.db");
    Ok(dir)
}
