use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_DRAFT_PATH: &str = "cartesia-draft.json";

/// Connection settings for the roadmap backend and the local draft file.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Every endpoint path is appended to this URL.
    pub base_url: Url,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub token: Option<String>,
    pub timeout: Duration,
    pub draft_path: PathBuf,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            draft_path: PathBuf::from(DEFAULT_DRAFT_PATH),
        }
    }

    /// Reads `CARTESIA_*` variables, loading a `.env` file first if one exists.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_url = lookup("CARTESIA_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&raw_url)
            .with_context(|| format!("CARTESIA_API_URL is not a valid URL: {raw_url}"))?;

        let mut config = Self::new(base_url);
        config.token = lookup("CARTESIA_API_TOKEN").filter(|t| !t.trim().is_empty());

        if let Some(secs) = lookup("CARTESIA_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("CARTESIA_HTTP_TIMEOUT_SECS must be a whole number, got {secs}"))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(path) = lookup("CARTESIA_DRAFT_PATH") {
            config.draft_path = PathBuf::from(path);
        }

        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_draft_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.draft_path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(config.token.is_none());
        assert_eq!(config.draft_path, PathBuf::from("cartesia-draft.json"));
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CARTESIA_API_URL", "https://cartesia.example/api/v1"),
            ("CARTESIA_API_TOKEN", "secret"),
            ("CARTESIA_HTTP_TIMEOUT_SECS", "3"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.base_url.host_str(), Some("cartesia.example"));
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_timeout_is_an_error() {
        let result = ClientConfig::from_lookup(|k| {
            (k == "CARTESIA_HTTP_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
