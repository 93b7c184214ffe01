use std::env;

use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://chat.stream-io-api.com";
pub const DEFAULT_CHANNEL_TYPE: &str = "messaging";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("STREAM_BASE_URL is not a valid URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Chat backend credentials and defaults, read from the environment at
/// process start. Missing credentials fail here, before any remote call.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_secret: String,
    pub channel_type: String,
    pub base_url: Url,
}

impl Config {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            channel_type: DEFAULT_CHANNEL_TYPE.to_string(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL parses"),
        }
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Reads `STREAM_API_KEY`, `STREAM_API_SECRET`, `CHANNEL_TYPE` and
    /// `STREAM_BASE_URL` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = get("STREAM_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("STREAM_API_KEY"))?;
        let api_secret = get("STREAM_API_SECRET")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("STREAM_API_SECRET"))?;
        let channel_type =
            get("CHANNEL_TYPE").unwrap_or_else(|| DEFAULT_CHANNEL_TYPE.to_string());
        let base_url =
            Url::parse(&get("STREAM_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()))?;

        Ok(Self { api_key, api_secret, channel_type, base_url })
    }
}
