//! Client configuration.
//!
//! `ClientConfig` can be built in code, read from the `APAAI_ENDPOINT` and
//! `APAAI_KEY` environment variables, or loaded from a TOML file:
//!
//! ```toml
//! endpoint = "https://apaai.example.com"
//! api_key = "sk_live_..."
//! timeout_secs = 10
//!
//! [headers]
//! x-tenant = "acme"
//! ```
//!
//! Every field is optional in TOML; missing fields take their defaults.

use std::{collections::BTreeMap, path::Path, time::Duration};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use apaai_contracts::{ApaaiError, ApaaiResult};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8787";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const ENDPOINT_ENV: &str = "APAAI_ENDPOINT";
pub const API_KEY_ENV: &str = "APAAI_KEY";

/// Connection settings for [`HttpTransport`](crate::HttpTransport).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the APAAI service. Trailing slashes are ignored.
    pub endpoint: String,
    /// Sent as `Authorization: Bearer <api_key>` when present.
    pub api_key: Option<String>,
    /// Whole-request timeout. Zero disables the timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Extra headers sent on every request.
    pub headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("apaai-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            headers: BTreeMap::new(),
        }
    }
}

// The api key never appears in debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("headers", &self.headers)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Defaults overridden by `APAAI_ENDPOINT` and `APAAI_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like `from_env`, reading variables through `lookup`. Empty values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        if let Some(endpoint) = var(ENDPOINT_ENV) {
            config.endpoint = endpoint;
        }
        config.api_key = var(API_KEY_ENV);
        config
    }

    /// Parse `s` as TOML.
    ///
    /// Returns `ApaaiError::Config` if the TOML is malformed or has fields of
    /// the wrong type.
    pub fn from_toml_str(s: &str) -> ApaaiResult<Self> {
        toml::from_str(s)
            .map_err(|e| ApaaiError::config(format!("failed to parse client config TOML: {e}")))
    }

    /// Read the file at `path` and parse it as TOML client configuration.
    pub fn from_file(path: &Path) -> ApaaiResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ApaaiError::config(format!(
                "failed to read client config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// The endpoint as a URL, without trailing slashes.
    ///
    /// Fails with `Config` unless the endpoint is an absolute http(s) URL.
    pub fn base_url(&self) -> ApaaiResult<Url> {
        let trimmed = self.endpoint.trim().trim_end_matches('/');
        let url = Url::parse(trimmed).map_err(|e| {
            ApaaiError::config(format!("invalid endpoint '{}': {}", self.endpoint, e))
        })?;
        let http = matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base();
        if !http {
            return Err(ApaaiError::config(format!(
                "endpoint '{}' must use http or https, not '{}'",
                self.endpoint,
                url.scheme()
            )));
        }
        Ok(url)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
