//! Client configuration.
//!
//! A [`Config`] is built once and handed to [`Client::new`](crate::Client::new).
//! Nothing else in the crate reads the process environment.

use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{ConnectError, Result};

const API_SEGMENT: &str = "__api__";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings for a Connect server.
#[derive(Clone)]
pub struct Config {
    url: Url,
    api_key: String,
    timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Create a configuration from a server URL and an API key.
    ///
    /// The URL may point at the server root or at its `__api__` path; both
    /// normalize to `<server>/__api__/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or has no host.
    pub fn new(url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            url: normalize_url(url)?,
            api_key: api_key.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Create a configuration from `CONNECT_SERVER` and `CONNECT_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns an error if either variable is unset or the URL is invalid.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("CONNECT_API_KEY").map_err(|_| {
            ConnectError::ConfigMissing("CONNECT_API_KEY environment variable not set".to_string())
        })?;
        let url = env::var("CONNECT_SERVER").map_err(|_| {
            ConnectError::ConfigMissing("CONNECT_SERVER environment variable not set".to_string())
        })?;

        Self::new(&url, &api_key)
    }

    /// Override the request timeout handed to the HTTP transport.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The normalized API base URL, always ending in `__api__/`.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn normalize_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if url.host_str().is_none() {
        return Err(ConnectError::ConfigMissing(format!(
            "server URL must include a host (e.g. https://connect.example.com): {raw}"
        )));
    }

    let path = url.path().trim_end_matches('/').to_string();
    let path = if path.ends_with(API_SEGMENT) {
        format!("{path}/")
    } else {
        format!("{path}/{API_SEGMENT}/")
    };
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}
