use std::time::Duration;

use subfetch::{ContentLoader, FETCH_TIMEOUT, LoadError};
use url::Url;

/// `User-Agent` sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("subfetch/", env!("CARGO_PKG_VERSION"));

/// HTTP client for fetching subscriptions and provider resources.
///
/// This is a pure transport utility: it issues a single GET with a fixed
/// `User-Agent` and a per-request deadline, and returns the full body.
#[derive(Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpLoader {
    pub fn new() -> Self {
        Self::with_options(None, None)
    }

    pub fn with_options(user_agent: Option<String>, timeout: Option<Duration>) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            timeout: timeout.unwrap_or(FETCH_TIMEOUT),
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET `uri` and return the body. Non-2xx responses are errors.
    pub async fn get(&self, uri: &Url) -> Result<Vec<u8>, LoadError> {
        let response = self
            .client
            .get(uri.as_str())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(uri, e))?;

        if !response.status().is_success() {
            return Err(LoadError::Status {
                status: response.status().as_u16(),
                uri: uri.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(uri, e))?;

        tracing::debug!(%uri, bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }

    fn classify(&self, uri: &Url, error: reqwest::Error) -> LoadError {
        if error.is_timeout() {
            LoadError::Timeout {
                secs: self.timeout.as_secs(),
                uri: uri.to_string(),
            }
        } else {
            LoadError::Network(format!("GET {uri} failed: {error}"))
        }
    }
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ContentLoader for HttpLoader {
    async fn load(&self, uri: &Url) -> Result<Vec<u8>, LoadError> {
        match uri.scheme() {
            "http" | "https" => self.get(uri).await,
            _ => Err(LoadError::unsupported(uri)),
        }
    }
}
