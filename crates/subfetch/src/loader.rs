use std::sync::Arc;

use url::Url;

/// Errors that can occur while resolving a URI into bytes.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unsupported scheme {scheme} of {uri}")]
    UnsupportedScheme { scheme: String, uri: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {uri}")]
    Status { status: u16, uri: String },

    #[error("content resolution failed: {0}")]
    Content(String),

    #[error("timed out after {secs}s loading {uri}")]
    Timeout { secs: u64, uri: String },
}

impl LoadError {
    pub fn unsupported(uri: &Url) -> Self {
        Self::UnsupportedScheme {
            scheme: uri.scheme().to_owned(),
            uri: uri.to_string(),
        }
    }
}

/// Resolves a URI into its full body.
///
/// Implementations dispatch on the scheme (network for `http`/`https`,
/// device-local handles for `content`) and drain the body before returning.
#[async_trait::async_trait]
pub trait ContentLoader: Send + Sync {
    async fn load(&self, uri: &Url) -> Result<Vec<u8>, LoadError>;
}

#[async_trait::async_trait]
impl<T: ContentLoader + ?Sized> ContentLoader for Arc<T> {
    async fn load(&self, uri: &Url) -> Result<Vec<u8>, LoadError> {
        (**self).load(uri).await
    }
}

#[async_trait::async_trait]
impl<T: ContentLoader + ?Sized> ContentLoader for &T {
    async fn load(&self, uri: &Url) -> Result<Vec<u8>, LoadError> {
        (**self).load(uri).await
    }
}
