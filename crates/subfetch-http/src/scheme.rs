use std::sync::Arc;

use subfetch::{ContentLoader, LoadError};
use url::Url;

use crate::client::HttpLoader;
use crate::content::ContentResolver;

/// Dispatches a URI to the network or to a content resolver by scheme.
///
/// `http`/`https` go to the [`HttpLoader`]; `content` goes to the configured
/// [`ContentResolver`]. Everything else, including `content` without a
/// resolver, is an unsupported scheme.
#[derive(Clone)]
pub struct SchemeLoader {
    http: HttpLoader,
    content: Option<Arc<dyn ContentResolver>>,
}

impl SchemeLoader {
    pub fn new(http: HttpLoader) -> Self {
        Self {
            http,
            content: None,
        }
    }

    pub fn with_content_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.content = Some(resolver);
        self
    }
}

impl Default for SchemeLoader {
    fn default() -> Self {
        Self::new(HttpLoader::new())
    }
}

#[async_trait::async_trait]
impl ContentLoader for SchemeLoader {
    async fn load(&self, uri: &Url) -> Result<Vec<u8>, LoadError> {
        match (uri.scheme(), &self.content) {
            ("http" | "https", _) => self.http.get(uri).await,
            ("content", Some(resolver)) => resolver.open(uri.as_str()).await,
            _ => Err(LoadError::unsupported(uri)),
        }
    }
}
