use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use subfetch::LoadError;
use url::Url;

/// Resolves opaque `content://` handles into their bytes.
#[async_trait::async_trait]
pub trait ContentResolver: Send + Sync {
    async fn open(&self, uri: &str) -> Result<Vec<u8>, LoadError>;
}

/// Maps `content://<authority>/<path>` onto `<root>/<authority>/<path>`.
///
/// Stands in for a platform content provider on hosts that have none.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The local file a handle refers to. Rejects handles that would escape the root.
    pub fn resolve(&self, uri: &str) -> Result<PathBuf, LoadError> {
        let parsed = Url::parse(uri).map_err(|e| LoadError::Content(format!("{uri}: {e}")))?;
        if parsed.scheme() != "content" {
            return Err(LoadError::unsupported(&parsed));
        }

        let authority = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| LoadError::Content(format!("{uri}: missing authority")))?;

        let mut resolved = self.root.join(authority);
        for segment in parsed.path_segments().into_iter().flatten() {
            let segment = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|e| LoadError::Content(format!("{uri}: {e}")))?;
            match Path::new(&*segment).components().next() {
                None => continue,
                Some(Component::Normal(_)) if !segment.contains('/') => resolved.push(&*segment),
                _ => {
                    return Err(LoadError::Content(format!(
                        "{uri}: invalid path segment {segment:?}"
                    )));
                }
            }
        }

        Ok(resolved)
    }
}

#[async_trait::async_trait]
impl ContentResolver for DirectoryResolver {
    async fn open(&self, uri: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.resolve(uri)?;
        std::fs::read(&path)
            .map_err(|e| LoadError::Content(format!("{uri} ({}): {e}", path.display())))
    }
}
