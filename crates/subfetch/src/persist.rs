use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::feedback::Feedback;
use crate::loader::{ContentLoader, LoadError};
use crate::merge::{MergeError, apply_directives};

/// Deadline for a single fetch, scoped to that call only.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur while fetching a resource into a file.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("body of {uri} is not valid UTF-8")]
    Utf8 { uri: String },

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What [`fetch_and_persist`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub path: PathBuf,
    pub bytes_written: usize,
    /// True when parser directives were merged into the body.
    pub merged: bool,
    /// Set when a requested directive could not be used.
    pub directive_feedback: Option<Feedback>,
}

/// Fetch `uri` under [`FETCH_TIMEOUT`], apply any parser directive, and write
/// the result to `target`.
///
/// The subscription and its directive document share one deadline. A
/// directive that runs out of time leaves the subscription unmerged.
/// Nothing is written unless load and merge succeed. A failed write removes
/// the partial file.
pub async fn fetch_and_persist<L>(
    loader: &L,
    uri: &Url,
    target: &Path,
) -> Result<PersistOutcome, FetchError>
where
    L: ContentLoader + ?Sized,
{
    fetch_and_persist_within(loader, uri, target, FETCH_TIMEOUT).await
}

/// [`fetch_and_persist`] with an explicit deadline.
pub async fn fetch_and_persist_within<L>(
    loader: &L,
    uri: &Url,
    target: &Path,
    deadline: Duration,
) -> Result<PersistOutcome, FetchError>
where
    L: ContentLoader + ?Sized,
{
    let bounded = Deadline {
        inner: loader,
        until: Instant::now() + deadline,
        secs: deadline.as_secs(),
    };

    let body = bounded.load(uri).await?;

    let text = String::from_utf8(body).map_err(|_| FetchError::Utf8 {
        uri: uri.to_string(),
    })?;

    let merged = apply_directives(&bounded, text, uri).await?;
    tracing::debug!(%uri, merged = merged.is_applied(), "final subscription ready");

    let outcome = PersistOutcome {
        path: target.to_path_buf(),
        bytes_written: merged.text().len(),
        merged: merged.is_applied(),
        directive_feedback: merged.reason().cloned(),
    };

    write_target(target, merged.text())?;
    Ok(outcome)
}

/// Loader view whose every request must finish before `until`.
struct Deadline<'a, L: ?Sized> {
    inner: &'a L,
    until: Instant,
    secs: u64,
}

#[async_trait::async_trait]
impl<L: ContentLoader + ?Sized> ContentLoader for Deadline<'_, L> {
    async fn load(&self, uri: &Url) -> Result<Vec<u8>, LoadError> {
        tokio::time::timeout_at(self.until, self.inner.load(uri))
            .await
            .map_err(|_| LoadError::Timeout {
                secs: self.secs,
                uri: uri.to_string(),
            })?
    }
}

fn write_target(target: &Path, text: &str) -> Result<(), FetchError> {
    if let Some(parent) = target.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        // A missing parent surfaces as the open error below.
        tracing::debug!(parent = %parent.display(), error = %e, "could not create parent directory");
    }

    let file = open_truncating(target).map_err(|source| FetchError::Io {
        path: target.to_path_buf(),
        source,
    })?;

    write_or_remove(target, file, text)
}

/// Write `text` through `out`, deleting `target` if any part of it fails.
fn write_or_remove<W: Write>(target: &Path, mut out: W, text: &str) -> Result<(), FetchError> {
    let result = out.write_all(text.as_bytes()).and_then(|()| out.flush());
    drop(out);

    result.map_err(|source| {
        if let Err(e) = std::fs::remove_file(target) {
            tracing::debug!(path = %target.display(), error = %e, "could not remove partial file");
        }
        FetchError::Io {
            path: target.to_path_buf(),
            source,
        }
    })
}

fn open_truncating(path: &Path) -> std::io::Result<std::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}
