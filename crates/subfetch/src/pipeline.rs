use std::path::{Path, PathBuf};

use url::Url;

use crate::engine::{ConfigEngine, EngineError, ProviderEntry};
use crate::feedback::Feedback;
use crate::loader::ContentLoader;
use crate::persist::{FetchError, fetch_and_persist};
use crate::status::{Status, StatusSink};

/// File name of the primary configuration inside a config directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Errors that abort a fetch-and-validate run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid subscription URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to fetch configuration: {0}")]
    Fetch(#[source] FetchError),

    #[error("failed to load configuration: {0}")]
    Load(#[source] EngineError),

    #[error("configuration rejected: {0}")]
    Validate(#[source] EngineError),
}

/// Why a provider was not fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The descriptor has no string `url` or `path`.
    Incomplete,
    /// A file already exists at the provider path.
    AlreadyPresent,
    /// The `url` does not parse.
    InvalidUrl(String),
}

/// Outcome for a single provider.
#[derive(Debug)]
pub enum ProviderOutcome {
    Fetched { name: String, path: PathBuf },
    Skipped { name: String, reason: SkipReason },
    Failed { name: String, error: FetchError },
}

impl ProviderOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Fetched { name, .. } | Self::Skipped { name, .. } | Self::Failed { name, .. } => {
                name
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Aggregate result of a successful run.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Whether the primary configuration was (re)fetched.
    pub fetched_config: bool,
    pub providers: Vec<ProviderOutcome>,
    pub feedback: Vec<Feedback>,
}

impl FetchReport {
    pub fn failed_providers(&self) -> impl Iterator<Item = &ProviderOutcome> {
        self.providers.iter().filter(|p| p.is_failed())
    }

    pub fn fetched_providers(&self) -> usize {
        self.providers
            .iter()
            .filter(|p| matches!(p, ProviderOutcome::Fetched { .. }))
            .count()
    }
}

/// Drives a subscription from URL to validated configuration on disk.
pub struct Pipeline<L, E> {
    loader: L,
    engine: E,
}

impl<L, E> Pipeline<L, E>
where
    L: ContentLoader,
    E: ConfigEngine,
{
    pub fn new(loader: L, engine: E) -> Self {
        Self { loader, engine }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Fetch the configuration at `url` into `config_dir`, fetch its providers,
    /// and validate the result.
    ///
    /// The primary configuration is only fetched when `config.yaml` is missing
    /// or `force` is set. Provider failures are collected in the report and
    /// never abort the run.
    pub async fn fetch_and_validate(
        &self,
        config_dir: &Path,
        url: &str,
        force: bool,
        sink: &dyn StatusSink,
    ) -> Result<FetchReport, PipelineError> {
        let mut report = FetchReport::default();
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if force || needs_fetch(&config_path) {
            let url = Url::parse(url).map_err(|source| PipelineError::InvalidUrl {
                url: url.to_owned(),
                source,
            })?;

            sink.emit(&Status::fetch_configuration(&host_and_port(&url)));
            tracing::info!(%url, path = %config_path.display(), "fetching configuration");

            let outcome = fetch_and_persist(&self.loader, &url, &config_path)
                .await
                .map_err(PipelineError::Fetch)?;
            report.fetched_config = true;
            report.feedback.extend(outcome.directive_feedback);
        }

        let raw = self
            .engine
            .unmarshal_and_patch(config_dir)
            .map_err(PipelineError::Load)?;

        let providers = self.engine.providers(&raw);
        let total = providers.len();
        for (index, provider) in providers.into_iter().enumerate() {
            sink.emit(&Status::fetch_providers(&provider.name, index, total));

            let outcome = self.fetch_provider(provider).await;
            if let ProviderOutcome::Failed { name, error } = &outcome {
                tracing::warn!(provider = %name, %error, "provider fetch failed");
                report
                    .feedback
                    .push(Feedback::provider_failed(name, error.to_string()));
            }
            report.providers.push(outcome);
        }

        sink.emit(&Status::verifying());

        let validated = self
            .engine
            .validate(raw)
            .map_err(PipelineError::Validate)?;
        self.engine.release(validated);

        Ok(report)
    }

    async fn fetch_provider(&self, provider: ProviderEntry) -> ProviderOutcome {
        let (Some(url), Some(path)) = (provider.url(), provider.path()) else {
            return skipped(provider.name, SkipReason::Incomplete);
        };

        if path.exists() {
            tracing::debug!(provider = %provider.name, "provider already present");
            return skipped(provider.name, SkipReason::AlreadyPresent);
        }

        let url = match Url::parse(url) {
            Ok(url) => url,
            Err(e) => return skipped(provider.name, SkipReason::InvalidUrl(e.to_string())),
        };
        let path = path.to_path_buf();

        match fetch_and_persist(&self.loader, &url, &path).await {
            Ok(_) => ProviderOutcome::Fetched {
                name: provider.name,
                path,
            },
            Err(error) => ProviderOutcome::Failed {
                name: provider.name,
                error,
            },
        }
    }
}

/// Only a config that is known to be absent is fetched. Any other stat
/// failure is left for the engine to report when it reads the file.
fn needs_fetch(config_path: &Path) -> bool {
    match config_path.try_exists() {
        Ok(exists) => !exists,
        Err(e) => {
            tracing::debug!(path = %config_path.display(), error = %e, "cannot stat configuration");
            false
        }
    }
}

/// `host[:port]` of `url`, with the port only when it is not the scheme default.
fn host_and_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    }
}

fn skipped(name: String, reason: SkipReason) -> ProviderOutcome {
    ProviderOutcome::Skipped { name, reason }
}
