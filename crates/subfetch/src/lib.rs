pub mod clash;
pub mod document;
pub mod engine;
pub mod feedback;
pub mod loader;
pub mod merge;
pub mod persist;
pub mod pipeline;
pub mod status;

pub use clash::{ClashEngine, ValidatedConfig};
pub use document::{DocumentError, decode_mapping, encode_mapping, load_yaml};
pub use engine::{ConfigEngine, EngineError, ProviderEntry, ProviderKind};
pub use feedback::{Feedback, Severity, Subject};
pub use loader::{ContentLoader, LoadError};
pub use merge::{MergeError, Merged, apply_directives, prepend};
pub use persist::{FETCH_TIMEOUT, FetchError, PersistOutcome, fetch_and_persist};
pub use pipeline::{
    CONFIG_FILE_NAME, FetchReport, Pipeline, PipelineError, ProviderOutcome, SkipReason,
};
pub use status::{Phase, Status, StatusSink};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
