use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml_ng::{Mapping, Value};

/// Errors raised by a [`ConfigEngine`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which provider section a descriptor was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Proxy,
    Rule,
}

impl ProviderKind {
    /// Top-level key holding providers of this kind.
    pub fn section(&self) -> &'static str {
        match self {
            Self::Proxy => "proxy-providers",
            Self::Rule => "rule-providers",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

/// A provider declared in the raw configuration.
///
/// The descriptor is owned by the config engine; the pipeline only reads its
/// `url` and `path` to decide what to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderEntry {
    pub name: String,
    pub kind: ProviderKind,
    pub descriptor: Mapping,
}

impl ProviderEntry {
    pub fn url(&self) -> Option<&str> {
        self.descriptor.get("url").and_then(Value::as_str)
    }

    pub fn path(&self) -> Option<&Path> {
        self.descriptor
            .get("path")
            .and_then(Value::as_str)
            .map(Path::new)
    }
}

/// The configuration collaborators the pipeline drives: unmarshal-and-patch,
/// provider enumeration, structural validation, and provider teardown.
pub trait ConfigEngine: Send + Sync {
    /// The configuration produced by a successful [`ConfigEngine::validate`].
    type Validated;

    /// Read the primary config from `config_dir` and apply local patches.
    fn unmarshal_and_patch(&self, config_dir: &Path) -> Result<Mapping, EngineError>;

    /// Providers declared in `raw`, in the order they should be fetched.
    fn providers(&self, raw: &Mapping) -> Vec<ProviderEntry>;

    fn validate(&self, raw: Mapping) -> Result<Self::Validated, EngineError>;

    /// Release whatever `validate` instantiated.
    fn release(&self, validated: Self::Validated);
}
