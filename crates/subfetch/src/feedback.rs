//! Diagnostics from steps that degrade instead of aborting a run.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What a [`Feedback`] item is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// The `parsers` document named by the subscription URL.
    Directive(String),
    /// A proxy or rule provider, by name.
    Provider(String),
}

/// A dropped directive or a failed provider fetch, kept for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub severity: Severity,
    pub subject: Subject,
    pub message: String,
}

impl Feedback {
    pub fn directive(
        severity: Severity,
        uri: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            subject: Subject::Directive(uri.into()),
            message: message.into(),
        }
    }

    pub fn provider_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            subject: Subject::Provider(name.into()),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directive(uri) => write!(f, "parsers {uri}"),
            Self::Provider(name) => write!(f, "provider {name}"),
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => {}
            Severity::Warning => f.write_str("warning: ")?,
            Severity::Error => f.write_str("error: ")?,
        }
        write!(f, "{}: {}", self.subject, self.message)
    }
}
