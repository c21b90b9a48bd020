use std::fmt;

use serde::Serialize;

/// Progress value reported while a phase has no meaningful ratio.
pub const INDETERMINATE: i32 = -1;

/// Progress value reserved for the verification phase.
pub const VERIFY_SENTINEL: i32 = 0xFFFF;

/// The reportable phases of a fetch-and-validate run, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    FetchConfiguration,
    FetchProviders,
    Verifying,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchConfiguration => "FetchConfiguration",
            Self::FetchProviders => "FetchProviders",
            Self::Verifying => "Verifying",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single progress report handed to a [`StatusSink`].
///
/// Serializes to `{"action": .., "args": [..], "progress": .., "max": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub action: String,
    pub args: Vec<String>,
    pub progress: i32,
    #[serde(rename = "max")]
    pub max_progress: i32,
}

impl Status {
    pub fn fetch_configuration(host: impl Into<String>) -> Self {
        Self {
            action: Phase::FetchConfiguration.to_string(),
            args: vec![host.into()],
            progress: INDETERMINATE,
            max_progress: INDETERMINATE,
        }
    }

    pub fn fetch_providers(name: impl Into<String>, index: usize, total: usize) -> Self {
        Self {
            action: Phase::FetchProviders.to_string(),
            args: vec![name.into()],
            progress: saturate(index),
            max_progress: saturate(total),
        }
    }

    pub fn verifying() -> Self {
        Self {
            action: Phase::Verifying.to_string(),
            args: Vec::new(),
            progress: VERIFY_SENTINEL,
            max_progress: VERIFY_SENTINEL,
        }
    }

    /// True when progress carries no ratio.
    pub fn is_indeterminate(&self) -> bool {
        self.progress == INDETERMINATE && self.max_progress == INDETERMINATE
    }

    pub fn to_json(&self) -> String {
        // A struct of strings and integers cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn saturate(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Receives serialized [`Status`] reports, synchronously and in phase order.
pub trait StatusSink: Send + Sync {
    fn report(&self, json: &str);

    fn emit(&self, status: &Status) {
        self.report(&status.to_json());
    }
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, json: &str) {
        self(json)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn fetch_configuration_is_indeterminate() {
        let status = Status::fetch_configuration("example.com");
        assert!(status.is_indeterminate());
        assert_eq!(
            status.to_json(),
            r#"{"action":"FetchConfiguration","args":["example.com"],"progress":-1,"max":-1}"#
        );
    }

    #[test]
    fn fetch_providers_carries_ratio() {
        let status = Status::fetch_providers("hk-nodes", 2, 5);
        assert_eq!(
            status.to_json(),
            r#"{"action":"FetchProviders","args":["hk-nodes"],"progress":2,"max":5}"#
        );
    }

    #[test]
    fn verifying_uses_sentinel() {
        let status = Status::verifying();
        assert_eq!(
            status.to_json(),
            r#"{"action":"Verifying","args":[],"progress":65535,"max":65535}"#
        );
        assert!(!status.is_indeterminate());
    }

    #[test]
    fn closures_are_sinks() {
        let seen = Mutex::new(Vec::new());
        let sink = |json: &str| seen.lock().unwrap().push(json.to_owned());
        sink.emit(&Status::verifying());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
