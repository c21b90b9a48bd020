use std::collections::HashMap;
use std::sync::Mutex;

use url::Url;

use crate::{ContentLoader, LoadError, Status, StatusSink};

/// In-memory loader for testing. Serves registered bodies by exact URI and
/// records every request it sees.
#[derive(Default)]
pub struct InMemoryLoader {
    bodies: HashMap<String, Result<Vec<u8>, u16>>,
    requests: Mutex<Vec<String>>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.bodies.insert(uri.into(), Ok(body.into()));
    }

    /// Make `uri` answer with an HTTP error status.
    pub fn fail(&mut self, uri: impl Into<String>, status: u16) {
        self.bodies.insert(uri.into(), Err(status));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn was_requested(&self, uri: &str) -> bool {
        self.requests().iter().any(|r| r == uri)
    }
}

#[async_trait::async_trait]
impl ContentLoader for InMemoryLoader {
    async fn load(&self, uri: &Url) -> Result<Vec<u8>, LoadError> {
        let key = uri.to_string();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(key.clone());
        }

        match self.bodies.get(&key) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(LoadError::Status {
                status: *status,
                uri: key,
            }),
            None => Err(LoadError::Network(format!("no route to {key}"))),
        }
    }
}

/// Sink that keeps every decoded [`Status`] it receives.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> Vec<String> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<String> {
        self.statuses().into_iter().map(|s| s.action).collect()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.raw()
            .iter()
            .filter_map(|json| {
                let value: serde_json::Value = serde_json::from_str(json).ok()?;
                Some(Status {
                    action: value["action"].as_str()?.to_owned(),
                    args: value["args"]
                        .as_array()?
                        .iter()
                        .filter_map(|a| a.as_str().map(str::to_owned))
                        .collect(),
                    progress: i32::try_from(value["progress"].as_i64()?).ok()?,
                    max_progress: i32::try_from(value["max"].as_i64()?).ok()?,
                })
            })
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn report(&self, json: &str) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(json.to_owned());
        }
    }
}
