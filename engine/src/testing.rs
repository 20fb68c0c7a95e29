//! In-memory transport for tests and offline runs.
//!
//! [`ScriptedTransport`] answers requests from two sources: fixed bodies
//! registered per component name with [`ScriptedTransport::respond`], then a
//! FIFO queue of one-shot answers. Every request path is recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::protocol::REQUEST_PREFIX;
use crate::transport::{Transport, TransportError};

enum Answer {
    Body(String),
    Status(u16),
}

/// Transport answering from a script.
#[derive(Default)]
pub struct ScriptedTransport {
    fixed: Mutex<HashMap<String, String>>,
    queue: Mutex<VecDeque<Answer>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a one-shot 200 answer.
    pub fn push_ok(&self, body: impl Into<String>) {
        self.queue.lock().unwrap().push_back(Answer::Body(body.into()));
    }

    /// Queues a one-shot failure status.
    pub fn push_status(&self, status: u16) {
        self.queue.lock().unwrap().push_back(Answer::Status(status));
    }

    /// Answers every request for component `name` with `body`.
    pub fn respond(&self, name: impl Into<String>, body: impl Into<String>) {
        self.fixed.lock().unwrap().insert(name.into(), body.into());
    }

    /// Returns the recorded request paths in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Returns the number of recorded requests.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Returns the recorded requests addressed to component `name`.
    #[must_use]
    pub fn requests_for(&self, name: &str) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|path| component_name(path) == name)
            .cloned()
            .collect()
    }
}

/// Extracts the component name from `webui/<name>?…`.
fn component_name(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or_default();
    path.strip_prefix(REQUEST_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(path.to_string());

        if let Some(body) = self.fixed.lock().unwrap().get(component_name(path)) {
            return Ok(body.clone());
        }

        let answer = self.queue.lock().unwrap().pop_front();
        match answer {
            Some(Answer::Body(body)) => Ok(body),
            Some(Answer::Status(status)) => Err(TransportError::Status {
                status,
                path: path.to_string(),
            }),
            None => Err(TransportError::Request(format!("no scripted answer for {path}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_component_name() {
        assert_eq!(component_name("webui/t/f?action=sync"), "t/f");
        assert_eq!(component_name("webui/files"), "files");
    }

    #[tokio::test]
    async fn fixed_answers_take_precedence() {
        let transport = ScriptedTransport::new();
        transport.respond("table", "{}");
        transport.push_status(500);

        assert_eq!(transport.get("webui/table?action=sync").await.unwrap(), "{}");
        assert!(matches!(
            transport.get("webui/other?action=sync").await,
            Err(TransportError::Status { status: 500, .. })
        ));
        assert!(transport.get("webui/other").await.is_err());
        assert_eq!(transport.requests_for("table").len(), 1);
    }
}
