//! Wire format shared by the engine and the backend.
//!
//! Requests are plain `GET webui/<qualifiedName>[?action=<a>&<k>=<v>…]`
//! paths. Argument values escape only `=` and `&`; everything else goes on
//! the wire as written. Responses are JSON objects with an optional
//! `notification` member; the rest of the object is handed to the
//! component's `on_draw`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path prefix for component requests.
pub const REQUEST_PREFIX: &str = "webui";

/// Progress of a long-running backend operation.
///
/// Only `finished` lets the response be drawn. Any status the client does
/// not know is kept verbatim and treated like `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationStatus {
    /// The operation is still running (`pending` or `in work`); the client
    /// keeps polling.
    Pending,
    /// The operation completed; the response carries its data.
    Finished,
    /// The operation failed. Treated as non-finished: the notifier shows the
    /// message and polling continues.
    Error,
    /// A status this client does not know.
    Other(String),
}

impl From<String> for NotificationStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "pending" | "in work" => Self::Pending,
            "finished" => Self::Finished,
            "error" => Self::Error,
            _ => Self::Other(status),
        }
    }
}

impl From<NotificationStatus> for String {
    fn from(status: NotificationStatus) -> Self {
        match status {
            NotificationStatus::Pending => "pending".to_string(),
            NotificationStatus::Finished => "finished".to_string(),
            NotificationStatus::Error => "error".to_string(),
            NotificationStatus::Other(status) => status,
        }
    }
}

/// Notification attached to a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub status: NotificationStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
}

impl Notification {
    /// Returns true when the client should draw the response.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == NotificationStatus::Finished
    }

    /// Text shown by the waiting indicator.
    #[must_use]
    pub fn waiting_text(&self) -> String {
        match self.progress {
            Some(progress) => format!("Waiting: {} {progress} %", self.message),
            None => format!("Waiting: {} ...", self.message),
        }
    }
}

/// A decoded backend response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl SyncResponse {
    /// Decodes a response body. Anything other than a JSON object is rejected.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed bodies.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Returns true if the response must be drawn now (no notification, or a
    /// finished one).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.notification
            .as_ref()
            .map_or(true, Notification::is_finished)
    }

    /// Returns a string member of the body.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }
}

/// Escapes `=` and `&` in an argument value.
#[must_use]
pub fn encode_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '=' => out.push_str("%3D"),
            '&' => out.push_str("%26"),
            other => out.push(other),
        }
    }
    out
}

/// Builds the request path for `name`.
///
/// `None` as action produces a bare `webui/<name>` request.
#[must_use]
pub fn request_path(name: &str, action: Option<&str>, args: &[(&str, &str)]) -> String {
    let mut path = format!("{REQUEST_PREFIX}/{name}");
    if let Some(action) = action {
        path.push_str("?action=");
        path.push_str(action);
        for (key, value) in args {
            path.push('&');
            path.push_str(key);
            path.push('=');
            path.push_str(&encode_value(value));
        }
    }
    path
}
